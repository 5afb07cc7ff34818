//! Prometheus text exposition of the metrics model.
//!
//! Output layout per family:
//!
//! ```text
//! # HELP node_snr Signal-to-noise ratio of the last direct reception.
//! # TYPE node_snr gauge
//! node_snr{num="42"} 6.25
//! ```

use super::metrics::{Exposable, MetricsModel};
use std::fmt::Write;

/// Content type served alongside the rendered text.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Renders every family of `model` in Prometheus text format.
///
/// A non-empty `prefix` is joined to each metric name with `_`.
/// Families without any series still emit their HELP and TYPE lines.
pub fn render(model: &MetricsModel, prefix: &str) -> String {
    let mut output = String::with_capacity(4096);
    for family in model.families() {
        render_family(&mut output, family, prefix);
    }
    output
}

fn render_family(output: &mut String, family: &dyn Exposable, prefix: &str) {
    let name = if prefix.is_empty() {
        family.name().to_string()
    } else {
        format!("{}_{}", prefix, family.name())
    };

    let _ = writeln!(output, "# HELP {} {}", name, family.help());
    let _ = writeln!(output, "# TYPE {} {}", name, family.kind().as_str());

    let label_names = family.label_names();
    for (values, value) in family.samples() {
        output.push_str(&name);
        if !label_names.is_empty() {
            output.push('{');
            for (i, (label, val)) in label_names.iter().zip(values.iter()).enumerate() {
                if i > 0 {
                    output.push(',');
                }
                let _ = write!(output, "{}=\"{}\"", label, escape_label_value(val));
            }
            output.push('}');
        }
        let _ = writeln!(output, " {}", format_value(value));
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        value.to_string()
    }
}
