//! Command-line tests running the built binary
//!
//! Run with: cargo test --test cli

use std::io::Write;
use std::process::Command;

const PACKETS: &str = r#"{"from": 7, "rxTime": 1700000000, "hopStart": 3, "hopLimit": 3, "rxSnr": 4.5, "decoded": {"portnum": "TELEMETRY_APP", "telemetry": {"deviceMetrics": {"batteryLevel": 80}}}}
not a packet
{"from": 8, "to": 7, "decoded": {"portnum": "POSITION_APP", "position": {"latitude": 47.5}}}
"#;

fn is_sample_line(line: &str) -> bool {
    let Some((series, value)) = line.rsplit_once(' ') else {
        return false;
    };
    let name_end = series.find('{').unwrap_or(series.len());
    let name = &series[..name_end];
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        && (name_end == series.len() || series.ends_with('}'))
        && (value.parse::<f64>().is_ok() || matches!(value, "NaN" | "+Inf" | "-Inf"))
}

#[test]
fn test_render_stdout_is_pure_exposition() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("packets.jsonl");
    std::fs::File::create(&input)
        .unwrap()
        .write_all(PACKETS.as_bytes())
        .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_mesh-exporter"))
        .arg("render")
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--input")
        .arg(&input)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run mesh-exporter");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("device_metric{num=\"7\",metric=\"batteryLevel\",type=\"device\"} 80"));
    for line in stdout.lines() {
        assert!(
            line.starts_with('#') || is_sample_line(line),
            "unexpected stdout line: {:?}",
            line
        );
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Skipping line 2"));
}

#[test]
fn test_config_validate_reports_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[feed]\nchannel_capacity = 0").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_mesh-exporter"))
        .args(["config", "validate", "--config"])
        .arg(file.path())
        .output()
        .expect("Failed to run mesh-exporter");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("feed.channel_capacity"));
}
