//! Metrics model for mesh observations.
//!
//! Every metric is a family of series keyed by label values. Series are
//! created lazily on first observation and live for the process lifetime.
//! Individual values are atomics, so a scrape can read while the packet
//! path writes; the family map itself sits behind a short-held `RwLock`.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increments the counter by 1.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the current value of the counter.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Atomic gauge holding an `f64` as its bit pattern.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, val: f64) {
        self.0.store(val.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Kind of a metric family as seen by a scraper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// A single value cell that can be read back as a sample.
pub trait Sample: Default {
    const KIND: MetricKind;

    fn sample(&self) -> f64;
}

impl Sample for Counter {
    const KIND: MetricKind = MetricKind::Counter;

    fn sample(&self) -> f64 {
        self.get() as f64
    }
}

impl Sample for Gauge {
    const KIND: MetricKind = MetricKind::Gauge;

    fn sample(&self) -> f64 {
        self.get()
    }
}

/// Label values of one series, in the family's label-name order.
pub type LabelValues = Vec<String>;

/// A named metric with a fixed label schema and lazily created series.
#[derive(Debug)]
pub struct Family<M> {
    name: &'static str,
    help: &'static str,
    label_names: &'static [&'static str],
    series: RwLock<BTreeMap<LabelValues, M>>,
}

impl<M: Sample> Family<M> {
    pub fn new(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            label_names,
            series: RwLock::new(BTreeMap::new()),
        }
    }

    /// Runs `f` against the series for `values`, creating it if absent.
    ///
    /// `values` must line up with the family's label names.
    pub fn with_labels<R>(&self, values: &[&str], f: impl FnOnce(&M) -> R) -> R {
        debug_assert_eq!(
            values.len(),
            self.label_names.len(),
            "label arity mismatch for {}",
            self.name
        );
        let key: LabelValues = values.iter().map(|v| v.to_string()).collect();

        if let Some(cell) = self.series.read().get(&key) {
            return f(cell);
        }

        let mut series = self.series.write();
        f(&*series.entry(key).or_default())
    }

    /// Reads the current value of a series without creating it.
    pub fn value(&self, values: &[&str]) -> Option<f64> {
        let key: LabelValues = values.iter().map(|v| v.to_string()).collect();
        self.series.read().get(&key).map(|cell| cell.sample())
    }

    /// Sum of every series in the family.
    pub fn total(&self) -> f64 {
        self.series.read().values().map(|cell| cell.sample()).sum()
    }

    /// Label sets currently present, in sorted order.
    pub fn label_sets(&self) -> Vec<LabelValues> {
        self.series.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.read().is_empty()
    }
}

impl Family<Counter> {
    pub fn inc(&self, values: &[&str]) {
        self.with_labels(values, Counter::inc);
    }
}

impl Family<Gauge> {
    pub fn set(&self, values: &[&str], val: f64) {
        self.with_labels(values, |g| g.set(val));
    }
}

/// Type-erased read view of a family, used by the exposition encoder.
pub trait Exposable {
    fn name(&self) -> &'static str;
    fn help(&self) -> &'static str;
    fn kind(&self) -> MetricKind;
    fn label_names(&self) -> &'static [&'static str];
    fn samples(&self) -> Vec<(LabelValues, f64)>;
}

impl<M: Sample> Exposable for Family<M> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn help(&self) -> &'static str {
        self.help
    }

    fn kind(&self) -> MetricKind {
        M::KIND
    }

    fn label_names(&self) -> &'static [&'static str] {
        self.label_names
    }

    fn samples(&self) -> Vec<(LabelValues, f64)> {
        self.series
            .read()
            .iter()
            .map(|(labels, cell)| (labels.clone(), cell.sample()))
            .collect()
    }
}

/// Label names of the node identity gauge.
pub const NODE_INFO_LABELS: &[&str] = &[
    "num",
    "id",
    "longName",
    "shortName",
    "macaddr",
    "hwModel",
    "isLicensed",
];

/// Process-wide metrics for the mesh exporter.
#[derive(Debug)]
pub struct MetricsModel {
    /// Packets received, by port type.
    pub incoming_messages: Family<Counter>,
    /// Packets received, by source, destination and port type.
    pub message_count: Family<Counter>,
    /// Node identity; value is the last-heard unix timestamp.
    pub node_info: Family<Gauge>,
    pub node_latitude: Family<Gauge>,
    pub node_longitude: Family<Gauge>,
    pub node_altitude: Family<Gauge>,
    pub node_snr: Family<Gauge>,
    pub node_rssi: Family<Gauge>,
    pub node_hop_limit: Family<Gauge>,
    pub node_hop_count: Family<Gauge>,
    /// Telemetry readings keyed by metric name and group.
    pub device_metric: Family<Gauge>,
}

impl MetricsModel {
    /// Creates a new, empty metrics model.
    pub fn new() -> Self {
        Self {
            incoming_messages: Family::new(
                "incoming_messages_total",
                "Number of messages received by the radio.",
                &["type"],
            ),
            message_count: Family::new(
                "message_count_total",
                "Number of messages by source, destination and type.",
                &["src", "dest", "type"],
            ),
            node_info: Family::new(
                "node_info",
                "Identity of a known node; value is the last-heard unix time.",
                NODE_INFO_LABELS,
            ),
            node_latitude: Family::new("node_latitude", "Last reported latitude.", &["num"]),
            node_longitude: Family::new("node_longitude", "Last reported longitude.", &["num"]),
            node_altitude: Family::new("node_altitude", "Last reported altitude.", &["num"]),
            node_snr: Family::new(
                "node_snr",
                "Signal-to-noise ratio of the last direct reception.",
                &["num"],
            ),
            node_rssi: Family::new(
                "node_rssi",
                "Received signal strength of the last direct reception.",
                &["num"],
            ),
            node_hop_limit: Family::new(
                "node_hop_limit",
                "Hop budget the node starts its packets with.",
                &["num"],
            ),
            node_hop_count: Family::new(
                "node_hop_count",
                "Relays traversed by the node's last packet.",
                &["num"],
            ),
            device_metric: Family::new(
                "device_metric",
                "Telemetry reading reported by a node.",
                &["num", "metric", "type"],
            ),
        }
    }

    /// All families, in exposition order.
    pub fn families(&self) -> [&dyn Exposable; 11] {
        [
            &self.incoming_messages,
            &self.message_count,
            &self.node_info,
            &self.node_latitude,
            &self.node_longitude,
            &self.node_altitude,
            &self.node_snr,
            &self.node_rssi,
            &self.node_hop_limit,
            &self.node_hop_count,
            &self.device_metric,
        ]
    }
}

impl Default for MetricsModel {
    fn default() -> Self {
        Self::new()
    }
}
