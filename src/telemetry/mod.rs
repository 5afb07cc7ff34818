//! Telemetry module for logging and metrics.
//!
//! Provides:
//! - Logging configuration and initialization
//! - The labeled metrics model shared with the scrape endpoint
//! - Prometheus text exposition

pub mod exposition;
pub(crate) mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig};
pub use metrics::{
    Counter, Exposable, Family, Gauge, LabelValues, MetricKind, MetricsModel, Sample,
    NODE_INFO_LABELS,
};
