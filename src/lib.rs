//! Mesh Exporter
//!
//! Observes a packet-radio mesh network and republishes node identity,
//! position, signal quality and traffic counts as Prometheus metrics.
//! Packets arrive already decoded; this crate classifies them, keeps a
//! registry of known nodes and projects payloads into labeled metrics.

pub mod config;
pub mod error;
pub mod feed;
pub mod mesh;
pub mod server;
pub mod telemetry;

pub use error::{Error, Result};
