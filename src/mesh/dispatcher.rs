//! Packet dispatcher
//!
//! Entry point of the mesh engine. Each decoded packet is accounted for,
//! its routing metadata is derived, and its payload is handed to the
//! matching projector. Processing is in-memory only and never fails.

use super::packet::{DecodedPacket, Payload, PortType};
use super::projector::{project_node_info, project_position, project_telemetry};
use super::registry::{NodeRecord, NodeRegistry};
use super::signal::derive_routing_signals;
use crate::telemetry::MetricsModel;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

/// `dest` label value for broadcast packets.
pub const BROADCAST_LABEL: &str = "all";

/// Source of "now" in unix seconds.
pub type Clock = fn() -> u64;

/// Wall-clock time in unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Routes decoded packets into the node registry and the metrics model
pub struct Dispatcher {
    /// Known nodes; written only from `handle_packet` and `seed`
    registry: NodeRegistry,
    /// Metrics shared with the scrape endpoint
    metrics: Arc<MetricsModel>,
    /// Fallback timestamp for packets without a receive time
    clock: Clock,
}

impl Dispatcher {
    /// Create a dispatcher writing into `metrics`
    pub fn new(metrics: Arc<MetricsModel>) -> Self {
        Self::with_clock(metrics, unix_now)
    }

    pub fn with_clock(metrics: Arc<MetricsModel>, clock: Clock) -> Self {
        Self {
            registry: NodeRegistry::new(),
            metrics,
            clock,
        }
    }

    /// Get a reference to the metrics model
    pub fn metrics(&self) -> &Arc<MetricsModel> {
        &self.metrics
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Load the radio's node cache, returning how many nodes were published
    pub fn seed<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = NodeRecord>,
    {
        self.registry.seed(records, &self.metrics)
    }

    /// Process one decoded packet
    pub fn handle_packet(&mut self, packet: &DecodedPacket) {
        let port = packet.port.as_str();
        trace!(
            "Packet {} -> {:#x} on {} (rx_time={:?})",
            packet.from,
            packet.to,
            port,
            packet.rx_time
        );

        self.metrics.incoming_messages.inc(&[port]);

        if let Some(rx_time) = packet.rx_time {
            self.registry
                .touch_last_heard(packet.from, rx_time, &self.metrics);
        }

        let src = packet.from.to_string();
        let dest = if packet.is_broadcast() {
            BROADCAST_LABEL.to_string()
        } else {
            packet.to.to_string()
        };
        self.metrics
            .message_count
            .inc(&[src.as_str(), dest.as_str(), port]);

        derive_routing_signals(&packet.routing, packet.from, &self.metrics);

        match (&packet.port, &packet.payload) {
            (PortType::NodeInfo, Payload::NodeInfo(identity)) => {
                let observed_at = packet.rx_time.unwrap_or_else(self.clock);
                project_node_info(
                    identity.as_ref(),
                    packet.from,
                    observed_at,
                    &mut self.registry,
                    &self.metrics,
                );
            }
            (PortType::Position, Payload::Position(position)) => {
                project_position(position, packet.from, &self.metrics);
            }
            (PortType::Telemetry, Payload::Telemetry(telemetry)) => {
                project_telemetry(telemetry, packet.from, &self.metrics);
            }
            (PortType::NodeInfo | PortType::Position | PortType::Telemetry, _) => {
                debug!(
                    "Packet from {} on {} carries a mismatched payload, skipped",
                    packet.from, port
                );
            }
            _ => {}
        }
    }
}
