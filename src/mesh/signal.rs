//! Hop count and signal-quality derivation
//!
//! SNR and RSSI describe the last radio hop. They are only attributed to
//! the source node when the packet was received directly (zero hops).

use super::packet::{NodeId, Routing};
use crate::telemetry::MetricsModel;
use tracing::trace;

/// Relays a packet traversed, when both hop fields are present and non-zero.
///
/// A hop limit above the hop start is malformed and yields `None`.
pub fn hop_count(routing: &Routing) -> Option<u32> {
    let hop_start = routing.hop_start.filter(|&h| h != 0)?;
    let hop_limit = routing.hop_limit.filter(|&h| h != 0)?;
    hop_start.checked_sub(hop_limit)
}

/// Publishes hop and signal gauges for `source`.
///
/// Returns the derived hop count, if any.
pub fn derive_routing_signals(
    routing: &Routing,
    source: NodeId,
    metrics: &MetricsModel,
) -> Option<u32> {
    let num = source.to_string();
    let labels = [num.as_str()];

    if let Some(hop_start) = routing.hop_start.filter(|&h| h != 0) {
        metrics.node_hop_limit.set(&labels, f64::from(hop_start));
    }

    let hops = hop_count(routing);
    if let Some(hops) = hops {
        metrics.node_hop_count.set(&labels, f64::from(hops));
    }

    if hops == Some(0) {
        if let Some(snr) = routing.rx_snr.filter(|&v| v != 0.0) {
            metrics.node_snr.set(&labels, snr);
        }
        if let Some(rssi) = routing.rx_rssi.filter(|&v| v != 0.0) {
            metrics.node_rssi.set(&labels, rssi);
        }
    } else {
        trace!("Node {}: not a direct reception, signal readings dropped", source);
    }

    hops
}
