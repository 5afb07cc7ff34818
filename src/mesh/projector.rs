//! Payload projectors
//!
//! One function per payload kind. Each writes only what the payload
//! actually carries; missing fields publish nothing.

use super::packet::{Identity, NodeId, Position, Telemetry};
use super::registry::NodeRegistry;
use crate::telemetry::MetricsModel;
use std::collections::BTreeMap;

/// `type` label for readings from the device metrics group.
pub const DEVICE_GROUP: &str = "device";

/// `type` label for readings from the environment metrics group.
pub const ENVIRONMENT_GROUP: &str = "environment";

/// Hands an announced identity to the registry.
pub fn project_node_info(
    identity: Option<&Identity>,
    source: NodeId,
    observed_at: u64,
    registry: &mut NodeRegistry,
    metrics: &MetricsModel,
) {
    if let Some(identity) = identity {
        registry.observe_identity(source, identity.clone(), observed_at, metrics);
    }
}

pub fn project_position(position: &Position, source: NodeId, metrics: &MetricsModel) {
    let num = source.to_string();
    let labels = [num.as_str()];

    if let Some(latitude) = position.latitude {
        metrics.node_latitude.set(&labels, latitude);
    }
    if let Some(longitude) = position.longitude {
        metrics.node_longitude.set(&labels, longitude);
    }
    if let Some(altitude) = position.altitude {
        metrics.node_altitude.set(&labels, altitude);
    }
}

/// Publishes every telemetry reading as `device_metric{num, metric, type}`.
pub fn project_telemetry(telemetry: &Telemetry, source: NodeId, metrics: &MetricsModel) {
    let num = source.to_string();
    publish_group(&telemetry.device, &num, DEVICE_GROUP, metrics);
    publish_group(&telemetry.environment, &num, ENVIRONMENT_GROUP, metrics);
}

fn publish_group(
    readings: &BTreeMap<String, f64>,
    num: &str,
    group: &str,
    metrics: &MetricsModel,
) {
    for (metric, value) in readings {
        metrics
            .device_metric
            .set(&[num, metric.as_str(), group], *value);
    }
}
