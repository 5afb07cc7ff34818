//! Decoded mesh packets and the startup node snapshot.
//!
//! The JSON shape matches what the radio's client library emits for a
//! received packet: a flat envelope (`from`, `to`, `rxTime`, `rxSnr`, ...)
//! with the application payload under `decoded`. Every envelope field except
//! `from` may be absent.

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Mesh node number.
pub type NodeId = u32;

/// Destination value meaning "all nodes".
pub const BROADCAST_ADDR: NodeId = 0xFFFF_FFFF;

/// Application port a packet was sent on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortType {
    TextMessage,
    Position,
    NodeInfo,
    Routing,
    Admin,
    Telemetry,
    Traceroute,
    NeighborInfo,
    RangeTest,
    StoreForward,
    Waypoint,
    /// Packet arrived without a decoded section.
    Unknown,
    /// Any other port, kept by name.
    Other(String),
}

impl PortType {
    /// Port name as used in the `type` label.
    pub fn as_str(&self) -> &str {
        match self {
            PortType::TextMessage => "TEXT_MESSAGE_APP",
            PortType::Position => "POSITION_APP",
            PortType::NodeInfo => "NODEINFO_APP",
            PortType::Routing => "ROUTING_APP",
            PortType::Admin => "ADMIN_APP",
            PortType::Telemetry => "TELEMETRY_APP",
            PortType::Traceroute => "TRACEROUTE_APP",
            PortType::NeighborInfo => "NEIGHBORINFO_APP",
            PortType::RangeTest => "RANGE_TEST_APP",
            PortType::StoreForward => "STORE_FORWARD_APP",
            PortType::Waypoint => "WAYPOINT_APP",
            PortType::Unknown => "UNKNOWN",
            PortType::Other(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "TEXT_MESSAGE_APP" => PortType::TextMessage,
            "POSITION_APP" => PortType::Position,
            "NODEINFO_APP" => PortType::NodeInfo,
            "ROUTING_APP" => PortType::Routing,
            "ADMIN_APP" => PortType::Admin,
            "TELEMETRY_APP" => PortType::Telemetry,
            "TRACEROUTE_APP" => PortType::Traceroute,
            "NEIGHBORINFO_APP" => PortType::NeighborInfo,
            "RANGE_TEST_APP" => PortType::RangeTest,
            "STORE_FORWARD_APP" => PortType::StoreForward,
            "WAYPOINT_APP" => PortType::Waypoint,
            "UNKNOWN" | "" => PortType::Unknown,
            other => PortType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity a node announces about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Identity {
    /// User id string, usually `!` followed by the hex node number.
    pub id: String,
    pub long_name: String,
    pub short_name: String,
    pub macaddr: String,
    pub hw_model: String,
    pub is_licensed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Position {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
}

/// Telemetry groups the exporter understands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    pub device: BTreeMap<String, f64>,
    pub environment: BTreeMap<String, f64>,
}

/// Payload variant, selected by the packet's port.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Telemetry(Telemetry),
    Position(Position),
    /// `None` when the packet carried no user section.
    NodeInfo(Option<Identity>),
    Opaque,
}

/// Hop budget and link quality as seen by the receiving radio.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Routing {
    pub hop_start: Option<u32>,
    pub hop_limit: Option<u32>,
    pub rx_snr: Option<f64>,
    pub rx_rssi: Option<f64>,
}

/// A packet after protocol decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPacket {
    pub from: NodeId,
    pub to: NodeId,
    pub port: PortType,
    pub payload: Payload,
    pub routing: Routing,
    /// Unix seconds at which the radio received the packet.
    pub rx_time: Option<u64>,
}

impl DecodedPacket {
    /// Creates a packet with no routing metadata or receive time.
    pub fn new(from: NodeId, to: NodeId, port: PortType, payload: Payload) -> Self {
        Self {
            from,
            to,
            port,
            payload,
            routing: Routing::default(),
            rx_time: None,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.to == BROADCAST_ADDR
    }

    /// Parses one packet from its JSON form.
    pub fn from_json(text: &str) -> Result<Self> {
        let wire: WirePacket =
            serde_json::from_str(text).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(wire.into())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePacket {
    from: NodeId,
    #[serde(default = "broadcast")]
    to: NodeId,
    rx_time: Option<u64>,
    rx_snr: Option<f64>,
    rx_rssi: Option<f64>,
    hop_start: Option<u32>,
    hop_limit: Option<u32>,
    decoded: Option<WireDecoded>,
}

fn broadcast() -> NodeId {
    BROADCAST_ADDR
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireDecoded {
    portnum: Option<String>,
    telemetry: Option<WireTelemetry>,
    position: Option<Position>,
    user: Option<Identity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireTelemetry {
    device_metrics: BTreeMap<String, Value>,
    environment_metrics: BTreeMap<String, Value>,
}

/// Keeps only the numeric readings of a telemetry group.
fn numeric_readings(group: BTreeMap<String, Value>) -> BTreeMap<String, f64> {
    group
        .into_iter()
        .filter_map(|(key, value)| value.as_f64().map(|v| (key, v)))
        .collect()
}

impl From<WirePacket> for DecodedPacket {
    fn from(wire: WirePacket) -> Self {
        let decoded = wire.decoded.unwrap_or_default();
        let port = decoded
            .portnum
            .as_deref()
            .map(PortType::from_name)
            .unwrap_or(PortType::Unknown);

        let payload = match port {
            PortType::Telemetry => {
                let telemetry = decoded.telemetry.unwrap_or_default();
                Payload::Telemetry(Telemetry {
                    device: numeric_readings(telemetry.device_metrics),
                    environment: numeric_readings(telemetry.environment_metrics),
                })
            }
            PortType::Position => Payload::Position(decoded.position.unwrap_or_default()),
            PortType::NodeInfo => Payload::NodeInfo(decoded.user),
            _ => Payload::Opaque,
        };

        Self {
            from: wire.from,
            to: wire.to,
            port,
            payload,
            routing: Routing {
                hop_start: wire.hop_start,
                hop_limit: wire.hop_limit,
                rx_snr: wire.rx_snr,
                rx_rssi: wire.rx_rssi,
            },
            rx_time: wire.rx_time,
        }
    }
}

/// One entry of the radio's cached node database.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub num: NodeId,
    #[serde(default)]
    pub user: Option<Identity>,
    #[serde(default)]
    pub last_heard: Option<u64>,
}

/// Parses the node snapshot, a JSON object keyed by node id string.
///
/// Entries come back ordered by node number.
pub fn parse_snapshot(text: &str) -> Result<Vec<SnapshotEntry>> {
    let nodes: BTreeMap<String, SnapshotEntry> =
        serde_json::from_str(text).map_err(|e| Error::Parse(e.to_string()))?;
    let mut entries: Vec<SnapshotEntry> = nodes.into_values().collect();
    entries.sort_by_key(|e| e.num);
    Ok(entries)
}
