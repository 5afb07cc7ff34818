//! Mesh packet classification and metric projection
//!
//! Decoded packets enter through [`Dispatcher::handle_packet`], which
//! updates the node registry and writes metric observations.

mod dispatcher;
mod packet;
mod projector;
mod registry;
mod signal;

pub use dispatcher::{unix_now, Clock, Dispatcher, BROADCAST_LABEL};
pub use packet::{
    parse_snapshot, DecodedPacket, Identity, NodeId, Payload, PortType, Position, Routing,
    SnapshotEntry, Telemetry, BROADCAST_ADDR,
};
pub use projector::{
    project_node_info, project_position, project_telemetry, DEVICE_GROUP, ENVIRONMENT_GROUP,
};
pub use registry::{node_info_labels, NodeRecord, NodeRegistry, NEVER_HEARD};
pub use signal::{derive_routing_signals, hop_count};
