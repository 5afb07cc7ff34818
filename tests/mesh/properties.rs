//! Observable guarantees of the dispatcher, registry and projectors

use crate::{dispatcher, num, T0};
use mesh_exporter::mesh::{
    node_info_labels, DecodedPacket, Identity, NodeRecord, Payload, PortType, Position,
    Routing, Telemetry, BROADCAST_ADDR,
};
use mesh_exporter::telemetry::MetricsModel;
use std::collections::BTreeMap;

fn node_info_value(metrics: &MetricsModel, id: u32, identity: &Identity) -> Option<f64> {
    let labels = node_info_labels(id, identity);
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
    metrics.node_info.value(&labels)
}

fn with_routing(mut packet: DecodedPacket, hop_start: u32, hop_limit: u32) -> DecodedPacket {
    packet.routing = Routing {
        hop_start: Some(hop_start),
        hop_limit: Some(hop_limit),
        rx_snr: Some(7.5),
        rx_rssi: Some(-88.0),
    };
    packet
}

fn opaque(from: u32) -> DecodedPacket {
    DecodedPacket::new(from, BROADCAST_ADDR, PortType::TextMessage, Payload::Opaque)
}

fn identity(id: u32, long_name: &str) -> Identity {
    Identity {
        id: format!("!{:08x}", id),
        long_name: long_name.to_string(),
        short_name: long_name.chars().take(2).collect(),
        macaddr: String::new(),
        hw_model: "HELTEC_V3".to_string(),
        is_licensed: false,
    }
}

fn node_info_packet(from: u32, long_name: &str, rx_time: u64) -> DecodedPacket {
    let mut packet = DecodedPacket::new(
        from,
        BROADCAST_ADDR,
        PortType::NodeInfo,
        Payload::NodeInfo(Some(identity(from, long_name))),
    );
    packet.rx_time = Some(rx_time);
    packet
}

#[test]
fn test_direct_reception_updates_signal() {
    let mut d = dispatcher();
    d.handle_packet(&with_routing(opaque(11), 3, 3));

    let m = d.metrics();
    assert_eq!(m.node_snr.value(&[num(11).as_str()]), Some(7.5));
    assert_eq!(m.node_rssi.value(&[num(11).as_str()]), Some(-88.0));
}

#[test]
fn test_relayed_reception_never_updates_signal() {
    let mut d = dispatcher();
    for (hop_start, hop_limit) in [(3, 2), (7, 1), (5, 4)] {
        d.handle_packet(&with_routing(opaque(12), hop_start, hop_limit));
    }

    let m = d.metrics();
    assert!(m.node_snr.is_empty());
    assert!(m.node_rssi.is_empty());
}

#[test]
fn test_hop_count_is_start_minus_limit() {
    let mut d = dispatcher();
    for hop_start in 1..=7u32 {
        for hop_limit in 1..=hop_start {
            d.handle_packet(&with_routing(opaque(13), hop_start, hop_limit));
            assert_eq!(
                d.metrics().node_hop_count.value(&[num(13).as_str()]),
                Some(f64::from(hop_start - hop_limit))
            );
        }
    }
}

#[test]
fn test_missing_hop_field_skips_hop_count() {
    let mut d = dispatcher();
    let mut packet = opaque(14);
    packet.routing.hop_start = Some(3);
    d.handle_packet(&packet);

    let m = d.metrics();
    assert!(m.node_hop_count.is_empty());
    assert_eq!(m.node_hop_limit.value(&[num(14).as_str()]), Some(3.0));
}

#[test]
fn test_seed_then_touch() {
    let mut d = dispatcher();
    let base = identity(20, "Base");
    d.seed([NodeRecord {
        id: 20,
        identity: Some(base.clone()),
        last_heard: T0,
    }]);
    assert_eq!(node_info_value(d.metrics(), 20, &base), Some(T0 as f64));

    let mut packet = opaque(20);
    packet.rx_time = Some(T0 + 60);
    d.handle_packet(&packet);

    assert_eq!(node_info_value(d.metrics(), 20, &base), Some((T0 + 60) as f64));
    assert_eq!(d.metrics().node_info.len(), 1);
}

#[test]
fn test_reidentify_keeps_first_identity() {
    let mut d = dispatcher();
    d.handle_packet(&node_info_packet(5, "Alice", T0));
    assert_eq!(
        node_info_value(d.metrics(), 5, &identity(5, "Alice")),
        Some(T0 as f64)
    );

    d.handle_packet(&node_info_packet(5, "Alicia", T0 + 10));

    let m = d.metrics();
    assert_eq!(m.node_info.len(), 1);
    assert_eq!(
        node_info_value(m, 5, &identity(5, "Alice")),
        Some((T0 + 10) as f64)
    );
    assert_eq!(node_info_value(m, 5, &identity(5, "Alicia")), None);
}

#[test]
fn test_telemetry_projection() {
    let mut d = dispatcher();
    d.handle_packet(&DecodedPacket::new(
        7,
        BROADCAST_ADDR,
        PortType::Telemetry,
        Payload::Telemetry(Telemetry {
            device: BTreeMap::from([("battery".to_string(), 80.0)]),
            environment: BTreeMap::from([("temperature".to_string(), 21.5)]),
        }),
    ));

    let m = d.metrics();
    assert_eq!(
        m.device_metric.value(&["7", "battery", "device"]),
        Some(80.0)
    );
    assert_eq!(
        m.device_metric.value(&["7", "temperature", "environment"]),
        Some(21.5)
    );
}

#[test]
fn test_broadcast_rendered_as_all() {
    let mut d = dispatcher();
    d.handle_packet(&opaque(30));

    let m = d.metrics();
    assert_eq!(
        m.message_count.value(&["30", "all", "TEXT_MESSAGE_APP"]),
        Some(1.0)
    );
    let broadcast = BROADCAST_ADDR.to_string();
    assert!(m
        .message_count
        .label_sets()
        .iter()
        .all(|labels| labels[1] != broadcast));
}

#[test]
fn test_thousand_mixed_packets() {
    let mut d = dispatcher();
    let ports = [
        PortType::Telemetry,
        PortType::Position,
        PortType::NodeInfo,
        PortType::TextMessage,
        PortType::Other("PAXCOUNTER_APP".to_string()),
    ];

    for i in 0..1000u32 {
        let port = ports[(i % 5) as usize].clone();
        let payload = match port {
            PortType::Telemetry if i % 2 == 0 => Payload::Telemetry(Telemetry::default()),
            PortType::Position => Payload::Position(Position {
                latitude: Some(f64::from(i)),
                ..Position::default()
            }),
            PortType::NodeInfo if i % 3 == 0 => Payload::NodeInfo(None),
            PortType::NodeInfo => Payload::NodeInfo(Some(identity(i % 17, "Node"))),
            _ => Payload::Opaque,
        };
        let dest = if i % 4 == 0 { BROADCAST_ADDR } else { i % 4 };
        let mut packet = DecodedPacket::new(i % 17, dest, port, payload);
        if i % 7 == 0 {
            packet = with_routing(packet, 3, 3 - (i % 3));
        }
        if i % 11 == 0 {
            packet.rx_time = Some(T0 + u64::from(i));
        }
        d.handle_packet(&packet);
    }

    let m = d.metrics();
    assert_eq!(m.incoming_messages.total(), 1000.0);
    for port in &ports {
        assert_eq!(m.incoming_messages.value(&[port.as_str()]), Some(200.0));
    }
    assert_eq!(m.message_count.total(), 1000.0);
}
