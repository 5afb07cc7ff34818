//! Replays captured packet JSON through the feed and checks the exposition

use crate::{dispatcher, T0};
use mesh_exporter::feed::{load_snapshot, parse_line, read_packets, run_dispatcher};
use mesh_exporter::telemetry::exposition::render;
use std::io::Write;
use tokio::sync::mpsc;

const SNAPSHOT: &str = r#"{
  "!a1b2c3d4": {
    "num": 2712847316,
    "user": {"id": "!a1b2c3d4", "longName": "Hilltop Relay", "shortName": "HR",
             "macaddr": "3q2+7wAB", "hwModel": "RAK4631", "isLicensed": true},
    "lastHeard": 1700000000
  },
  "!00000042": {"num": 66}
}"#;

const CAPTURE: &str = r#"{"from": 2712847316, "to": 4294967295, "rxTime": 1700000300, "rxSnr": 9.75, "rxRssi": -71, "hopStart": 3, "hopLimit": 3, "decoded": {"portnum": "TELEMETRY_APP", "telemetry": {"deviceMetrics": {"batteryLevel": 101, "voltage": 4.2, "channelUtilization": 3.5}}}}
{"from": 66, "to": 2712847316, "rxTime": 1700000310, "rxSnr": 1.25, "rxRssi": -119, "hopStart": 3, "hopLimit": 1, "decoded": {"portnum": "POSITION_APP", "position": {"latitude": 47.37, "longitude": 8.54, "altitude": 410}}}
{"from": 66, "to": 4294967295, "rxTime": 1700000320, "decoded": {"portnum": "NODEINFO_APP", "user": {"id": "!00000042", "longName": "Trail \"Cam\"", "shortName": "TC", "hwModel": "TBEAM"}}}
{"from": 66, "to": 4294967295, "decoded": {"portnum": "RANGE_TEST_APP"}}
"#;

#[tokio::test]
async fn test_replay_capture() {
    let mut snapshot = tempfile::NamedTempFile::new().unwrap();
    snapshot.write_all(SNAPSHOT.as_bytes()).unwrap();

    let mut d = dispatcher();
    let published = d.seed(load_snapshot(snapshot.path()).unwrap());
    assert_eq!(published, 1);
    assert_eq!(d.registry().len(), 2);
    let metrics = d.metrics().clone();

    let (tx, rx) = mpsc::channel(2);
    let consumer = tokio::spawn(run_dispatcher(d, rx));
    let stats = read_packets(CAPTURE.as_bytes(), tx).await.unwrap();
    let d = consumer.await.unwrap();

    assert_eq!(stats.packets, 4);
    assert_eq!(stats.skipped, 0);
    assert_eq!(d.registry().get(66).unwrap().last_heard, 1_700_000_320);

    let text = render(&metrics, "meshtastic");

    assert!(text.contains(
        "meshtastic_node_info{num=\"2712847316\",id=\"!a1b2c3d4\",longName=\"Hilltop Relay\",\
         shortName=\"HR\",macaddr=\"3q2+7wAB\",hwModel=\"RAK4631\",isLicensed=\"true\"} 1700000300\n"
    ));
    assert!(text.contains(
        "meshtastic_node_info{num=\"66\",id=\"!00000042\",longName=\"Trail \\\"Cam\\\"\",\
         shortName=\"TC\",macaddr=\"\",hwModel=\"TBEAM\",isLicensed=\"false\"} 1700000320\n"
    ));
    assert!(text.contains("meshtastic_node_snr{num=\"2712847316\"} 9.75\n"));
    assert!(!text.contains("meshtastic_node_snr{num=\"66\"}"));
    assert!(text.contains("meshtastic_node_hop_count{num=\"66\"} 2\n"));
    assert!(text.contains("meshtastic_node_altitude{num=\"66\"} 410\n"));
    assert!(text.contains(
        "meshtastic_device_metric{num=\"2712847316\",metric=\"batteryLevel\",type=\"device\"} 101\n"
    ));
    assert!(text.contains(
        "meshtastic_message_count_total{src=\"66\",dest=\"2712847316\",type=\"POSITION_APP\"} 1\n"
    ));
    assert!(text.contains("meshtastic_incoming_messages_total{type=\"RANGE_TEST_APP\"} 1\n"));
}

#[test]
fn test_capture_lines_parse() {
    let packets: Vec<_> = CAPTURE
        .lines()
        .filter_map(|line| parse_line(line).unwrap())
        .collect();
    assert_eq!(packets.len(), 4);
    assert!(packets.iter().all(|p| p.rx_time.map_or(true, |t| t > T0)));
}
