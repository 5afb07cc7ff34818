//! Packet feed
//!
//! Reads decoded packets as JSON lines and hands them to the dispatcher
//! task over a bounded channel. The reader is the only producer and the
//! dispatcher task the only consumer, so packets are processed in arrival
//! order.

use crate::config::FeedConfig;
use crate::mesh::{parse_snapshot, DecodedPacket, Dispatcher, NodeRecord};
use crate::{Error, Result};
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Boxed line source (stdin or a file).
pub type PacketSource = Box<dyn AsyncBufRead + Unpin + Send>;

/// Counters for one pass over a packet source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub lines: u64,
    pub packets: u64,
    pub skipped: u64,
}

/// Parses one feed line; blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<DecodedPacket>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    DecodedPacket::from_json(line).map(Some)
}

/// Opens the configured input.
pub async fn open_source(config: &FeedConfig) -> Result<PacketSource> {
    if config.reads_stdin() {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(&config.input).await.map_err(|e| {
        Error::Feed(format!("cannot open {}: {}", config.input.display(), e))
    })?;
    Ok(Box::new(BufReader::new(file)))
}

/// Loads the startup node snapshot.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Vec<NodeRecord>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Feed(format!("cannot read {}: {}", path.display(), e)))?;
    let entries = parse_snapshot(&content)?;
    Ok(entries.into_iter().map(NodeRecord::from).collect())
}

/// Reads `source` to the end, sending each packet to `tx`.
///
/// Lines that are not UTF-8 or fail to parse are logged and skipped.
/// Stops early when the receiving side has gone away.
pub async fn read_packets<R>(mut source: R, tx: mpsc::Sender<DecodedPacket>) -> Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = FeedStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if source.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        stats.lines += 1;

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                stats.skipped += 1;
                warn!("Skipping line {}: not UTF-8 ({})", stats.lines, e);
                continue;
            }
        };

        match parse_line(line) {
            Ok(Some(packet)) => {
                if tx.send(packet).await.is_err() {
                    debug!("Dispatcher gone, stopping feed at line {}", stats.lines);
                    break;
                }
                stats.packets += 1;
            }
            Ok(None) => {}
            Err(e) => {
                stats.skipped += 1;
                warn!("Skipping line {}: {}", stats.lines, e);
            }
        }
    }

    info!(
        "Feed finished: {} lines, {} packets, {} skipped",
        stats.lines, stats.packets, stats.skipped
    );
    Ok(stats)
}

/// Drains `rx` into the dispatcher until every sender is dropped.
pub async fn run_dispatcher(
    mut dispatcher: Dispatcher,
    mut rx: mpsc::Receiver<DecodedPacket>,
) -> Dispatcher {
    while let Some(packet) = rx.recv().await {
        dispatcher.handle_packet(&packet);
    }
    dispatcher
}
