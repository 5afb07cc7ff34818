//! Node registry (node number to identity and last-heard time)
//!
//! The registry is owned by the dispatcher and written only from the packet
//! path. Scrapers never read it directly; they see the `node_info` series it
//! publishes.
//!
//! Known limitation: once a node has an identity, later NODEINFO packets do
//! not replace it. Renames only show up after a restart. The last-heard
//! timestamp is always refreshed.

use super::packet::{Identity, NodeId, SnapshotEntry};
use crate::telemetry::MetricsModel;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, info};

/// Last-heard value for a node the radio has never heard.
pub const NEVER_HEARD: u64 = 0;

/// Registry entry for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub identity: Option<Identity>,
    /// Unix seconds, or [`NEVER_HEARD`].
    pub last_heard: u64,
}

impl From<SnapshotEntry> for NodeRecord {
    fn from(entry: SnapshotEntry) -> Self {
        Self {
            id: entry.num,
            identity: entry.user,
            last_heard: entry.last_heard.unwrap_or(NEVER_HEARD),
        }
    }
}

/// Known nodes keyed by node number
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: HashMap<NodeId, NodeRecord>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load records from the radio's node cache.
    ///
    /// Records with an identity are published immediately. A record for a
    /// node that is already registered keeps the existing identity and only
    /// moves `last_heard` forward. Returns the number of records published.
    pub fn seed<I>(&mut self, records: I, metrics: &MetricsModel) -> usize
    where
        I: IntoIterator<Item = NodeRecord>,
    {
        let mut published = 0;
        for record in records {
            let entry = self
                .nodes
                .entry(record.id)
                .and_modify(|existing| {
                    if existing.identity.is_none() {
                        existing.identity = record.identity.clone();
                    }
                    existing.last_heard = existing.last_heard.max(record.last_heard);
                })
                .or_insert(record);

            if publish_node_info(entry, metrics) {
                published += 1;
            }
        }
        debug!(
            "Seeded registry: {} nodes known, {} published",
            self.nodes.len(),
            published
        );
        published
    }

    /// Record an identity sighting for `id`.
    ///
    /// Unknown nodes are created. Known nodes keep their first identity (a
    /// node seeded without one adopts this one) and get `last_heard`
    /// refreshed. `node_info` is republished either way.
    pub fn observe_identity(
        &mut self,
        id: NodeId,
        identity: Identity,
        observed_at: u64,
        metrics: &MetricsModel,
    ) {
        let record = match self.nodes.entry(id) {
            Entry::Occupied(occupied) => {
                let record = occupied.into_mut();
                if record.identity.is_none() {
                    record.identity = Some(identity);
                } else if let Some(current) =
                    record.identity.as_ref().filter(|c| **c != identity)
                {
                    debug!(
                        "Node {} announced '{}', keeping '{}'",
                        id, identity.long_name, current.long_name
                    );
                }
                record.last_heard = observed_at;
                record
            }
            Entry::Vacant(vacant) => {
                info!(
                    "New node {} ({} / {})",
                    id, identity.long_name, identity.short_name
                );
                vacant.insert(NodeRecord {
                    id,
                    identity: Some(identity),
                    last_heard: observed_at,
                })
            }
        };

        publish_node_info(record, metrics);
    }

    /// Refresh `last_heard` of a registered node and republish it.
    ///
    /// Returns false, doing nothing, when `id` is not registered.
    pub fn touch_last_heard(
        &mut self,
        id: NodeId,
        observed_at: u64,
        metrics: &MetricsModel,
    ) -> bool {
        match self.nodes.get_mut(&id) {
            Some(record) => {
                record.last_heard = observed_at;
                publish_node_info(record, metrics);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Label values of the `node_info` series for a record with an identity.
pub fn node_info_labels(id: NodeId, identity: &Identity) -> [String; 7] {
    [
        id.to_string(),
        identity.id.clone(),
        identity.long_name.clone(),
        identity.short_name.clone(),
        identity.macaddr.clone(),
        identity.hw_model.clone(),
        identity.is_licensed.to_string(),
    ]
}

/// Publishes `node_info` for `record`; records without identity are skipped.
fn publish_node_info(record: &NodeRecord, metrics: &MetricsModel) -> bool {
    let Some(identity) = &record.identity else {
        return false;
    };
    let labels = node_info_labels(record.id, identity);
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
    metrics.node_info.set(&labels, record.last_heard as f64);
    true
}
