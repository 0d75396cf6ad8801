//! Type index and meta lookups.
//!
//! Only one secondary index exists by design: `type_id -> {node ids}`. There
//! is deliberately no meta index - `get_nodes_by_meta` is a documented
//! linear scan.

use super::{meta_value_key, Inner, NodeRegistry};
use crate::model::Node;

impl NodeRegistry {
    /// All nodes whose `type_id` equals `type_id`, snapshot order unspecified.
    pub fn get_nodes_by_type(&self, type_id: &str) -> Vec<Node> {
        let index = self.inner.type_index.read();
        let Some(ids) = index.get(type_id) else {
            return Vec::new();
        };
        let nodes = self.inner.nodes.read();
        ids.iter().filter_map(|key| nodes.get(key)).cloned().collect()
    }

    /// Linear scan over every node for `meta[key] == value`. Intentionally
    /// unindexed; `limit` bounds how much work a caller pays for a wide
    /// match.
    pub fn get_nodes_by_meta(
        &self,
        key: &str,
        value: &serde_json::Value,
        limit: Option<usize>,
    ) -> Vec<Node> {
        let wanted = meta_value_key(value);
        let nodes = self.inner.nodes.read();
        let mut out = Vec::new();
        for node in nodes.values() {
            if let Some(v) = node.meta.get(key) {
                if meta_value_key(v) == wanted {
                    out.push(node.clone());
                    if let Some(limit) = limit {
                        if out.len() >= limit {
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

/// Adds `id` to `type_id`'s bucket, creating the bucket if needed. Returns
/// `true` the first time `type_id`'s bucket is created, so callers can
/// detect a newly-observed type and seed its meta-node.
pub(crate) fn type_index_insert(inner: &Inner, type_id: &str, id_key: &str) -> bool {
    let mut index = inner.type_index.write();
    let is_new = !index.contains_key(type_id);
    index
        .entry(type_id.to_string())
        .or_default()
        .insert(id_key.to_string());
    is_new
}

/// Removes `id` from `type_id`'s bucket, dropping the bucket if it empties.
pub(crate) fn type_index_remove(inner: &Inner, type_id: &str, id_key: &str) {
    let mut index = inner.type_index.write();
    if let Some(bucket) = index.get_mut(type_id) {
        bucket.remove(id_key);
        if bucket.is_empty() {
            index.remove(type_id);
        }
    }
}
