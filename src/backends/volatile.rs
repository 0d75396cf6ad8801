//! Volatile (Water) backend: an in-memory store with optional per-entry TTL.
//!
//! Being in-memory, a fresh process always gets a fresh, empty
//! `VolatileBackend`. The hydrator still calls [`VolatileBackend::purge`]
//! at startup, since a future backend variant (e.g. an embedded-SQLite
//! Water tier) might persist across restarts where this one does not.

use super::{BackendStats, EdgeFilter, NodeFilter, StorageBackend};
use crate::error::Result;
use crate::model::{normalize_key, Edge, EdgeKey, Node};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Instant, SystemTime};

struct Entry<T> {
    value: T,
    expires_at: Option<Instant>,
}

pub struct VolatileBackend {
    nodes: RwLock<HashMap<String, Entry<Node>>>,
    edges: RwLock<HashMap<EdgeKey, Entry<Edge>>>,
    last_updated: RwLock<Option<SystemTime>>,
    default_ttl: Option<std::time::Duration>,
}

impl VolatileBackend {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            edges: RwLock::new(HashMap::new()),
            last_updated: RwLock::new(None),
            default_ttl: None,
        }
    }

    pub fn with_default_ttl(ttl: std::time::Duration) -> Self {
        Self {
            default_ttl: Some(ttl),
            ..Self::new()
        }
    }

    /// Clears all entries. The hydrator calls this at startup so Water
    /// never outlives a process restart, regardless of backend
    /// implementation.
    pub fn purge(&self) {
        self.nodes.write().clear();
        self.edges.write().clear();
    }

    fn is_live<T>(entry: &Entry<T>) -> bool {
        entry.expires_at.map(|at| Instant::now() < at).unwrap_or(true)
    }

    fn touch(&self) {
        *self.last_updated.write() = Some(SystemTime::now());
    }
}

impl Default for VolatileBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for VolatileBackend {
    async fn put_node(&self, node: &Node) -> Result<()> {
        let expires_at = self.default_ttl.map(|d| Instant::now() + d);
        self.nodes.write().insert(
            normalize_key(&node.id),
            Entry {
                value: node.clone(),
                expires_at,
            },
        );
        self.touch();
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> Result<()> {
        self.nodes.write().remove(&normalize_key(id));
        Ok(())
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let map = self.nodes.read();
        Ok(map
            .get(&normalize_key(id))
            .filter(|e| Self::is_live(e))
            .map(|e| e.value.clone()))
    }

    async fn scan_nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>> {
        let map = self.nodes.read();
        Ok(map
            .values()
            .filter(|e| Self::is_live(e))
            .map(|e| &e.value)
            .filter(|n| filter.type_id.as_deref().map(|t| t == n.type_id).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn put_edge(&self, edge: &Edge) -> Result<()> {
        let expires_at = self.default_ttl.map(|d| Instant::now() + d);
        self.edges.write().insert(
            edge.key(),
            Entry {
                value: edge.clone(),
                expires_at,
            },
        );
        self.touch();
        Ok(())
    }

    async fn delete_edge(&self, key: &EdgeKey) -> Result<()> {
        self.edges.write().remove(key);
        Ok(())
    }

    async fn scan_edges(&self, filter: &EdgeFilter) -> Result<Vec<Edge>> {
        let map = self.edges.read();
        Ok(map
            .values()
            .filter(|e| Self::is_live(e))
            .map(|e| &e.value)
            .filter(|e| {
                filter
                    .from_id
                    .as_deref()
                    .map(|f| normalize_key(f) == normalize_key(&e.from_id))
                    .unwrap_or(true)
                    && filter
                        .to_id
                        .as_deref()
                        .map(|t| normalize_key(t) == normalize_key(&e.to_id))
                        .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<BackendStats> {
        Ok(BackendStats {
            node_count: self.nodes.read().len() as u64,
            edge_count: self.edges.read().len() as u64,
            bytes: 0,
            last_updated: *self.last_updated.read(),
            backend_tag: "in-memory",
        })
    }

    async fn available(&self) -> bool {
        true
    }

    async fn purge(&self) -> Result<()> {
        self.purge();
        Ok(())
    }

    fn tag(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, Phase};

    #[tokio::test]
    async fn purge_clears_everything() {
        let backend = VolatileBackend::new();
        backend
            .put_node(&Node::new("a", "t", Phase::Water))
            .await
            .unwrap();
        assert_eq!(backend.stats().await.unwrap().node_count, 1);
        backend.purge();
        assert_eq!(backend.stats().await.unwrap().node_count, 0);
    }

    #[tokio::test]
    async fn ttl_expiry_hides_entries() {
        let backend = VolatileBackend::with_default_ttl(std::time::Duration::from_millis(10));
        backend
            .put_node(&Node::new("a", "t", Phase::Water))
            .await
            .unwrap();
        assert!(backend.get_node("a").await.unwrap().is_some());
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(backend.get_node("a").await.unwrap().is_none());
    }
}
