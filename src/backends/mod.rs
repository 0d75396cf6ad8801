//! Storage backend contracts shared by the durable (Ice) and volatile
//! (Water) tiers.
//!
//! Only two variants ever exist - durable and volatile - so this is a flat
//! trait rather than a type hierarchy: a narrow capability set over deep
//! inheritance.

mod postgres;
mod sqlite;
mod volatile;

pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;
pub use volatile::VolatileBackend;

use crate::error::Result;
use crate::model::{Edge, EdgeKey, Node};
use async_trait::async_trait;
use std::time::SystemTime;

#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub type_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EdgeFilter {
    pub from_id: Option<String>,
    pub to_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BackendStats {
    pub node_count: u64,
    pub edge_count: u64,
    pub bytes: u64,
    pub last_updated: Option<SystemTime>,
    pub backend_tag: &'static str,
}

/// Shared capability set for a durability tier.
///
/// Implementations must be safe to call from multiple async writer workers
/// concurrently; any internal serialization (e.g. a single sqlite
/// connection) is the implementation's own concern.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn put_node(&self, node: &Node) -> Result<()>;
    async fn delete_node(&self, id: &str) -> Result<()>;
    async fn get_node(&self, id: &str) -> Result<Option<Node>>;
    async fn scan_nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>>;

    async fn put_edge(&self, edge: &Edge) -> Result<()>;
    async fn delete_edge(&self, key: &EdgeKey) -> Result<()>;
    async fn scan_edges(&self, filter: &EdgeFilter) -> Result<Vec<Edge>>;

    async fn batch_put_nodes(&self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            self.put_node(node).await?;
        }
        Ok(())
    }

    async fn batch_put_edges(&self, edges: &[Edge]) -> Result<()> {
        for edge in edges {
            self.put_edge(edge).await?;
        }
        Ok(())
    }

    async fn stats(&self) -> Result<BackendStats>;
    async fn available(&self) -> bool;

    /// Clears all entries. A no-op for durable backends; the volatile
    /// backend overrides this so the hydrator can clear Water at startup
    /// without caring which concrete backend it has.
    async fn purge(&self) -> Result<()> {
        Ok(())
    }

    /// Backend tag used in stats/health reporting ("sqlite", "postgresql", "in-memory").
    fn tag(&self) -> &'static str;
}
