//! Stub durable backend for `ICE_STORAGE_TYPE=postgresql`.
//!
//! No `tokio-postgres`/`sqlx` dependency is wired up (see DESIGN.md, Open
//! Question (c)): every operation reports `BackendUnavailable`. A backend
//! fault never invalidates in-memory registry state - it is only surfaced
//! via retry/metrics on the async writer's side.

use super::{BackendStats, EdgeFilter, NodeFilter, StorageBackend};
use crate::error::{CodexError, Result};
use crate::model::{Edge, EdgeKey, Node};
use async_trait::async_trait;

pub struct PostgresBackend {
    connection_string: String,
}

impl PostgresBackend {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }

    fn unavailable(&self) -> CodexError {
        CodexError::BackendUnavailable(format!(
            "postgresql durable backend is not wired up (connection string: {})",
            self.connection_string
        ))
    }
}

#[async_trait]
impl StorageBackend for PostgresBackend {
    async fn put_node(&self, _node: &Node) -> Result<()> {
        Err(self.unavailable())
    }
    async fn delete_node(&self, _id: &str) -> Result<()> {
        Err(self.unavailable())
    }
    async fn get_node(&self, _id: &str) -> Result<Option<Node>> {
        Err(self.unavailable())
    }
    async fn scan_nodes(&self, _filter: &NodeFilter) -> Result<Vec<Node>> {
        Err(self.unavailable())
    }
    async fn put_edge(&self, _edge: &Edge) -> Result<()> {
        Err(self.unavailable())
    }
    async fn delete_edge(&self, _key: &EdgeKey) -> Result<()> {
        Err(self.unavailable())
    }
    async fn scan_edges(&self, _filter: &EdgeFilter) -> Result<Vec<Edge>> {
        Err(self.unavailable())
    }
    async fn stats(&self) -> Result<BackendStats> {
        Err(self.unavailable())
    }
    async fn available(&self) -> bool {
        false
    }
    fn tag(&self) -> &'static str {
        "postgresql"
    }
}
