//! Durable (Ice) backend: a relational store over SQLite via `rusqlite`.
//!
//! Two tables keyed on normalized-lowercase identity columns (so
//! case-insensitive identity is enforced by the primary key itself), a
//! secondary index on `type_id`, and secondary indices on the edge
//! adjacency columns. `meta`/`content` serialize to JSON text; inline
//! bytes live inside that JSON as base64 (see `model::ContentRef`), which
//! keeps the schema to exactly two tables rather than adding a third blob
//! table.

use super::{BackendStats, EdgeFilter, NodeFilter, StorageBackend};
use crate::error::{acquire_lock, CodexError, Result};
use crate::model::{normalize_key, Edge, EdgeKey, Node, Phase};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::warn;

pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    tag: &'static str,
}

impl SqliteBackend {
    pub fn open(connection_string: &str) -> Result<Self> {
        let conn = if connection_string == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(connection_string)?
        };
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             CREATE TABLE IF NOT EXISTS nodes (
                id_key TEXT PRIMARY KEY,
                id TEXT NOT NULL,
                type_id TEXT NOT NULL,
                state TEXT NOT NULL,
                locale TEXT,
                title TEXT,
                description TEXT,
                content_json TEXT,
                meta_json TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_nodes_type_id ON nodes(type_id);
             CREATE TABLE IF NOT EXISTS edges (
                from_key TEXT NOT NULL,
                role_key TEXT NOT NULL,
                to_key TEXT NOT NULL,
                from_id TEXT NOT NULL,
                to_id TEXT NOT NULL,
                role TEXT NOT NULL,
                weight REAL NOT NULL,
                meta_json TEXT NOT NULL,
                PRIMARY KEY (from_key, role_key, to_key)
             );
             CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_key);
             CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_key);",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            tag: "sqlite",
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        let guard = acquire_lock(&conn)?;
        f(&guard).map_err(CodexError::from)
    }
}

fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<Node> {
    let state_str: String = row.get("state")?;
    let content_json: Option<String> = row.get("content_json")?;
    let meta_json: String = row.get("meta_json")?;
    Ok(Node {
        id: row.get("id")?,
        type_id: row.get("type_id")?,
        state: Phase::parse(&state_str).unwrap_or(Phase::Gas),
        locale: row.get("locale")?,
        title: row.get("title")?,
        description: row.get("description")?,
        content: content_json
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        meta: serde_json::from_str(&meta_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
    })
}

/// Pairs a row's primary-key string with its parsed `Node`, so a failure in
/// `row_to_node` can still be logged against the row that caused it without
/// aborting the rest of the scan (spec §7, `BackendCorrupt`: "the offending
/// row is skipped; hydration continues").
fn row_to_node_checked(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, rusqlite::Result<Node>)> {
    let id_key: String = row.get("id_key")?;
    Ok((id_key, row_to_node(row)))
}

/// Logs and skips a scan row that failed to deserialize, rather than
/// failing the whole scan over one bad row.
fn skip_corrupt_row(key: &str, kind: &str, e: rusqlite::Error) {
    let err = CodexError::BackendCorrupt(format!("{kind} row '{key}' is undeserializable: {e}"));
    warn!(key, kind, error = %err, "skipping corrupt row during scan");
}

fn row_to_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<Edge> {
    let meta_json: String = row.get("meta_json")?;
    Ok(Edge {
        from_id: row.get("from_id")?,
        to_id: row.get("to_id")?,
        role: row.get("role")?,
        weight: row.get("weight")?,
        meta: serde_json::from_str(&meta_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        derived_state: Phase::Gas,
    })
}

/// Same pairing as `row_to_node_checked`, keyed on the edge's composite
/// primary key for log identification.
fn row_to_edge_checked(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, rusqlite::Result<Edge>)> {
    let from_key: String = row.get("from_key")?;
    let role_key: String = row.get("role_key")?;
    let to_key: String = row.get("to_key")?;
    let key = format!("{from_key}--{role_key}-->{to_key}");
    Ok((key, row_to_edge(row)))
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn put_node(&self, node: &Node) -> Result<()> {
        let node = node.clone();
        self.with_conn(move |conn| {
            let content_json = node
                .content
                .as_ref()
                .map(|c| serde_json::to_string(c).unwrap_or_default());
            let meta_json = serde_json::to_string(&node.meta).unwrap_or_default();
            conn.execute(
                "INSERT INTO nodes (id_key, id, type_id, state, locale, title, description, content_json, meta_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id_key) DO UPDATE SET
                    id=excluded.id, type_id=excluded.type_id, state=excluded.state,
                    locale=excluded.locale, title=excluded.title, description=excluded.description,
                    content_json=excluded.content_json, meta_json=excluded.meta_json",
                params![
                    normalize_key(&node.id),
                    node.id,
                    node.type_id,
                    node.state.as_str(),
                    node.locale,
                    node.title,
                    node.description,
                    content_json,
                    meta_json,
                ],
            )?;
            Ok(())
        })
    }

    async fn delete_node(&self, id: &str) -> Result<()> {
        let key = normalize_key(id);
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM nodes WHERE id_key = ?1", params![key])?;
            Ok(())
        })
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let key = normalize_key(id);
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT * FROM nodes WHERE id_key = ?1",
                params![key],
                row_to_node,
            )
            .optional()
        })
    }

    async fn scan_nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut rows = Vec::new();
            let mapped = if let Some(type_id) = &filter.type_id {
                let mut stmt = conn.prepare("SELECT * FROM nodes WHERE type_id = ?1")?;
                stmt.query_map(params![type_id], row_to_node_checked)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            } else {
                let mut stmt = conn.prepare("SELECT * FROM nodes")?;
                stmt.query_map([], row_to_node_checked)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            };
            for (id_key, parsed) in mapped {
                match parsed {
                    Ok(node) => rows.push(node),
                    Err(e) => skip_corrupt_row(&id_key, "node", e),
                }
            }
            Ok(rows)
        })
    }

    async fn put_edge(&self, edge: &Edge) -> Result<()> {
        let edge = edge.clone();
        self.with_conn(move |conn| {
            let key = edge.key();
            let meta_json = serde_json::to_string(&edge.meta).unwrap_or_default();
            conn.execute(
                "INSERT INTO edges (from_key, role_key, to_key, from_id, to_id, role, weight, meta_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(from_key, role_key, to_key) DO UPDATE SET
                    from_id=excluded.from_id, to_id=excluded.to_id, role=excluded.role,
                    weight=excluded.weight, meta_json=excluded.meta_json",
                params![
                    key.from,
                    key.role,
                    key.to,
                    edge.from_id,
                    edge.to_id,
                    edge.role,
                    edge.weight,
                    meta_json,
                ],
            )?;
            Ok(())
        })
    }

    async fn delete_edge(&self, key: &EdgeKey) -> Result<()> {
        let key = key.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM edges WHERE from_key = ?1 AND role_key = ?2 AND to_key = ?3",
                params![key.from, key.role, key.to],
            )?;
            Ok(())
        })
    }

    async fn scan_edges(&self, filter: &EdgeFilter) -> Result<Vec<Edge>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut rows = Vec::new();
            let (clause, key) = match (&filter.from_id, &filter.to_id) {
                (Some(f), None) => (" WHERE from_key = ?1", Some(normalize_key(f))),
                (None, Some(t)) => (" WHERE to_key = ?1", Some(normalize_key(t))),
                _ => ("", None),
            };
            let sql = format!("SELECT * FROM edges{clause}");
            let mut stmt = conn.prepare(&sql)?;
            let mapped = if let Some(k) = key {
                stmt.query_map(params![k], row_to_edge_checked)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            } else {
                stmt.query_map([], row_to_edge_checked)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            };
            for (edge_key, parsed) in mapped {
                match parsed {
                    Ok(edge) => rows.push(edge),
                    Err(e) => skip_corrupt_row(&edge_key, "edge", e),
                }
            }
            Ok(rows)
        })
    }

    async fn stats(&self) -> Result<BackendStats> {
        self.with_conn(|conn| {
            let node_count: u64 =
                conn.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0))?;
            let edge_count: u64 =
                conn.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))?;
            Ok(BackendStats {
                node_count,
                edge_count,
                bytes: 0,
                last_updated: Some(SystemTime::now()),
                backend_tag: "sqlite",
            })
        })
    }

    async fn available(&self) -> bool {
        self.with_conn(|conn| conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0)))
            .is_ok()
    }

    fn tag(&self) -> &'static str {
        self.tag
    }
}
