//! Data model for graph entities: nodes, edges, phases, and content references.
//!
//! # Key types
//!
//! - [`Node`] / [`Edge`] - the two entity kinds the registry stores.
//! - [`Phase`] - the Ice/Water/Gas durability tier, with `Ice < Water < Gas`
//!   under the "most-fluid wins" ordering used to derive edge phase.
//! - [`ContentRef`] - inline-or-external payload attached to a node.
//!
//! Node identity is case-insensitive for lookup and case-preserving for
//! display: [`normalize_key`] produces the lookup form, while `Node::id`
//! and `Edge::{from_id,to_id,role}` always hold what the caller wrote.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type NodeId = String;

/// Lowercases an identity component for use as a map key. The original
/// string is always retained alongside for display.
pub fn normalize_key(s: &str) -> String {
    s.to_lowercase()
}

/// The durability tier of a node or edge.
///
/// Ordered `Ice < Water < Gas` ("most-fluid wins"): an edge's derived phase
/// is `max(state(from), state(to))` under this ordering, so a single
/// non-durable endpoint is enough to keep the edge out of the durable tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Ice,
    Water,
    Gas,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Ice => "ice",
            Phase::Water => "water",
            Phase::Gas => "gas",
        }
    }

    pub fn parse(s: &str) -> Option<Phase> {
        match s.to_ascii_lowercase().as_str() {
            "ice" => Some(Phase::Ice),
            "water" => Some(Phase::Water),
            "gas" => Some(Phase::Gas),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives an edge's effective phase from its endpoints.
///
/// A missing endpoint collapses to `Gas` (most fluid), matching the rule
/// that an edge can never outlive a non-durable or absent endpoint into a
/// durable tier.
pub fn derive_edge_phase(from: Option<Phase>, to: Option<Phase>) -> Phase {
    match (from, to) {
        (Some(a), Some(b)) => a.max(b),
        _ => Phase::Gas,
    }
}

/// Inline-or-external content payload attached to a node.
///
/// Exactly zero or one of `inline_json`, `inline_bytes`, `external_uri` is
/// expected to be set by a well-formed caller; the registry does not
/// enforce this beyond documentation, since enforcing it would require
/// rejecting otherwise-valid upserts the source system may send during
/// migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRef {
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_json: Option<serde_json::Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes_opt"
    )]
    pub inline_bytes: Option<bytes::Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    /// Lowercase hex SHA-256 of the resolved payload, filled in at
    /// hydration/resolution time. Never set by callers directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
}

impl ContentRef {
    pub fn external(media_type: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            inline_json: None,
            inline_bytes: None,
            external_uri: Some(uri.into()),
            headers: None,
            cache_key: None,
        }
    }
}

mod base64_bytes_opt {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<bytes::Bytes>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(bytes) => {
                s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes.as_ref()))
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bytes::Bytes>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            Some(text) => base64::engine::general_purpose::STANDARD
                .decode(text)
                .map(bytes::Bytes::from)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// A node: the primary entity of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub type_id: String,
    pub state: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentRef>,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>, state: Phase) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            state,
            locale: None,
            title: None,
            description: None,
            content: None,
            meta: serde_json::Map::new(),
        }
    }

    pub fn key(&self) -> String {
        normalize_key(&self.id)
    }
}

/// The well-known type id for a meta-node describing another `typeId`.
pub const META_TYPE_TYPE_ID: &str = "codex.meta/type";

/// Uniquely identifies an edge: `(fromId, role, toId)` compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub from: String,
    pub role: String,
    pub to: String,
}

impl EdgeKey {
    pub fn new(from: &str, role: &str, to: &str) -> Self {
        Self {
            from: normalize_key(from),
            role: normalize_key(role),
            to: normalize_key(to),
        }
    }
}

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from_id: NodeId,
    pub to_id: NodeId,
    pub role: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
    /// Computed by the registry from the endpoints' current phases (I3).
    /// Never trusted from a caller-supplied `Edge`.
    #[serde(skip)]
    pub derived_state: Phase,
}

fn default_weight() -> f64 {
    1.0
}

impl Edge {
    pub fn new(from_id: impl Into<String>, role: impl Into<String>, to_id: impl Into<String>) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            role: role.into(),
            weight: 1.0,
            meta: serde_json::Map::new(),
            derived_state: Phase::Gas,
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(&self.from_id, &self.role, &self.to_id)
    }
}
