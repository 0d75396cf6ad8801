//! # Living Codex Core
//!
//! A typed, tri-state property graph engine ("everything is a node"): an
//! in-memory [`NodeRegistry`] fronted by a tri-phase persistence router
//! (Ice = durable, Water = volatile, Gas = memory-only) and a
//! deterministic phase-derived edge rule.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use codex_core::{Config, NodeRegistry, Node, Phase};
//!
//! # async fn run() -> codex_core::Result<()> {
//! let (registry, mut ready) = NodeRegistry::initialize(Config::testing()).await?;
//! ready.wait_ready(&Default::default()).await;
//!
//! registry.upsert_node(Node::new("a", "codex.concept", Phase::Ice)).await?;
//! assert!(registry.try_get_node("a").is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`registry`] - the thread-safe in-memory store and its phase router.
//! - [`backends`] - the durable (Ice) and volatile (Water) storage contracts.
//! - [`writer`] - the bounded, per-key-ordered async persistence pipeline.
//! - [`adapters`] - scheme-keyed content resolvers (`file`, `http`, `https`).
//! - [`model`] - the wire-level `Node`/`Edge`/`Phase` types.
//!
//! Out of scope (consumed through this crate's contract, not implemented
//! here): the HTTP surface, authentication, module discovery, and all
//! domain-specific node types.

pub mod adapters;
pub mod backends;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod readiness;
pub mod registry;
pub mod writer;

pub use config::{Config, IceStorageType};
pub use error::{CodexError, Result};
pub use health::{Check, HealthCheck, HealthStatus};
pub use metrics::PerformanceMetrics;
pub use model::{derive_edge_phase, ContentRef, Edge, EdgeKey, Node, NodeId, Phase, META_TYPE_TYPE_ID};
pub use readiness::{ReadinessSignal, ReadinessState, ReadinessWatcher};
pub use registry::{NodeRegistry, Stats};
