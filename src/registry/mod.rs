//! The in-memory node/edge registry: single source of truth for readers at
//! runtime, fronting the phase router, hydrator, and async writer.
//!
//! [`NodeRegistry`] is a thin `Clone` handle around an `Arc<Inner>` (primary
//! node/edge maps, inverted type index, and adjacency maps, each under its
//! own lock) so the writer, hydrator, and every calling thread share one set
//! of indices without an outer global lock.

mod edges;
mod hydrate;
mod indices;
mod nodes;
mod router;
mod snapshot;

pub use snapshot::Stats;

use crate::adapters::AdapterRegistry;
use crate::backends::{PostgresBackend, SqliteBackend, StorageBackend, VolatileBackend};
use crate::config::{Config, IceStorageType};
use crate::error::Result;
use crate::metrics::PerformanceMetrics;
use crate::model::{Edge, EdgeKey, Node};
use crate::readiness::{ReadinessSignal, ReadinessWatcher};
use crate::writer::AsyncWriter;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) struct Inner {
    pub(crate) nodes: RwLock<HashMap<String, Node>>,
    pub(crate) type_index: RwLock<HashMap<String, HashSet<String>>>,
    pub(crate) edges: RwLock<HashMap<EdgeKey, Edge>>,
    pub(crate) outgoing: RwLock<HashMap<String, HashSet<EdgeKey>>>,
    pub(crate) incoming: RwLock<HashMap<String, HashSet<EdgeKey>>>,
    pub(crate) ice: Arc<dyn StorageBackend>,
    pub(crate) water: Arc<dyn StorageBackend>,
    pub(crate) writer: AsyncWriter,
    pub(crate) metrics: Arc<PerformanceMetrics>,
    pub(crate) readiness: ReadinessSignal,
    pub(crate) adapters: AdapterRegistry,
    pub(crate) cancel: CancellationToken,
    pub(crate) config: Config,
}

/// A thread-safe, cheaply-`Clone`-able handle to the registry.
#[derive(Clone)]
pub struct NodeRegistry {
    pub(crate) inner: Arc<Inner>,
}

impl NodeRegistry {
    /// Builds the registry's backends/writer/adapters from `config` without
    /// hydrating or starting any background work. Most callers want
    /// [`NodeRegistry::initialize`] instead.
    pub fn new(config: Config) -> Result<(Self, ReadinessWatcher)> {
        let ice: Arc<dyn StorageBackend> = match config.ice_storage_type {
            IceStorageType::Sqlite => Arc::new(SqliteBackend::open(&config.ice_connection_string)?),
            IceStorageType::Postgresql => {
                Arc::new(PostgresBackend::new(config.ice_connection_string.clone()))
            }
        };
        let water: Arc<dyn StorageBackend> = Arc::new(VolatileBackend::new());

        let metrics = Arc::new(PerformanceMetrics::new());
        let cancel = CancellationToken::new();
        let writer = AsyncWriter::start(&config, metrics.clone(), cancel.clone());
        let (readiness, watcher) = ReadinessSignal::new();
        let adapters = AdapterRegistry::with_builtin_schemes(config.adapter_cache_capacity, metrics.clone());

        let inner = Inner {
            nodes: RwLock::new(HashMap::new()),
            type_index: RwLock::new(HashMap::new()),
            edges: RwLock::new(HashMap::new()),
            outgoing: RwLock::new(HashMap::new()),
            incoming: RwLock::new(HashMap::new()),
            ice,
            water,
            writer,
            metrics,
            readiness,
            adapters,
            cancel,
            config,
        };

        Ok((
            Self {
                inner: Arc::new(inner),
            },
            watcher,
        ))
    }

    /// Builds the registry and runs the hydrator to completion. Returns
    /// once the registry is marked *ready*.
    pub async fn initialize(config: Config) -> Result<(Self, ReadinessWatcher)> {
        let (registry, watcher) = Self::new(config)?;
        registry.hydrate().await?;
        Ok((registry, watcher))
    }

    pub fn metrics(&self) -> Arc<PerformanceMetrics> {
        self.inner.metrics.clone()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Suspends until the async writer queue is empty and no worker is
    /// running ("quiescence") - the condition most durability/ordering
    /// properties are checked against.
    pub async fn wait_quiescent(&self) {
        self.inner.writer.wait_quiescent().await;
    }

    /// Cancels the writer and waits (best-effort, bounded) for it to drain.
    pub async fn shutdown(self) {
        self.inner.cancel.cancel();
        let timeout = std::time::Duration::from_millis(self.inner.config.shutdown_drain_timeout_ms);
        // Inner is only unwrapped if this is the last handle; otherwise we
        // just cancel and let other handles observe the cancellation.
        match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner.writer.shutdown(timeout).await,
            Err(_) => {}
        }
    }
}

fn normalize_meta_value(value: &serde_json::Value) -> String {
    value.to_string()
}

pub(crate) use normalize_meta_value as meta_value_key;
