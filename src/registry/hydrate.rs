//! Startup hydration: reloads Ice into memory, purges Water, seeds missing
//! type meta-nodes, then flips the readiness signal.

use super::indices::type_index_insert;
use super::NodeRegistry;
use crate::backends::{EdgeFilter, NodeFilter, StorageBackend};
use crate::error::Result;
use crate::model::{derive_edge_phase, Node, META_TYPE_TYPE_ID};
use tracing::{info, warn};

impl NodeRegistry {
    /// Runs once, before the registry is marked ready. Readers that call in
    /// before this completes should be waiting on a [`crate::readiness::ReadinessWatcher`]
    /// rather than racing the registry's internal maps.
    pub(crate) async fn hydrate(&self) -> Result<()> {
        let ice_nodes = tolerate_scan_failure("node", self.inner.ice.scan_nodes(&NodeFilter::default()).await);
        let node_count = ice_nodes.len();
        {
            let mut nodes = self.inner.nodes.write();
            for node in ice_nodes {
                let key = node.key();
                type_index_insert(&self.inner, &node.type_id, &key);
                nodes.insert(key, node);
            }
        }

        let ice_edges = tolerate_scan_failure("edge", self.inner.ice.scan_edges(&EdgeFilter::default()).await);
        let mut dangling = 0usize;
        {
            let mut edges = self.inner.edges.write();
            let mut outgoing = self.inner.outgoing.write();
            let mut incoming = self.inner.incoming.write();
            let nodes = self.inner.nodes.read();
            for mut edge in ice_edges {
                let key = edge.key();
                let from_phase = nodes.get(&key.from).map(|n| n.state);
                let to_phase = nodes.get(&key.to).map(|n| n.state);
                if from_phase.is_none() || to_phase.is_none() {
                    dangling += 1;
                }
                edge.derived_state = derive_edge_phase(from_phase, to_phase);
                outgoing.entry(key.from.clone()).or_default().insert(key.clone());
                incoming.entry(key.to.clone()).or_default().insert(key.clone());
                edges.insert(key, edge);
            }
        }
        if dangling > 0 {
            warn!(dangling, "hydrated edges with at least one missing endpoint; admitted with a Gas-derived phase");
        }

        if let Err(e) = self.inner.water.purge().await {
            warn!(error = %e, "volatile backend purge failed at startup; proceeding without a guaranteed-empty Water tier");
        }

        self.seed_missing_type_meta_nodes().await?;

        info!(node_count, "hydration complete");
        self.inner.readiness.mark_ready();
        Ok(())
    }

    /// Every distinct `type_id` in use must have a corresponding
    /// `codex.meta/type` meta-node describing it. Hydration backfills any
    /// that are missing with a bare placeholder so readers never observe a
    /// type with no meta-node.
    async fn seed_missing_type_meta_nodes(&self) -> Result<()> {
        let type_ids: Vec<String> = self.inner.type_index.read().keys().cloned().collect();
        for type_id in type_ids {
            if type_id == META_TYPE_TYPE_ID {
                continue;
            }
            if self.try_get_node(&type_id).is_some() {
                continue;
            }
            let mut meta_node = Node::new(type_id.clone(), META_TYPE_TYPE_ID, crate::model::Phase::Ice);
            meta_node.title = Some(type_id.clone());
            self.upsert_node(meta_node).await?;
        }
        Ok(())
    }
}

/// A whole-backend scan failure (e.g. `BackendUnavailable`, or a durable
/// backend that is simply not wired up - see `backends::PostgresBackend`)
/// must not abort hydration: the registry still becomes ready, just with an
/// empty snapshot for the collection that failed to load. Per-row
/// corruption is already filtered out one level down, inside the backend's
/// own `scan_nodes`/`scan_edges` implementation.
fn tolerate_scan_failure<T>(kind: &'static str, result: Result<Vec<T>>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            warn!(kind, error = %e, "durable backend scan failed during hydration; continuing with an empty snapshot");
            Vec::new()
        }
    }
}
