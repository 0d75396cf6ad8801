//! Edge operations: `Upsert`, `Delete`, `Get`, adjacency lookups. Edge phase
//! is never taken from the caller - it is always derived from the current
//! phase of both endpoints.

use super::router;
use super::NodeRegistry;
use crate::error::{CodexError, Result};
use crate::model::{derive_edge_phase, Edge, EdgeKey};

impl NodeRegistry {
    /// Inserts or replaces an edge by `(fromId, role, toId)`. `edge.state`
    /// from the caller, if any, is ignored - phase is always re-derived.
    pub async fn upsert_edge(&self, mut edge: Edge) -> Result<()> {
        if edge.from_id.trim().is_empty() || edge.to_id.trim().is_empty() || edge.role.trim().is_empty() {
            return Err(CodexError::InvalidInput(
                "edge fromId, role, and toId must all be non-empty".into(),
            ));
        }

        let key = edge.key();
        edge.derived_state = derive_edge_phase(self.node_phase(&key.from), self.node_phase(&key.to));

        let prior = self.inner.edges.write().insert(key.clone(), edge.clone());
        if prior.is_none() {
            self.inner.outgoing.write().entry(key.from.clone()).or_default().insert(key.clone());
            self.inner.incoming.write().entry(key.to.clone()).or_default().insert(key.clone());
        }

        router::route_edge_write(&self.inner, &edge, prior.as_ref().map(|e| e.derived_state));
        self.inner.metrics.record_upsert();
        Ok(())
    }

    pub async fn delete_edge(&self, from_id: &str, role: &str, to_id: &str) -> Result<bool> {
        let key = EdgeKey::new(from_id, role, to_id);
        self.delete_edge_by_key(&key).await
    }

    pub(crate) async fn delete_edge_by_key(&self, key: &EdgeKey) -> Result<bool> {
        let removed = self.inner.edges.write().remove(key);
        let Some(removed) = removed else {
            return Ok(false);
        };
        if let Some(bucket) = self.inner.outgoing.write().get_mut(&key.from) {
            bucket.remove(key);
        }
        if let Some(bucket) = self.inner.incoming.write().get_mut(&key.to) {
            bucket.remove(key);
        }
        router::route_edge_delete(&self.inner, key, Some(removed.derived_state));
        self.inner.metrics.record_delete();
        Ok(true)
    }

    /// Looks up an edge by `(fromId, toId, role?)`. With `role` given, this
    /// is an exact key lookup; with `role: None`, returns the first incident
    /// edge between the two endpoints (in `outgoing` index order).
    pub fn get_edge(&self, from_id: &str, to_id: &str, role: Option<&str>) -> Option<Edge> {
        let Some(role) = role else {
            let to_key = crate::model::normalize_key(to_id);
            let from_key = crate::model::normalize_key(from_id);
            let outgoing = self.inner.outgoing.read();
            let keys = outgoing.get(&from_key)?;
            let edges = self.inner.edges.read();
            return keys
                .iter()
                .filter(|k| k.to == to_key)
                .find_map(|k| edges.get(k))
                .cloned();
        };
        let key = EdgeKey::new(from_id, role, to_id);
        self.inner.edges.read().get(&key).cloned()
    }

    pub fn edges_from(&self, id: &str) -> Vec<Edge> {
        let key = crate::model::normalize_key(id);
        let outgoing = self.inner.outgoing.read();
        let Some(keys) = outgoing.get(&key) else {
            return Vec::new();
        };
        let edges = self.inner.edges.read();
        keys.iter().filter_map(|k| edges.get(k)).cloned().collect()
    }

    pub fn edges_to(&self, id: &str) -> Vec<Edge> {
        let key = crate::model::normalize_key(id);
        let incoming = self.inner.incoming.read();
        let Some(keys) = incoming.get(&key) else {
            return Vec::new();
        };
        let edges = self.inner.edges.read();
        keys.iter().filter_map(|k| edges.get(k)).cloned().collect()
    }

    /// Recomputes derived phase for every edge touching `id_key` and
    /// re-routes any whose phase changed, following a node upsert or
    /// phase migration.
    pub(crate) fn resweep_incident_edges(&self, id_key: &str) {
        let incident: Vec<EdgeKey> = {
            let outgoing = self.inner.outgoing.read();
            let incoming = self.inner.incoming.read();
            outgoing
                .get(id_key)
                .into_iter()
                .flatten()
                .chain(incoming.get(id_key).into_iter().flatten())
                .cloned()
                .collect()
        };

        for edge_key in incident {
            let new_phase = derive_edge_phase(
                self.node_phase(&edge_key.from),
                self.node_phase(&edge_key.to),
            );
            let mut edges = self.inner.edges.write();
            if let Some(edge) = edges.get_mut(&edge_key) {
                let prior_phase = edge.derived_state;
                if prior_phase != new_phase {
                    edge.derived_state = new_phase;
                    let updated = edge.clone();
                    drop(edges);
                    router::route_edge_write(&self.inner, &updated, Some(prior_phase));
                }
            }
        }
    }
}
