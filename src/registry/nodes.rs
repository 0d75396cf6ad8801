//! Node operations: `Upsert`, `Delete`, `TryGet`.

use super::indices::{type_index_insert, type_index_remove};
use super::router;
use super::NodeRegistry;
use crate::error::{CodexError, Result};
use crate::model::{Node, Phase, META_TYPE_TYPE_ID};

impl NodeRegistry {
    /// Inserts or replaces a node by `id` (case-insensitive). Routes the
    /// write to Ice/Water/neither per `node.state`, migrating out of the
    /// prior backend if the phase changed, and re-derives every incident
    /// edge's phase.
    pub async fn upsert_node(&self, node: Node) -> Result<()> {
        let is_new_type = self.apply_node_upsert(node).await?;
        if let Some(type_id) = is_new_type {
            self.ensure_type_meta_node(&type_id).await?;
        }
        Ok(())
    }

    /// Does the actual insert/index/route work for a node upsert and
    /// returns `Some(typeId)` the first time that `typeId` is observed, so
    /// the caller can seed its meta-node. Kept separate from
    /// [`NodeRegistry::upsert_node`] so seeding the meta-node - itself an
    /// upsert - does not recurse through the public entry point, which
    /// `async fn` cannot do without boxing the resulting future.
    async fn apply_node_upsert(&self, node: Node) -> Result<Option<String>> {
        if node.id.trim().is_empty() {
            return Err(CodexError::InvalidInput("node id must not be empty".into()));
        }
        if node.type_id.trim().is_empty() {
            return Err(CodexError::InvalidInput("node type_id must not be empty".into()));
        }

        let resolved = self.inner.adapters.resolve_node_content(node).await;
        let key = resolved.key();

        let prior = {
            let mut nodes = self.inner.nodes.write();
            nodes.insert(key.clone(), resolved.clone())
        };

        let mut new_type = None;
        if let Some(prior) = &prior {
            if prior.type_id != resolved.type_id {
                type_index_remove(&self.inner, &prior.type_id, &key);
                if type_index_insert(&self.inner, &resolved.type_id, &key) {
                    new_type = Some(resolved.type_id.clone());
                }
            }
        } else if type_index_insert(&self.inner, &resolved.type_id, &key) {
            new_type = Some(resolved.type_id.clone());
        }

        router::route_node_write(&self.inner, &resolved, prior.as_ref().map(|n| n.state));

        self.resweep_incident_edges(&key);
        self.inner.metrics.record_upsert();
        Ok(new_type)
    }

    /// The first time a `typeId` is observed, admit a bare
    /// `codex.meta/type` meta-node describing it, unless one already
    /// exists (e.g. seeded earlier during hydration).
    async fn ensure_type_meta_node(&self, type_id: &str) -> Result<()> {
        if type_id == META_TYPE_TYPE_ID || self.try_get_node(type_id).is_some() {
            return Ok(());
        }
        let mut meta_node = Node::new(type_id, META_TYPE_TYPE_ID, Phase::Ice);
        meta_node.title = Some(type_id.to_string());
        self.apply_node_upsert(meta_node).await?;
        Ok(())
    }

    /// Removes a node and every edge incident to it, so no edge can
    /// reference a missing endpoint once the deletion is visible to
    /// readers.
    pub async fn delete_node(&self, id: &str) -> Result<bool> {
        let key = crate::model::normalize_key(id);
        let removed = self.inner.nodes.write().remove(&key);
        let Some(removed) = removed else {
            return Ok(false);
        };
        type_index_remove(&self.inner, &removed.type_id, &key);
        router::route_node_delete(&self.inner, &removed.id, Some(removed.state));

        let incident: Vec<_> = {
            let outgoing = self.inner.outgoing.read();
            let incoming = self.inner.incoming.read();
            outgoing
                .get(&key)
                .into_iter()
                .flatten()
                .chain(incoming.get(&key).into_iter().flatten())
                .cloned()
                .collect()
        };
        for edge_key in incident {
            self.delete_edge_by_key(&edge_key).await?;
        }

        self.inner.metrics.record_delete();
        Ok(true)
    }

    /// Snapshot read of a single node by id.
    pub fn try_get_node(&self, id: &str) -> Option<Node> {
        let key = crate::model::normalize_key(id);
        self.inner.nodes.read().get(&key).cloned()
    }

    pub(crate) fn node_phase(&self, id_key: &str) -> Option<Phase> {
        self.inner.nodes.read().get(id_key).map(|n| n.state)
    }
}
