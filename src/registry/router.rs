//! Phase router: decides which backend a node or edge's current phase maps
//! to, and enqueues the write/delete/migrate effect that keeps the
//! durable/volatile tiers in sync with in-memory state.

use super::Inner;
use crate::backends::StorageBackend;
use crate::model::{Edge, EdgeKey, Node, Phase};
use crate::writer::{EffectKey, EffectOp};
use std::sync::Arc;

/// The backend a phase currently routes to, or `None` for Gas (memory-only).
pub(crate) fn backend_for(inner: &Inner, phase: Phase) -> Option<Arc<dyn StorageBackend>> {
    match phase {
        Phase::Ice => Some(inner.ice.clone()),
        Phase::Water => Some(inner.water.clone()),
        Phase::Gas => None,
    }
}

/// Every backend a node/edge could currently be persisted in. A delete
/// targets all of them (not just the phase it last routed to) so that it
/// cannot be silently coalesced over a still-queued migration and strand
/// that migration's old-backend delete half - see `writer::effect`.
fn all_backends(inner: &Inner) -> Vec<Arc<dyn StorageBackend>> {
    vec![inner.ice.clone(), inner.water.clone()]
}

/// Routes a node write: enqueues a write, a migration, or nothing at all
/// depending on whether `prior_phase` differs from `node.state` and whether
/// either end has a backing store.
///
/// `prior_phase` is `None` for a brand-new node.
pub(crate) fn route_node_write(inner: &Inner, node: &Node, prior_phase: Option<Phase>) {
    if !inner.config.persistence_enabled {
        return;
    }
    let new_backend = backend_for(inner, node.state);
    let old_backend = prior_phase.and_then(|p| backend_for(inner, p));

    let key = EffectKey::Node(node.key());
    match (old_backend, new_backend) {
        (None, None) => {}
        (None, Some(new_backend)) => inner.writer.submit(
            key,
            EffectOp::WriteNode {
                node: node.clone(),
                backend: new_backend,
            },
        ),
        (Some(_old_backend), None) => inner.writer.submit(
            key,
            EffectOp::DeleteNode {
                id: node.id.clone(),
                backends: all_backends(inner),
            },
        ),
        (Some(old_backend), Some(new_backend)) => {
            if Arc::ptr_eq(&old_backend, &new_backend) {
                inner.writer.submit(
                    key,
                    EffectOp::WriteNode {
                        node: node.clone(),
                        backend: new_backend,
                    },
                );
            } else {
                inner.metrics.record_migration();
                inner.writer.submit(
                    key,
                    EffectOp::MigrateNode {
                        node: node.clone(),
                        new_backend,
                        old_backend,
                    },
                );
            }
        }
    }
}

/// Routes a node delete: enqueues a delete against every backend the node
/// could currently live in (if it has ever been persisted at all).
pub(crate) fn route_node_delete(inner: &Inner, id: &str, prior_phase: Option<Phase>) {
    if !inner.config.persistence_enabled {
        return;
    }
    if prior_phase.and_then(|p| backend_for(inner, p)).is_none() {
        return;
    }
    inner.writer.submit(
        EffectKey::Node(crate::model::normalize_key(id)),
        EffectOp::DeleteNode {
            id: id.to_string(),
            backends: all_backends(inner),
        },
    );
}

/// Routes an edge write using its already-computed `derived_state`.
pub(crate) fn route_edge_write(inner: &Inner, edge: &Edge, prior_phase: Option<Phase>) {
    if !inner.config.persistence_enabled {
        return;
    }
    let new_backend = backend_for(inner, edge.derived_state);
    let old_backend = prior_phase.and_then(|p| backend_for(inner, p));

    let key = EffectKey::Edge(edge.key());
    match (old_backend, new_backend) {
        (None, None) => {}
        (None, Some(new_backend)) => inner.writer.submit(
            key,
            EffectOp::WriteEdge {
                edge: edge.clone(),
                backend: new_backend,
            },
        ),
        (Some(_old_backend), None) => inner.writer.submit(
            key,
            EffectOp::DeleteEdge {
                key: edge.key(),
                backends: all_backends(inner),
            },
        ),
        (Some(old_backend), Some(new_backend)) => {
            if Arc::ptr_eq(&old_backend, &new_backend) {
                inner.writer.submit(
                    key,
                    EffectOp::WriteEdge {
                        edge: edge.clone(),
                        backend: new_backend,
                    },
                );
            } else {
                inner.metrics.record_migration();
                inner.writer.submit(
                    key,
                    EffectOp::MigrateEdge {
                        edge: edge.clone(),
                        new_backend,
                        old_backend,
                    },
                );
            }
        }
    }
}

pub(crate) fn route_edge_delete(inner: &Inner, key: &EdgeKey, prior_phase: Option<Phase>) {
    if !inner.config.persistence_enabled {
        return;
    }
    if prior_phase.and_then(|p| backend_for(inner, p)).is_none() {
        return;
    }
    inner.writer.submit(
        EffectKey::Edge(key.clone()),
        EffectOp::DeleteEdge {
            key: key.clone(),
            backends: all_backends(inner),
        },
    );
}
