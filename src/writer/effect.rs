//! Effect types for the async writer.
//!
//! A migration (Ice<->Water transitions) is modeled as a single effect that
//! writes to the new backend and then deletes from the old one, rather than
//! two separately-queued effects - queuing them separately would make the
//! writer's "a delete cancels a preceding write for the same key"
//! coalescing rule (meant for superseding intent, e.g. two writes in a row)
//! incorrectly cancel a migration's write half when its delete half lands
//! in the same key's queue slot.
//!
//! `DeleteNode`/`DeleteEdge` carry every backend the entity could currently
//! live in, not just the one its last known phase maps to: coalescing can
//! drop a still-queued `MigrateNode`/`MigrateEdge` for the same key (last
//! write wins), which would otherwise strand the migration's old-backend
//! delete and leave a row behind after quiescence. Deleting from every tier
//! unconditionally is idempotent, so this costs a harmless no-op delete
//! against whichever backend never held the row.

use crate::backends::StorageBackend;
use crate::model::{Edge, EdgeKey, Node};
use std::sync::Arc;

/// Identifies the per-key FIFO lane an effect belongs to: a node id or an
/// edge identity, normalized for case-insensitive comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EffectKey {
    Node(String),
    Edge(EdgeKey),
}

#[derive(Clone)]
pub enum EffectOp {
    WriteNode {
        node: Node,
        backend: Arc<dyn StorageBackend>,
    },
    DeleteNode {
        id: String,
        backends: Vec<Arc<dyn StorageBackend>>,
    },
    MigrateNode {
        node: Node,
        new_backend: Arc<dyn StorageBackend>,
        old_backend: Arc<dyn StorageBackend>,
    },
    WriteEdge {
        edge: Edge,
        backend: Arc<dyn StorageBackend>,
    },
    DeleteEdge {
        key: EdgeKey,
        backends: Vec<Arc<dyn StorageBackend>>,
    },
    MigrateEdge {
        edge: Edge,
        new_backend: Arc<dyn StorageBackend>,
        old_backend: Arc<dyn StorageBackend>,
    },
}

/// Lifecycle of a single effect. Tracked per [`EffectKey`] by the writer and
/// surfaced via `AsyncWriter::effect_state`/`failed_effect_count` for
/// stats/health reporting, alongside the cumulative metrics counters and log
/// events recorded at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Queued,
    Running,
    Completed,
    Retrying,
    Failed,
}
