//! Bounded, per-key-ordered async writer.
//!
//! A dispatcher keeps one coalesced "next effect" slot per key plus a FIFO
//! of keys that have become eligible to dispatch, and a small pool of
//! worker tasks drains eligible keys concurrently. Per-key FIFO falls out
//! of never having more than one in-flight effect for a given key at a
//! time; cross-key parallelism falls out of distinct keys being
//! independently eligible.

mod effect;

pub use effect::{EffectKey, EffectOp, EffectState};

use crate::config::Config;
use crate::metrics::PerformanceMetrics;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

struct SharedState {
    queued: std::collections::HashMap<EffectKey, EffectOp>,
    ready_order: VecDeque<EffectKey>,
    in_flight: HashSet<EffectKey>,
    /// Last known lifecycle state per key, per spec §4.6
    /// (`Queued → Running → {Completed, Retrying, Failed}`). Read by
    /// [`AsyncWriter::effect_state`] and [`AsyncWriter::failed_effect_count`];
    /// entries are overwritten in place rather than removed on completion, so
    /// a caller polling a specific key always sees its last outcome.
    effect_states: std::collections::HashMap<EffectKey, EffectState>,
}

pub struct AsyncWriter {
    state: Arc<Mutex<SharedState>>,
    notify: Arc<Notify>,
    metrics: Arc<PerformanceMetrics>,
    cancel: CancellationToken,
    high_water_mark: usize,
    worker_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl AsyncWriter {
    pub fn start(config: &Config, metrics: Arc<PerformanceMetrics>, cancel: CancellationToken) -> Self {
        let state = Arc::new(Mutex::new(SharedState {
            queued: std::collections::HashMap::new(),
            ready_order: VecDeque::new(),
            in_flight: HashSet::new(),
            effect_states: std::collections::HashMap::new(),
        }));
        let notify = Arc::new(Notify::new());

        let mut worker_handles = Vec::new();
        for worker_id in 0..config.writer_worker_count.max(1) {
            let state = state.clone();
            let notify = notify.clone();
            let metrics = metrics.clone();
            let cancel = cancel.clone();
            let max_retries = config.writer_max_retries;
            let backoff_base = Duration::from_millis(config.writer_backoff_base_ms);
            let backoff_cap = Duration::from_millis(config.writer_backoff_cap_ms);
            worker_handles.push(tokio::spawn(worker_loop(
                worker_id,
                state,
                notify,
                metrics,
                cancel,
                max_retries,
                backoff_base,
                backoff_cap,
            )));
        }

        Self {
            state,
            notify,
            metrics,
            cancel,
            high_water_mark: config.writer_queue_high_water_mark,
            worker_handles,
        }
    }

    /// Enqueues an effect, coalescing with any not-yet-dispatched effect for
    /// the same key (last-write-wins; a delete cancels a preceding queued
    /// write). Never blocks: backpressure is handled by coalescing, not by
    /// rejecting or stalling producers.
    pub fn submit(&self, key: EffectKey, op: EffectOp) {
        let mut state = self.state.lock();
        let was_queued = state.queued.contains_key(&key);
        let in_flight = state.in_flight.contains(&key);
        state.queued.insert(key.clone(), op);
        if !was_queued && !in_flight {
            state.ready_order.push_back(key.clone());
        }
        // An effect already running keeps its `Running` entry; the newly
        // coalesced op only becomes visible once it is actually dispatched.
        if !in_flight {
            state.effect_states.insert(key, EffectState::Queued);
        }
        let depth = state.queued.len() + state.in_flight.len();
        drop(state);
        if depth > self.high_water_mark {
            debug!(depth, high_water_mark = self.high_water_mark, "writer queue above high-water mark; coalescing");
        }
        self.notify.notify_one();
    }

    pub fn metrics(&self) -> Arc<PerformanceMetrics> {
        self.metrics.clone()
    }

    pub fn queue_depth(&self) -> usize {
        let state = self.state.lock();
        state.queued.len() + state.in_flight.len()
    }

    /// Last observed lifecycle state for `key`, or `None` if it has never
    /// been submitted (or was submitted before process start).
    pub fn effect_state(&self, key: &EffectKey) -> Option<EffectState> {
        self.state.lock().effect_states.get(key).copied()
    }

    /// Count of effects whose last attempt exhausted retries. Surfaced via
    /// [`crate::registry::NodeRegistry::health_check`].
    pub fn failed_effect_count(&self) -> usize {
        self.state
            .lock()
            .effect_states
            .values()
            .filter(|s| matches!(s, EffectState::Failed))
            .count()
    }

    /// True when the queue is empty and no worker is running an effect
    /// ("Quiescence" in the glossary).
    pub fn is_quiescent(&self) -> bool {
        self.queue_depth() == 0
    }

    pub async fn wait_quiescent(&self) {
        loop {
            if self.is_quiescent() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Cancels workers and waits up to `timeout` for them to finish their
    /// current effect.
    pub async fn shutdown(self, timeout: Duration) {
        self.cancel.cancel();
        let join_all = futures_join_all(self.worker_handles);
        if tokio::time::timeout(timeout, join_all).await.is_err() {
            warn!("writer shutdown timed out before all workers drained");
        }
    }
}

async fn futures_join_all(handles: Vec<tokio::task::JoinHandle<()>>) {
    for h in handles {
        let _ = h.await;
    }
}

async fn worker_loop(
    worker_id: usize,
    state: Arc<Mutex<SharedState>>,
    notify: Arc<Notify>,
    metrics: Arc<PerformanceMetrics>,
    cancel: CancellationToken,
    max_retries: u32,
    backoff_base: Duration,
    backoff_cap: Duration,
) {
    loop {
        let next = {
            let mut guard = state.lock();
            let key = loop {
                match guard.ready_order.pop_front() {
                    Some(k) if guard.in_flight.contains(&k) => continue,
                    Some(k) => break Some(k),
                    None => break None,
                }
            };
            match key {
                Some(key) => {
                    let effect = guard.queued.remove(&key);
                    if let Some(effect) = effect {
                        guard.in_flight.insert(key.clone());
                        guard.effect_states.insert(key.clone(), EffectState::Running);
                        Some((key, effect))
                    } else {
                        None
                    }
                }
                None => None,
            }
        };

        let Some((key, effect)) = next else {
            tokio::select! {
                _ = notify.notified() => continue,
                _ = cancel.cancelled() => return,
            }
        };

        run_effect(worker_id, &state, &key, effect, &metrics, max_retries, backoff_base, backoff_cap, &cancel).await;

        let mut guard = state.lock();
        guard.in_flight.remove(&key);
        if guard.queued.contains_key(&key) {
            guard.ready_order.push_back(key);
            drop(guard);
            notify.notify_one();
        }

        if cancel.is_cancelled() {
            return;
        }
    }
}

async fn run_effect(
    worker_id: usize,
    state: &Arc<Mutex<SharedState>>,
    key: &EffectKey,
    effect: EffectOp,
    metrics: &PerformanceMetrics,
    max_retries: u32,
    backoff_base: Duration,
    backoff_cap: Duration,
    cancel: &CancellationToken,
) {
    let mut attempt = 0u32;
    loop {
        let outcome = apply_effect(&effect).await;
        match outcome {
            Ok(()) => {
                metrics.record_write_completed();
                state.lock().effect_states.insert(key.clone(), EffectState::Completed);
                debug!(worker_id, ?key, attempt, "effect completed");
                return;
            }
            Err(e) => {
                if attempt >= max_retries {
                    metrics.record_write_failed();
                    state.lock().effect_states.insert(key.clone(), EffectState::Failed);
                    error!(worker_id, ?key, attempt, error = %e, "effect failed permanently");
                    return;
                }
                metrics.record_write_retried();
                state.lock().effect_states.insert(key.clone(), EffectState::Retrying);
                let backoff = backoff_base
                    .saturating_mul(1 << attempt.min(16))
                    .min(backoff_cap);
                let jitter = Duration::from_millis(rand::random::<u64>() % 10);
                warn!(worker_id, ?key, attempt, error = %e, backoff_ms = backoff.as_millis() as u64, "effect failed, retrying");
                tokio::select! {
                    _ = tokio::time::sleep(backoff + jitter) => {}
                    _ = cancel.cancelled() => return,
                }
                attempt += 1;
                state.lock().effect_states.insert(key.clone(), EffectState::Running);
            }
        }
    }
}

/// Runs one effect to completion against its backend(s). A migration runs
/// its write half and its delete half as one unit: if the write fails, the
/// whole effect is retried (the delete never runs against stale data); if
/// the write succeeds but the delete fails, the retry loop re-runs the
/// delete-only tail is not separable here, so the full write-then-delete is
/// retried - the write is idempotent (upsert), so this is safe.
///
/// `DeleteNode`/`DeleteEdge` run against every listed backend rather than
/// stopping at the first error, so a transient failure on one tier doesn't
/// leave the other's row behind; the whole effect still retries if any
/// backend failed, which is safe since every delete is idempotent.
async fn apply_effect(effect: &EffectOp) -> crate::error::Result<()> {
    match effect {
        EffectOp::WriteNode { node, backend } => backend.put_node(node).await,
        EffectOp::DeleteNode { id, backends } => delete_node_from_all(id, backends).await,
        EffectOp::MigrateNode {
            node,
            new_backend,
            old_backend,
        } => {
            new_backend.put_node(node).await?;
            old_backend.delete_node(&node.id).await
        }
        EffectOp::WriteEdge { edge, backend } => backend.put_edge(edge).await,
        EffectOp::DeleteEdge { key, backends } => delete_edge_from_all(key, backends).await,
        EffectOp::MigrateEdge {
            edge,
            new_backend,
            old_backend,
        } => {
            new_backend.put_edge(edge).await?;
            old_backend.delete_edge(&edge.key()).await
        }
    }
}

async fn delete_node_from_all(id: &str, backends: &[std::sync::Arc<dyn crate::backends::StorageBackend>]) -> crate::error::Result<()> {
    let mut last_err = None;
    for backend in backends {
        if let Err(e) = backend.delete_node(id).await {
            last_err = Some(e);
        }
    }
    last_err.map_or(Ok(()), Err)
}

async fn delete_edge_from_all(
    key: &crate::model::EdgeKey,
    backends: &[std::sync::Arc<dyn crate::backends::StorageBackend>],
) -> crate::error::Result<()> {
    let mut last_err = None;
    for backend in backends {
        if let Err(e) = backend.delete_edge(key).await {
            last_err = Some(e);
        }
    }
    last_err.map_or(Ok(()), Err)
}
