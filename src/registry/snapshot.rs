//! Bulk snapshot reads and aggregate stats.

use super::NodeRegistry;
use crate::backends::StorageBackend;
use crate::health::{Check, HealthCheck};
use crate::model::{Edge, Node, Phase};
use std::collections::HashMap;
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct Stats {
    pub node_count: u64,
    pub edge_count: u64,
    pub nodes_by_phase: HashMap<Phase, u64>,
    pub edges_by_phase: HashMap<Phase, u64>,
    pub writer_queue_depth: u64,
    pub last_write_completed: Option<SystemTime>,
}

impl NodeRegistry {
    /// A point-in-time copy of every node. Callers iterating a large graph
    /// should prefer [`NodeRegistry::get_nodes_by_type`] where possible.
    pub fn all_nodes(&self) -> Vec<Node> {
        self.inner.nodes.read().values().cloned().collect()
    }

    pub fn all_edges(&self) -> Vec<Edge> {
        self.inner.edges.read().values().cloned().collect()
    }

    pub fn stats(&self) -> Stats {
        let nodes = self.inner.nodes.read();
        let edges = self.inner.edges.read();

        let mut nodes_by_phase = HashMap::new();
        for node in nodes.values() {
            *nodes_by_phase.entry(node.state).or_insert(0u64) += 1;
        }
        let mut edges_by_phase = HashMap::new();
        for edge in edges.values() {
            *edges_by_phase.entry(edge.derived_state).or_insert(0u64) += 1;
        }

        Stats {
            node_count: nodes.len() as u64,
            edge_count: edges.len() as u64,
            nodes_by_phase,
            edges_by_phase,
            writer_queue_depth: self.inner.writer.queue_depth() as u64,
            last_write_completed: self.inner.metrics.last_updated(),
        }
    }

    /// Aggregates writer-queue-depth, backend-availability, and
    /// writer-failure signals into one [`HealthCheck`] report.
    pub async fn health_check(&self) -> HealthCheck {
        let mut health = HealthCheck::new();

        let depth = self.inner.writer.queue_depth();
        let high_water_mark = self.inner.config.writer_queue_high_water_mark;
        health.add_check(Check::WriterQueueDepth {
            depth,
            high_water_mark,
            healthy: depth <= high_water_mark,
        });

        health.add_check(Check::BackendAvailable {
            backend: "ice",
            healthy: self.inner.ice.available().await,
        });
        health.add_check(Check::BackendAvailable {
            backend: "water",
            healthy: self.inner.water.available().await,
        });

        let failures = self
            .inner
            .metrics
            .writer_effects_failed
            .load(std::sync::atomic::Ordering::Relaxed);
        health.add_check(Check::WriterFailures {
            count: failures,
            healthy: failures == 0,
        });

        // `WriterFailures` is a lifetime counter; `StuckEffects` is the live
        // count of keys whose most recent attempt exhausted retries (spec
        // §4.6's `Failed` terminal state), reflecting current backlog rather
        // than history.
        let stuck = self.inner.writer.failed_effect_count();
        health.add_check(Check::StuckEffects {
            count: stuck,
            healthy: stuck == 0,
        });

        health
    }
}
