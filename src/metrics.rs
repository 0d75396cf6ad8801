//! Lifecycle counters for the registry, writer, and content adapters.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

#[derive(Debug, Default)]
pub struct PerformanceMetrics {
    pub upserts: AtomicU64,
    pub deletes: AtomicU64,
    pub migrations: AtomicU64,
    pub adapter_cache_hits: AtomicU64,
    pub adapter_cache_misses: AtomicU64,
    pub writer_effects_completed: AtomicU64,
    pub writer_effects_retried: AtomicU64,
    pub writer_effects_failed: AtomicU64,
    last_updated: RwLock<Option<SystemTime>>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_upsert(&self) {
        self.upserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_migration(&self) {
        self.migrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_adapter_cache_hit(&self) {
        self.adapter_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_adapter_cache_miss(&self) {
        self.adapter_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Called by the async writer on every successful backend write; this is
    /// the wall-clock source for `stats().lastUpdated` (Open Question (b)).
    pub fn record_write_completed(&self) {
        self.writer_effects_completed.fetch_add(1, Ordering::Relaxed);
        *self.last_updated.write() = Some(SystemTime::now());
    }

    pub fn record_write_retried(&self) {
        self.writer_effects_retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failed(&self) {
        self.writer_effects_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_updated(&self) -> Option<SystemTime> {
        *self.last_updated.read()
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.adapter_cache_hits.load(Ordering::Relaxed);
        let misses = self.adapter_cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
