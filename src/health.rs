//! Health reporting: an aggregate rollup of writer and backend checks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Check {
    WriterQueueDepth {
        depth: usize,
        high_water_mark: usize,
        healthy: bool,
    },
    BackendAvailable {
        backend: &'static str,
        healthy: bool,
    },
    WriterFailures {
        count: u64,
        healthy: bool,
    },
    StuckEffects {
        count: usize,
        healthy: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub checks: Vec<Check>,
}

impl HealthCheck {
    pub fn new() -> Self {
        Self {
            status: HealthStatus::Healthy,
            checks: Vec::new(),
        }
    }

    pub fn add_check(&mut self, check: Check) {
        let healthy = match &check {
            Check::WriterQueueDepth { healthy, .. } => *healthy,
            Check::BackendAvailable { healthy, .. } => *healthy,
            Check::WriterFailures { healthy, .. } => *healthy,
            Check::StuckEffects { healthy, .. } => *healthy,
        };
        if !healthy {
            self.status = match (&self.status, &check) {
                (_, Check::BackendAvailable { .. }) => HealthStatus::Unhealthy,
                (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
                _ => HealthStatus::Degraded,
            };
        }
        self.checks.push(check);
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new()
    }
}
