//! One-shot readiness signal.
//!
//! Before the hydrator marks the registry ready, reads observe whatever
//! partial state has loaded so far, and writes are still accepted and
//! queued.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Initializing,
    Ready,
}

#[derive(Clone)]
pub struct ReadinessSignal {
    tx: std::sync::Arc<watch::Sender<ReadinessState>>,
}

pub struct ReadinessWatcher {
    rx: watch::Receiver<ReadinessState>,
}

impl ReadinessSignal {
    pub fn new() -> (Self, ReadinessWatcher) {
        let (tx, rx) = watch::channel(ReadinessState::Initializing);
        (
            Self {
                tx: std::sync::Arc::new(tx),
            },
            ReadinessWatcher { rx },
        )
    }

    /// Marks the registry ready and fires the readiness event exactly once.
    pub fn mark_ready(&self) {
        let _ = self.tx.send(ReadinessState::Ready);
    }

    pub fn state(&self) -> ReadinessState {
        *self.tx.borrow()
    }
}

impl ReadinessWatcher {
    pub fn state(&self) -> ReadinessState {
        *self.rx.borrow()
    }

    /// Suspends until the registry becomes ready, or the cancellation token fires.
    pub async fn wait_ready(&mut self, cancel: &tokio_util::sync::CancellationToken) {
        if self.state() == ReadinessState::Ready {
            return;
        }
        tokio::select! {
            _ = self.rx.changed() => {}
            _ = cancel.cancelled() => {}
        }
    }
}
