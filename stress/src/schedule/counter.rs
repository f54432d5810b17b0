//! In-flight request gauge

use metrics::gauge;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of request workers currently executing.
///
/// Only `track` increments it and only dropping the returned guard
/// decrements it, so the value cannot go negative and returns to zero once
/// every guard is gone, whatever the interleaving.
#[derive(Debug, Default)]
pub struct PendingRequestCounter {
    value: AtomicUsize,
}

impl PendingRequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request as in flight until the guard is dropped
    pub fn track(self: &Arc<Self>) -> PendingGuard {
        let now = self.value.fetch_add(1, Ordering::SeqCst) + 1;
        gauge!("stress_pending_requests").set(now as f64);
        PendingGuard {
            counter: Arc::clone(self),
        }
    }

    pub fn get(&self) -> usize {
        self.value.load(Ordering::SeqCst)
    }
}

/// Decrements the counter on drop, including when a worker panics
#[derive(Debug)]
pub struct PendingGuard {
    counter: Arc<PendingRequestCounter>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let now = self.counter.value.fetch_sub(1, Ordering::SeqCst) - 1;
        gauge!("stress_pending_requests").set(now as f64);
    }
}
