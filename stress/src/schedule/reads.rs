//! Background read generator

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::info;

use super::LoadContext;
use super::worker::run_read;

/// Progress is logged every this many launched reads
const READ_LOG_INTERVAL: u64 = 100;

/// Launches one read request every `read_delay` until cancelled. Reads are
/// not awaited before the next launch, so the cadence holds even when the
/// target slows down.
pub struct ReadGenerator {
    ctx: LoadContext,
    payload: Arc<Path>,
    read_delay: Duration,
}

impl ReadGenerator {
    pub fn new(ctx: LoadContext, payload: Arc<Path>, read_delay: Duration) -> Self {
        Self {
            ctx,
            payload,
            read_delay,
        }
    }

    pub fn spawn(self) -> ReadGeneratorHandle {
        let completed = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(self.run(Arc::clone(&completed)));
        ReadGeneratorHandle { task, completed }
    }

    async fn run(self, completed: Arc<AtomicU64>) {
        // Dropping the set on cancellation aborts every in-flight read
        let mut reads = JoinSet::new();
        let started = Instant::now();
        let mut launched: u64 = 0;

        loop {
            let ctx = self.ctx.clone();
            let payload = Arc::clone(&self.payload);
            let completed = Arc::clone(&completed);
            reads.spawn(async move {
                run_read(&ctx, &payload).await;
                completed.fetch_add(1, Ordering::SeqCst);
            });

            launched += 1;
            if launched % READ_LOG_INTERVAL == 0 {
                info!(
                    "Read loop: {} reads launched in {:.1}s",
                    launched,
                    started.elapsed().as_secs_f64()
                );
            }

            tokio::time::sleep(self.read_delay).await;
            while reads.try_join_next().is_some() {}
        }
    }
}

/// Running read generator
pub struct ReadGeneratorHandle {
    task: JoinHandle<()>,
    completed: Arc<AtomicU64>,
}

impl ReadGeneratorHandle {
    /// Hard-stop the generator and every read still in flight
    pub async fn cancel(self) -> u64 {
        self.task.abort();
        // Resolves once the task (and with it the JoinSet) has been dropped
        let _ = self.task.await;
        self.completed.load(Ordering::SeqCst)
    }

    /// Let the generator run for `linger`, then cancel it
    pub async fn cancel_after(self, linger: Duration) -> u64 {
        tokio::time::sleep(linger).await;
        self.cancel().await
    }
}
