//! Burst driver: one wave of paced, concurrently running requests

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::LoadContext;
use super::signal::CompletionNotifier;
use super::worker::spawn_request;
use crate::events::{BurstSpan, Event, EventKind};

/// What a finished burst reports back to its loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstReport {
    pub requests: usize,
    /// Dispatch plus completion of every request
    pub elapsed: Duration,
}

/// Launches `size` requests `request_delay` apart without waiting for any of
/// them, then waits for all of them.
///
/// `burst_end` marks dispatch completion (the last launch returned), and
/// `burst_fin` marks completion of every request.
pub struct BurstDriver {
    ctx: LoadContext,
    payload: Arc<Path>,
    size: usize,
    request_delay: Duration,
    signal: Option<CompletionNotifier>,
}

impl BurstDriver {
    pub fn new(ctx: LoadContext, payload: Arc<Path>, size: usize, request_delay: Duration) -> Self {
        Self {
            ctx,
            payload,
            size,
            request_delay,
            signal: None,
        }
    }

    /// Publish a dispatch-complete token through `signal` at `burst_end`
    pub fn with_signal(mut self, signal: CompletionNotifier) -> Self {
        self.signal = Some(signal);
        self
    }

    pub async fn run(self) -> BurstReport {
        let start = Instant::now();
        let start_event = Event::new(EventKind::BurstStart);
        let start_time = start_event.timestamp;
        self.ctx.bus.publish(start_event);

        let mut workers = Vec::with_capacity(self.size);
        for _ in 0..self.size {
            workers.push(spawn_request(self.ctx.clone(), Arc::clone(&self.payload)));
            tokio::time::sleep(self.request_delay).await;
        }

        let end_event = Event::new(EventKind::BurstEnd);
        let end_time = end_event.timestamp;
        self.ctx.bus.publish(end_event);
        if let Some(signal) = self.signal {
            signal.notify();
        }
        self.ctx.bus.record_span(BurstSpan {
            start_time,
            end_time,
        });
        debug!(
            "Burst of {} dispatched in {:?}, {} requests pending",
            self.size,
            start.elapsed(),
            self.ctx.pending.get()
        );

        for worker in workers {
            if let Err(e) = worker.await {
                warn!("Request worker did not finish cleanly: {}", e);
            }
        }

        let elapsed = start.elapsed();
        self.ctx
            .bus
            .publish(Event::elapsed(EventKind::BurstFin, elapsed));

        BurstReport {
            requests: self.size,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::executor::{ExecutorError, RequestExecutor};
    use crate::schedule::PendingRequestCounter;
    use crate::schedule::signal::completion_signal;
    use async_trait::async_trait;

    struct FixedLatency(Duration);

    #[async_trait]
    impl RequestExecutor for FixedLatency {
        async fn execute(&self, _payload: &Path) -> Result<(), ExecutorError> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    fn context(latency: Duration) -> LoadContext {
        LoadContext {
            bus: Arc::new(EventBus::new()),
            executor: Arc::new(FixedLatency(latency)),
            pending: Arc::new(PendingRequestCounter::new()),
        }
    }

    fn assert_close(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(5),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    fn driver(ctx: &LoadContext, size: usize, delay_ms: u64) -> BurstDriver {
        BurstDriver::new(
            ctx.clone(),
            Arc::from(Path::new("q.json")),
            size,
            Duration::from_millis(delay_ms),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_event_sequence() {
        let ctx = context(Duration::from_secs(1));
        let report = driver(&ctx, 3, 100).run().await;

        let kinds: Vec<_> = ctx.bus.drain_jobs().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds.first(), Some(&EventKind::BurstStart));
        assert_eq!(kinds.last(), Some(&EventKind::BurstFin));

        let end = kinds.iter().position(|k| *k == EventKind::BurstEnd).unwrap();
        // Requests are still running when dispatch completes
        assert_eq!(
            kinds[..end].iter().filter(|k| **k == EventKind::QueryStart).count(),
            3
        );
        assert!(!kinds[..end].contains(&EventKind::QueryFin));
        assert_eq!(
            kinds[end..].iter().filter(|k| **k == EventKind::QueryFin).count(),
            3
        );

        // Last launch at 200ms, slept until 300ms, last request done at 1200ms
        assert_eq!(report.requests, 3);
        assert_close(report.elapsed, Duration::from_millis(1200));
        assert_eq!(ctx.pending.get(), 0);
        assert_eq!(ctx.bus.drain_spans().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_overlap() {
        let ctx = context(Duration::from_secs(2));
        let burst = tokio::spawn(driver(&ctx, 5, 100).run());

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(ctx.pending.get(), 5);

        burst.await.unwrap();
        assert_eq!(ctx.pending.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_burst() {
        let ctx = context(Duration::from_secs(1));
        let report = driver(&ctx, 0, 100).run().await;

        let kinds: Vec<_> = ctx.bus.drain_jobs().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::BurstStart, EventKind::BurstEnd, EventKind::BurstFin]
        );
        assert_eq!(report.elapsed, Duration::ZERO);
        assert_eq!(ctx.pending.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_fires_at_dispatch_not_completion() {
        let ctx = context(Duration::from_secs(10));
        let (notifier, waiter) = completion_signal();
        let burst = tokio::spawn(driver(&ctx, 4, 250).with_signal(notifier).run());

        let start = Instant::now();
        assert!(waiter.wait().await);
        assert_close(start.elapsed(), Duration::from_secs(1));
        assert_eq!(ctx.pending.get(), 4);

        let report = burst.await.unwrap();
        assert_close(report.elapsed, Duration::from_millis(10_750));
    }

    #[tokio::test(start_paused = true)]
    async fn test_span_covers_dispatch_window() {
        let ctx = context(Duration::from_millis(1));
        driver(&ctx, 2, 10).run().await;

        let jobs = ctx.bus.drain_jobs();
        let spans = ctx.bus.drain_spans();
        let start = jobs.iter().find(|e| e.kind == EventKind::BurstStart).unwrap();
        let end = jobs.iter().find(|e| e.kind == EventKind::BurstEnd).unwrap();
        assert_eq!(spans[0].start_time, start.timestamp);
        assert_eq!(spans[0].end_time, end.timestamp);
    }
}
