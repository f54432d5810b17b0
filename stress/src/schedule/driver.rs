//! Loop driver: one escalation step made of several bursts

use metrics::counter;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::LoadContext;
use super::burst::{BurstDriver, BurstReport};
use super::escalation::Escalator;
use super::signal::completion_signal;
use crate::config::ScheduleConfig;
use crate::events::{Event, EventKind};
use crate::telemetry::TelemetrySampler;

/// Totals for one loop iteration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub bursts: usize,
    pub requests: usize,
}

/// Runs loop iterations, owning the escalating counters.
///
/// Per iteration: `loop_start`, then for every burst spawn its driver, bump
/// the burst size, optionally wait for its dispatch token
/// (`constant_burst_gap`), sleep `burst_delay`, and optionally join it
/// (`wait_for_bursts_to_complete`). `loop_end` follows the last dispatch and
/// `loop_fin` the last completion. Between loops the escalator is stepped and
/// two idle memory samples bracket `loop_delay`.
pub struct LoopDriver {
    ctx: LoadContext,
    schedule: Arc<ScheduleConfig>,
    payload: Arc<Path>,
    sampler: Arc<TelemetrySampler>,
    escalator: Escalator,
}

impl LoopDriver {
    pub fn new(
        ctx: LoadContext,
        schedule: Arc<ScheduleConfig>,
        payload: Arc<Path>,
        sampler: Arc<TelemetrySampler>,
    ) -> Self {
        let escalator = Escalator::new(&schedule);
        Self {
            ctx,
            schedule,
            payload,
            sampler,
            escalator,
        }
    }

    pub fn escalator(&self) -> &Escalator {
        &self.escalator
    }

    pub async fn run_loop(&mut self, iteration: usize) -> LoopReport {
        let bursts = self.escalator.begin_loop(iteration);
        info!(
            "Loop {}/{}: {} bursts starting at {} requests",
            iteration + 1,
            self.schedule.loop_count,
            bursts,
            self.escalator.requests_per_burst()
        );
        self.ctx.bus.publish(Event::new(EventKind::LoopStart));

        let mut report = LoopReport {
            bursts,
            requests: 0,
        };
        let mut in_flight = Vec::with_capacity(bursts);

        for _ in 0..bursts {
            let size = self.escalator.next_burst_size();
            report.requests += size;
            info!(
                "Burst size: {}, burst count: {}",
                size,
                self.escalator.bursts_per_loop()
            );

            let driver = BurstDriver::new(
                self.ctx.clone(),
                Arc::clone(&self.payload),
                size,
                self.schedule.request_delay,
            );
            let (driver, waiter) = if self.schedule.constant_burst_gap {
                let (notifier, waiter) = completion_signal();
                (driver.with_signal(notifier), Some(waiter))
            } else {
                (driver, None)
            };
            let handle = tokio::spawn(driver.run());
            counter!("stress_bursts_total").increment(1);

            if let Some(waiter) = waiter
                && !waiter.wait().await
            {
                warn!("Burst exited without signalling dispatch completion");
            }

            tokio::time::sleep(self.schedule.burst_delay).await;

            if self.schedule.wait_for_bursts_to_complete {
                join_burst(handle).await;
            } else {
                in_flight.push(handle);
            }
        }

        self.ctx.bus.publish(Event::new(EventKind::LoopEnd));
        for handle in in_flight {
            join_burst(handle).await;
        }
        self.ctx.bus.publish(Event::new(EventKind::LoopFin));

        self.escalator.end_loop();
        self.sampler.sample_idle();
        tokio::time::sleep(self.schedule.loop_delay).await;
        self.sampler.sample_idle();

        report
    }
}

async fn join_burst(handle: JoinHandle<BurstReport>) {
    match handle.await {
        Ok(report) => debug!(
            "Burst of {} finished in {:?}",
            report.requests, report.elapsed
        ),
        Err(e) => warn!("Burst driver did not finish cleanly: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Escalation;
    use crate::events::EventBus;
    use crate::executor::{ExecutorError, RequestExecutor};
    use crate::schedule::PendingRequestCounter;
    use crate::telemetry::{MemoryProbe, TelemetryError};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedLatency(Duration);

    #[async_trait]
    impl RequestExecutor for FixedLatency {
        async fn execute(&self, _payload: &Path) -> Result<(), ExecutorError> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    struct FixedProbe;

    impl MemoryProbe for FixedProbe {
        fn resident_bytes(&self) -> Result<u64, TelemetryError> {
            Ok(64 * 1024 * 1024)
        }
    }

    fn loop_driver(schedule: ScheduleConfig, latency: Duration) -> (LoopDriver, LoadContext) {
        let ctx = LoadContext {
            bus: Arc::new(EventBus::new()),
            executor: Arc::new(FixedLatency(latency)),
            pending: Arc::new(PendingRequestCounter::new()),
        };
        let sampler = Arc::new(TelemetrySampler::new(
            Arc::clone(&ctx.bus),
            Arc::new(FixedProbe),
            None,
            schedule.measurement_delay,
        ));
        let driver = LoopDriver::new(
            ctx.clone(),
            Arc::new(schedule),
            Arc::from(Path::new("q.json")),
            sampler,
        );
        (driver, ctx)
    }

    fn small_schedule() -> ScheduleConfig {
        ScheduleConfig {
            bursts_per_loop_min: Escalation::Fixed(2),
            bursts_per_loop_incr: 1,
            requests_per_burst_min: Escalation::Fixed(3),
            requests_per_burst_incr: 2,
            request_delay: Duration::from_millis(10),
            burst_delay: Duration::from_millis(20),
            loop_delay: Duration::from_millis(100),
            loop_count: 2,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_report_and_escalation() {
        let (mut driver, ctx) = loop_driver(small_schedule(), Duration::from_millis(50));

        let first = driver.run_loop(0).await;
        assert_eq!(first, LoopReport { bursts: 2, requests: 3 + 5 });
        assert_eq!(driver.escalator().requests_per_burst(), 3);
        assert_eq!(driver.escalator().bursts_per_loop(), 3);

        let second = driver.run_loop(1).await;
        assert_eq!(second, LoopReport { bursts: 3, requests: 3 + 5 + 7 });
        assert_eq!(ctx.pending.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_markers_and_idle_samples() {
        let (mut driver, ctx) = loop_driver(small_schedule(), Duration::from_millis(500));
        driver.run_loop(0).await;

        let kinds: Vec<_> = ctx.bus.drain_jobs().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds.first(), Some(&EventKind::LoopStart));
        assert_eq!(kinds.last(), Some(&EventKind::LoopFin));

        let loop_end = kinds.iter().position(|k| *k == EventKind::LoopEnd).unwrap();
        // Bursts overlap by default, so requests are still running at loop_end
        assert!(kinds[loop_end..].contains(&EventKind::BurstFin));

        let memory = ctx.bus.drain_memory();
        assert_eq!(memory.len(), 2);
        assert!(memory.iter().all(|e| e.kind == EventKind::MemRssIdle));
        assert_eq!(ctx.bus.drain_spans().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_bursts_serializes() {
        let schedule = ScheduleConfig {
            wait_for_bursts_to_complete: true,
            ..small_schedule()
        };
        let (mut driver, ctx) = loop_driver(schedule, Duration::from_millis(500));
        driver.run_loop(0).await;

        let burst_kinds: Vec<_> = ctx
            .bus
            .drain_jobs()
            .into_iter()
            .map(|e| e.kind)
            .filter(|k| matches!(k, EventKind::BurstStart | EventKind::BurstFin))
            .collect();
        assert_eq!(
            burst_kinds,
            vec![
                EventKind::BurstStart,
                EventKind::BurstFin,
                EventKind::BurstStart,
                EventKind::BurstFin
            ]
        );
    }
}
