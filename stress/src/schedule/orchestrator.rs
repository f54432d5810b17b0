//! Test orchestrator: one complete stress run

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use super::driver::LoopDriver;
use super::reads::ReadGenerator;
use super::{LoadContext, PendingRequestCounter};
use crate::config::{ConfigError, Payloads, ScheduleConfig};
use crate::events::{EventBus, EventKind};
use crate::executor::RequestExecutor;
use crate::telemetry::{SamplerHandle, TelemetrySampler};

/// Totals of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub loops: usize,
    pub bursts: usize,
    pub requests: usize,
    /// Reads that completed before the read loop was cancelled
    pub reads: u64,
    /// Mean service time of the burst requests, if any ran
    pub mean_request_secs: Option<f64>,
    pub elapsed: Duration,
}

/// A finished run. The telemetry sampler keeps running until `telemetry` is
/// dropped, so callers can keep observing the target after the last loop.
pub struct CompletedRun {
    pub summary: RunSummary,
    pub telemetry: SamplerHandle,
}

/// Wires the sampler, the read generator and `loop_count` loop iterations
/// together. Construction validates the schedule; nothing is spawned until
/// `run`.
pub struct TestOrchestrator {
    run_id: Uuid,
    ctx: LoadContext,
    schedule: Arc<ScheduleConfig>,
    mutation: Arc<Path>,
    read: Option<Arc<Path>>,
    sampler: Arc<TelemetrySampler>,
}

impl TestOrchestrator {
    pub fn new(
        bus: Arc<EventBus>,
        executor: Arc<dyn RequestExecutor>,
        sampler: Arc<TelemetrySampler>,
        schedule: ScheduleConfig,
        payloads: Payloads,
    ) -> Result<Self, ConfigError> {
        schedule.validate()?;
        let read = match (schedule.use_read_loop, payloads.read) {
            (true, None) => {
                return Err(ConfigError::Invalid(
                    "use_read_loop is set but no read payload was given".to_string(),
                ));
            }
            (true, Some(path)) => Some(Arc::from(path.as_path())),
            (false, _) => None,
        };

        Ok(Self {
            run_id: Uuid::new_v4(),
            ctx: LoadContext::new(bus, executor),
            schedule: Arc::new(schedule),
            mutation: Arc::from(payloads.mutation.as_path()),
            read,
            sampler,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.ctx.bus
    }

    pub fn pending(&self) -> &Arc<PendingRequestCounter> {
        &self.ctx.pending
    }

    pub fn schedule(&self) -> &Arc<ScheduleConfig> {
        &self.schedule
    }

    pub async fn run(&self) -> CompletedRun {
        let started_at = Utc::now();
        let start = Instant::now();
        info!("Starting run {}: {}", self.run_id, self.schedule.title());

        let telemetry = Arc::clone(&self.sampler).spawn();
        let reads = self.read.as_ref().map(|payload| {
            info!("Read loop enabled: read_delay={:?}", self.schedule.read_delay);
            ReadGenerator::new(self.ctx.clone(), Arc::clone(payload), self.schedule.read_delay)
                .spawn()
        });

        let mut driver = LoopDriver::new(
            self.ctx.clone(),
            Arc::clone(&self.schedule),
            Arc::clone(&self.mutation),
            Arc::clone(&self.sampler),
        );
        let mut bursts = 0;
        let mut requests = 0;
        for iteration in 0..self.schedule.loop_count {
            let report = driver.run_loop(iteration).await;
            bursts += report.bursts;
            requests += report.requests;
        }

        let reads = match reads {
            Some(handle) => {
                info!(
                    "Loops done, stopping read loop in {:?}",
                    self.schedule.kill_read_delay
                );
                handle.cancel_after(self.schedule.kill_read_delay).await
            }
            None => 0,
        };

        let summary = RunSummary {
            run_id: self.run_id,
            started_at,
            loops: self.schedule.loop_count,
            bursts,
            requests,
            reads,
            mean_request_secs: self.ctx.bus.mean_service_secs(EventKind::QueryFin),
            elapsed: start.elapsed(),
        };
        info!(
            "Run {} finished: {} loops, {} bursts, {} requests, {} reads in {:.1}s (mean request {:.3}s)",
            summary.run_id,
            summary.loops,
            summary.bursts,
            summary.requests,
            summary.reads,
            summary.elapsed.as_secs_f64(),
            summary.mean_request_secs.unwrap_or_default()
        );

        CompletedRun { summary, telemetry }
    }
}
