//! Periodic telemetry sampler

use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::memory::MemoryProbe;
use super::poller::MetricsPoller;
use super::types::TelemetryError;
use crate::events::{Event, EventBus, EventKind};

/// Samples target memory (and optionally the metrics endpoint) every
/// `interval`, for as long as its handle is alive.
///
/// Memory and metrics run on separate tasks ticking on the same period, so a
/// slow endpoint never delays a memory sample. A poll that has not answered
/// within one period is abandoned and its tick skipped, which keeps every
/// `metrics_sample` within one tick of the `mem_rss` sample it pairs with.
pub struct TelemetrySampler {
    bus: Arc<EventBus>,
    probe: Arc<dyn MemoryProbe>,
    poller: Option<MetricsPoller>,
    interval: Duration,
}

impl TelemetrySampler {
    pub fn new(
        bus: Arc<EventBus>,
        probe: Arc<dyn MemoryProbe>,
        poller: Option<MetricsPoller>,
        interval: Duration,
    ) -> Self {
        Self {
            bus,
            probe,
            poller,
            interval,
        }
    }

    /// Instantaneous `mem_rss_idle` sample, taken between loops
    pub fn sample_idle(&self) {
        self.sample_memory(EventKind::MemRssIdle);
    }

    fn sample_memory(&self, kind: EventKind) {
        match self.probe.resident_bytes() {
            Ok(bytes) => self.bus.publish(Event::bytes(kind, bytes)),
            Err(e) => record_failure(&e),
        }
    }

    /// One `metrics_sample`, bounded by the tick period
    async fn sample_metrics(&self, poller: &MetricsPoller) {
        let result = match tokio::time::timeout(self.interval, poller.poll()).await {
            Ok(result) => result,
            Err(_) => Err(TelemetryError::Timeout(self.interval)),
        };
        match result {
            Ok(snapshot) => self.bus.publish(Event::metrics(snapshot)),
            Err(e) => record_failure(&e),
        }
    }

    /// Start ticking on its own tasks
    pub fn spawn(self: Arc<Self>) -> SamplerHandle {
        info!(
            "Telemetry sampler started: interval={:?}, metrics={}",
            self.interval,
            self.poller.as_ref().map(|p| p.url()).unwrap_or("disabled")
        );

        let metrics = self.poller.is_some().then(|| {
            let sampler = Arc::clone(&self);
            tokio::spawn(async move {
                let Some(poller) = sampler.poller.as_ref() else {
                    return;
                };
                let mut interval = tokio::time::interval(sampler.interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    sampler.sample_metrics(poller).await;
                }
            })
        });

        let memory = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.sample_memory(EventKind::MemRss);
            }
        });

        SamplerHandle { memory, metrics }
    }
}

fn record_failure(error: &TelemetryError) {
    counter!("stress_telemetry_failures_total", "source" => error.source_label()).increment(1);
    warn!("Telemetry sample skipped: {}", error);
}

/// Keeps the sampler running; dropping it stops sampling
pub struct SamplerHandle {
    memory: JoinHandle<()>,
    metrics: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    pub fn is_running(&self) -> bool {
        !self.memory.is_finished()
    }

    /// Stop sampling (same as dropping the handle)
    pub fn stop(self) {}
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        debug!("Stopping telemetry sampler");
        self.memory.abort();
        if let Some(metrics) = &self.metrics {
            metrics.abort();
        }
    }
}
