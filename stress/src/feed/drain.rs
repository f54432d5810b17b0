//! Headless consumer used when the HTTP feed is disabled

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::events::EventBus;

/// Drain every stream of `bus` each `period` and log what was discarded,
/// keeping the queues bounded when no renderer is polling
pub fn spawn_log_drain(bus: Arc<EventBus>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let drained = bus.drain_all();
            if drained.is_empty() {
                continue;
            }
            let peak_rss = drained.memory.iter().filter_map(|e| e.byte_count()).max();
            info!(
                "Discarded {} jobs, {} memory, {} metrics, {} spans (peak rss {} bytes)",
                drained.jobs.len(),
                drained.memory.len(),
                drained.metrics.len(),
                drained.spans.len(),
                peak_rss.unwrap_or_default()
            );
        }
    })
}
