//! Common Test Utilities for Integration Tests
//!
//! Shared mocks and builders used across integration test modules.

#![allow(dead_code)]

use async_trait::async_trait;
use burst_stress::config::{Escalation, Payloads, ScheduleConfig};
use burst_stress::events::{Event, EventBus, EventKind};
use burst_stress::executor::{ExecutorError, RequestExecutor};
use burst_stress::schedule::TestOrchestrator;
use burst_stress::telemetry::{MemoryProbe, MetricsPoller, TelemetryError, TelemetrySampler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const MUTATION_PAYLOAD: &str = "mutation.json";
pub const READ_PAYLOAD: &str = "read.json";

/// Executor that sleeps for a fixed latency and counts calls per payload
pub struct MockExecutor {
    latency: Duration,
    fail: bool,
    mutations: AtomicUsize,
    reads: AtomicUsize,
}

impl MockExecutor {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail: false,
            mutations: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn failing(latency: Duration) -> Self {
        Self {
            fail: true,
            ..Self::new(latency)
        }
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestExecutor for MockExecutor {
    async fn execute(&self, payload: &Path) -> Result<(), ExecutorError> {
        if payload == Path::new(READ_PAYLOAD) {
            self.reads.fetch_add(1, Ordering::SeqCst);
        } else {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }
        tokio::time::sleep(self.latency).await;
        if self.fail {
            Err(ExecutorError::Status(500))
        } else {
            Ok(())
        }
    }
}

/// Memory probe reporting a constant RSS
pub struct FixedProbe(pub u64);

impl MemoryProbe for FixedProbe {
    fn resident_bytes(&self) -> Result<u64, TelemetryError> {
        Ok(self.0)
    }
}

/// Scalar schedule with fast pacing and no read loop
pub fn schedule(
    bursts: usize,
    bursts_incr: usize,
    requests: usize,
    requests_incr: usize,
    loops: usize,
) -> ScheduleConfig {
    ScheduleConfig {
        bursts_per_loop_min: Escalation::Fixed(bursts),
        bursts_per_loop_incr: bursts_incr,
        requests_per_burst_min: Escalation::Fixed(requests),
        requests_per_burst_incr: requests_incr,
        request_delay: Duration::from_millis(100),
        burst_delay: Duration::from_secs(1),
        loop_delay: Duration::from_secs(2),
        loop_count: loops,
        ..Default::default()
    }
}

pub fn payloads() -> Payloads {
    Payloads {
        mutation: PathBuf::from(MUTATION_PAYLOAD),
        read: Some(PathBuf::from(READ_PAYLOAD)),
    }
}

/// Orchestrator over a fresh bus, sampling a fixed probe
pub fn orchestrator(schedule: ScheduleConfig, executor: Arc<MockExecutor>) -> TestOrchestrator {
    orchestrator_with_poller(schedule, executor, None)
}

pub fn orchestrator_with_poller(
    schedule: ScheduleConfig,
    executor: Arc<MockExecutor>,
    poller: Option<MetricsPoller>,
) -> TestOrchestrator {
    let bus = Arc::new(EventBus::new());
    let sampler = Arc::new(TelemetrySampler::new(
        Arc::clone(&bus),
        Arc::new(FixedProbe(64 * 1024 * 1024)),
        poller,
        schedule.measurement_delay,
    ));
    TestOrchestrator::new(bus, executor, sampler, schedule, payloads())
        .expect("schedule should be valid")
}

/// Job events split into loops at each `loop_start`
pub fn split_loops(jobs: &[Event]) -> Vec<Vec<Event>> {
    let mut loops: Vec<Vec<Event>> = Vec::new();
    for event in jobs {
        if event.kind == EventKind::LoopStart {
            loops.push(Vec::new());
        }
        if let Some(current) = loops.last_mut() {
            current.push(event.clone());
        }
    }
    loops
}

pub fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

/// Kinds in order, restricted to `keep`
pub fn kinds_of(events: &[Event], keep: &[EventKind]) -> Vec<EventKind> {
    events
        .iter()
        .map(|e| e.kind)
        .filter(|k| keep.contains(k))
        .collect()
}
