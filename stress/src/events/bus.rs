//! Event bus: the merge point for every producer
//!
//! Producers append from any task; a single consumer drains each stream with
//! "pop everything currently queued, oldest first" semantics. Append order is
//! preserved per stream, so events from one producer come out in the order it
//! emitted them. No ordering across producers is implied beyond timestamps.

use std::collections::{HashMap, VecDeque};

use metrics::counter;
use parking_lot::Mutex;
use serde::Serialize;

use super::types::{BurstSpan, Event, EventKind};

/// Unbounded FIFO guarded by a mutex
struct EventQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> EventQueue<T> {
    fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    fn push(&self, item: T) {
        self.items.lock().push_back(item);
    }

    fn drain(&self) -> Vec<T> {
        self.items.lock().drain(..).collect()
    }
}

/// Everything drained in one pass
#[derive(Debug, Default, Serialize)]
pub struct Drained {
    pub jobs: Vec<Event>,
    pub memory: Vec<Event>,
    pub metrics: Vec<Event>,
    pub spans: Vec<BurstSpan>,
}

impl Drained {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
            && self.memory.is_empty()
            && self.metrics.is_empty()
            && self.spans.is_empty()
    }
}

/// Running total of one kind of service time
#[derive(Debug, Default, Clone, Copy)]
struct ServiceTally {
    count: u64,
    total_secs: f64,
}

/// Four drainable streams: job events, memory samples, metrics samples and
/// burst spans
pub struct EventBus {
    jobs: EventQueue<Event>,
    memory: EventQueue<Event>,
    metrics: EventQueue<Event>,
    spans: EventQueue<BurstSpan>,
    /// `query_fin`/`burst_fin` service times, kept for summaries and never
    /// drained
    service_times: Mutex<HashMap<EventKind, ServiceTally>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            jobs: EventQueue::new(),
            memory: EventQueue::new(),
            metrics: EventQueue::new(),
            spans: EventQueue::new(),
            service_times: Mutex::new(HashMap::new()),
        }
    }

    /// Route an event to its stream by kind
    pub fn publish(&self, event: Event) {
        counter!("stress_events_total", "kind" => event.kind.as_str()).increment(1);

        if event.kind.is_service_time()
            && let Some(secs) = event.elapsed_secs()
        {
            let mut tallies = self.service_times.lock();
            let tally = tallies.entry(event.kind).or_default();
            tally.count += 1;
            tally.total_secs += secs;
        }

        if event.kind.is_memory() {
            self.memory.push(event);
        } else if event.kind == EventKind::MetricsSample {
            self.metrics.push(event);
        } else {
            self.jobs.push(event);
        }
    }

    pub fn record_span(&self, span: BurstSpan) {
        self.spans.push(span);
    }

    pub fn drain_jobs(&self) -> Vec<Event> {
        self.jobs.drain()
    }

    pub fn drain_memory(&self) -> Vec<Event> {
        self.memory.drain()
    }

    pub fn drain_metrics(&self) -> Vec<Event> {
        self.metrics.drain()
    }

    pub fn drain_spans(&self) -> Vec<BurstSpan> {
        self.spans.drain()
    }

    /// Drain all four streams
    pub fn drain_all(&self) -> Drained {
        Drained {
            jobs: self.drain_jobs(),
            memory: self.drain_memory(),
            metrics: self.drain_metrics(),
            spans: self.drain_spans(),
        }
    }

    /// Completions of `kind` (`query_fin` or `burst_fin`) seen so far
    pub fn service_count(&self, kind: EventKind) -> u64 {
        self.service_times
            .lock()
            .get(&kind)
            .map_or(0, |tally| tally.count)
    }

    /// Mean service time of `kind` in seconds, `None` before the first one
    pub fn mean_service_secs(&self, kind: EventKind) -> Option<f64> {
        self.service_times
            .lock()
            .get(&kind)
            .filter(|tally| tally.count > 0)
            .map(|tally| tally.total_secs / tally.count as f64)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
