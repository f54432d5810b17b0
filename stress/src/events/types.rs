//! Event and span types shared by every producer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LoopStart,
    LoopEnd,
    LoopFin,
    BurstStart,
    BurstEnd,
    BurstFin,
    QueryStart,
    QueryFin,
    ReadStart,
    ReadFin,
    MemRss,
    MemRssIdle,
    MetricsSample,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::LoopStart => "loop_start",
            EventKind::LoopEnd => "loop_end",
            EventKind::LoopFin => "loop_fin",
            EventKind::BurstStart => "burst_start",
            EventKind::BurstEnd => "burst_end",
            EventKind::BurstFin => "burst_fin",
            EventKind::QueryStart => "query_start",
            EventKind::QueryFin => "query_fin",
            EventKind::ReadStart => "read_start",
            EventKind::ReadFin => "read_fin",
            EventKind::MemRss => "mem_rss",
            EventKind::MemRssIdle => "mem_rss_idle",
            EventKind::MetricsSample => "metrics_sample",
        }
    }

    /// Resident memory samples (ticked or idle)
    pub fn is_memory(&self) -> bool {
        matches!(self, EventKind::MemRss | EventKind::MemRssIdle)
    }

    /// Completion events that carry a service time
    pub fn is_service_time(&self) -> bool {
        matches!(self, EventKind::QueryFin | EventKind::BurstFin)
    }
}

/// Counters scraped from the target's metrics endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// `rts.gc.current_bytes_used`
    pub gc_current_bytes_used: u64,
    /// `gcdetails_mem_in_use_bytes`
    pub mem_in_use_bytes: u64,
}

/// Kind-specific event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    /// Seconds spent, for `*_fin` events
    Elapsed(f64),
    /// Byte count, for memory samples
    Bytes(u64),
    Metrics(MetricsSnapshot),
}

/// A timestamped, immutable event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Event {
    /// Event without payload, stamped now
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            payload: None,
        }
    }

    pub fn elapsed(kind: EventKind, elapsed: Duration) -> Self {
        Self {
            payload: Some(Payload::Elapsed(elapsed.as_secs_f64())),
            ..Self::new(kind)
        }
    }

    pub fn bytes(kind: EventKind, bytes: u64) -> Self {
        Self {
            payload: Some(Payload::Bytes(bytes)),
            ..Self::new(kind)
        }
    }

    pub fn metrics(snapshot: MetricsSnapshot) -> Self {
        Self {
            payload: Some(Payload::Metrics(snapshot)),
            ..Self::new(EventKind::MetricsSample)
        }
    }

    pub fn elapsed_secs(&self) -> Option<f64> {
        match self.payload {
            Some(Payload::Elapsed(secs)) => Some(secs),
            _ => None,
        }
    }

    pub fn byte_count(&self) -> Option<u64> {
        match self.payload {
            Some(Payload::Bytes(bytes)) => Some(bytes),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Option<MetricsSnapshot> {
        match self.payload {
            Some(Payload::Metrics(snapshot)) => Some(snapshot),
            _ => None,
        }
    }
}

/// Dispatch window of one burst, used for interval shading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurstSpan {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}
