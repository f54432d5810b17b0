//! Event stream shared between the load scheduler, telemetry and the feed
//!
//! This module provides:
//! - `Event`/`EventKind`/`Payload`: immutable timestamped events
//! - `BurstSpan`: dispatch window of one burst
//! - `EventBus`: concurrency-safe append/drain queues

mod bus;
mod types;

pub use bus::{Drained, EventBus};
pub use types::{BurstSpan, Event, EventKind, MetricsSnapshot, Payload};
