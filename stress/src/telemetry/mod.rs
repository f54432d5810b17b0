//! Target telemetry: resident memory and remote metrics
//!
//! This module provides:
//! - `MemoryProbe` trait and the sysinfo-backed `ProcessMemoryProbe`
//! - `MetricsPoller` for the target's JSON metrics endpoint
//! - `TelemetrySampler`, the periodic producer feeding the event bus

mod memory;
mod poller;
mod sampler;
mod types;

pub use memory::{MemoryProbe, ProcessMemoryProbe};
pub use poller::{MetricsPoller, parse_snapshot};
pub use sampler::{SamplerHandle, TelemetrySampler};
pub use types::TelemetryError;
