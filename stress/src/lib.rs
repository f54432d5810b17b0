//! burst-stress library
//!
//! Loop → burst → request load scheduler with a concurrent telemetry
//! pipeline. Exported for the binary, the integration tests and benches.

pub mod config;
pub mod events;
pub mod executor;
pub mod feed;
pub mod schedule;
pub mod telemetry;

// Re-export commonly used types
pub use config::{Config, ConfigError, RunConfig, ScheduleConfig};
pub use events::{Event, EventBus, EventKind};
pub use executor::{ExecutorError, RequestExecutor};
pub use feed::{FeedState, feed_routes};
pub use schedule::{RunSummary, TestOrchestrator};
pub use telemetry::{MemoryProbe, TelemetryError, TelemetrySampler};
