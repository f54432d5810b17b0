//! Telemetry error definitions

use thiserror::Error;

/// Failures while sampling the target. They stay inside the sampler: a
/// failed tick is logged and skipped, the load path never sees them.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Process not found: {0}")]
    ProcessNotFound(u32),

    #[error("Metrics request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Metrics endpoint answered with status {0}")]
    Status(u16),

    #[error("Metrics document is missing {0}")]
    MissingField(&'static str),

    #[error("Metrics endpoint did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

impl TelemetryError {
    /// Label used for the failure counter
    pub fn source_label(&self) -> &'static str {
        match self {
            TelemetryError::ProcessNotFound(_) => "memory",
            _ => "metrics",
        }
    }
}
