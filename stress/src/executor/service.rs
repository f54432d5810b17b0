//! RequestExecutor trait definition

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures while issuing a request. The scheduler never treats these as
/// test failures; they only end up as a measured latency.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Failed to spawn request process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Request process exited with {0}")]
    Exit(std::process::ExitStatus),

    #[error("Failed to read payload {path:?}: {source}")]
    Payload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Target answered with status {0}")]
    Status(u16),
}

/// Traffic class a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Burst traffic
    Mutation,
    /// Background read loop traffic
    Read,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Mutation => "mutation",
            RequestKind::Read => "read",
        }
    }
}

/// Issues one request against the target
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Perform one unit of work described by `payload`
    async fn execute(&self, payload: &Path) -> Result<(), ExecutorError>;
}
