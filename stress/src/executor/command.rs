//! Process-per-request executor

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::service::{ExecutorError, RequestExecutor};

/// Runs `program [args..] <payload>` for every request, discarding its output.
///
/// The child is killed if the request future is dropped, so cancelling the
/// read loop does not leave stray processes behind.
pub struct CommandExecutor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl RequestExecutor for CommandExecutor {
    async fn execute(&self, payload: &Path) -> Result<(), ExecutorError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(payload)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(ExecutorError::Spawn)?;

        if status.success() {
            Ok(())
        } else {
            Err(ExecutorError::Exit(status))
        }
    }
}
