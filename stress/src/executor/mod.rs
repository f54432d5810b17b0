//! Request executors: how one unit of work is issued against the target
//!
//! This module provides:
//! - `RequestExecutor` trait, invoked with a payload path
//! - `CommandExecutor` that runs a program per request
//! - `HttpExecutor` that POSTs the payload to an HTTP endpoint

mod command;
mod http;
mod service;

use std::sync::Arc;

pub use command::CommandExecutor;
pub use http::HttpExecutor;
pub use service::{ExecutorError, RequestExecutor, RequestKind};

use crate::config::ExecutorConfig;

/// Build the executor described by the run document
pub fn from_config(config: &ExecutorConfig) -> Result<Arc<dyn RequestExecutor>, ExecutorError> {
    match config {
        ExecutorConfig::Command { program, args } => {
            Ok(Arc::new(CommandExecutor::new(program.clone(), args.clone())))
        }
        ExecutorConfig::Http { url } => Ok(Arc::new(HttpExecutor::new(url.clone())?)),
    }
}
