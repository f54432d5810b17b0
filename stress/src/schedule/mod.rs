//! Load scheduling
//!
//! This module provides:
//! - `TestOrchestrator` running a whole loop sequence plus the read loop
//! - `LoopDriver` and `BurstDriver` for the loop → burst → request hierarchy
//! - `Escalator` holding the escalating burst count and burst size
//! - `PendingRequestCounter` and the per-burst completion signal

mod burst;
mod counter;
mod driver;
mod escalation;
mod orchestrator;
mod reads;
mod signal;
mod worker;

use std::sync::Arc;

use crate::events::EventBus;
use crate::executor::RequestExecutor;

pub use burst::{BurstDriver, BurstReport};
pub use counter::{PendingGuard, PendingRequestCounter};
pub use driver::{LoopDriver, LoopReport};
pub use escalation::Escalator;
pub use orchestrator::{CompletedRun, RunSummary, TestOrchestrator};
pub use reads::{ReadGenerator, ReadGeneratorHandle};
pub use signal::{CompletionNotifier, CompletionWaiter, completion_signal};
pub use worker::{run_read, run_request, spawn_request};

/// Everything a request needs, shared by every unit of one run
#[derive(Clone)]
pub struct LoadContext {
    pub bus: Arc<EventBus>,
    pub executor: Arc<dyn RequestExecutor>,
    pub pending: Arc<PendingRequestCounter>,
}

impl LoadContext {
    pub fn new(bus: Arc<EventBus>, executor: Arc<dyn RequestExecutor>) -> Self {
        Self {
            bus,
            executor,
            pending: Arc::new(PendingRequestCounter::new()),
        }
    }
}
