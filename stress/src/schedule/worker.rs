//! Request worker: one timed request

use metrics::{counter, histogram};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::LoadContext;
use crate::events::{Event, EventKind};
use crate::executor::RequestKind;

/// Execute one burst request, emitting `query_start`/`query_fin` and keeping
/// the pending counter up to date. Executor failures are only logged: the
/// elapsed time is the measurement either way.
pub async fn run_request(ctx: &LoadContext, payload: &Path) {
    let start = Instant::now();
    ctx.bus.publish(Event::new(EventKind::QueryStart));

    let guard = ctx.pending.track();
    let result = ctx.executor.execute(payload).await;
    drop(guard);

    let elapsed = start.elapsed();
    record_outcome(RequestKind::Mutation, result.is_ok(), elapsed);
    if let Err(e) = result {
        debug!("Request failed after {:?}: {}", elapsed, e);
    }

    ctx.bus.publish(Event::elapsed(EventKind::QueryFin, elapsed));
}

/// Run a request on its own task
pub fn spawn_request(ctx: LoadContext, payload: Arc<Path>) -> JoinHandle<()> {
    tokio::spawn(async move { run_request(&ctx, &payload).await })
}

/// Execute one read request, emitting `read_start`/`read_fin`
pub async fn run_read(ctx: &LoadContext, payload: &Path) {
    let start = Instant::now();
    ctx.bus.publish(Event::new(EventKind::ReadStart));

    let result = ctx.executor.execute(payload).await;

    let elapsed = start.elapsed();
    record_outcome(RequestKind::Read, result.is_ok(), elapsed);
    if let Err(e) = result {
        debug!("Read failed after {:?}: {}", elapsed, e);
    }

    ctx.bus.publish(Event::elapsed(EventKind::ReadFin, elapsed));
}

fn record_outcome(kind: RequestKind, success: bool, elapsed: std::time::Duration) {
    let outcome = if success { "success" } else { "failure" };
    counter!("stress_requests_total", "kind" => kind.as_str(), "outcome" => outcome).increment(1);
    histogram!("stress_request_duration_seconds", "kind" => kind.as_str()).record(elapsed);
}
