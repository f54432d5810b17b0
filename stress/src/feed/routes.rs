//! HTTP route handlers for the event feed

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::ScheduleConfig;
use crate::events::{Drained, EventBus};
use crate::schedule::PendingRequestCounter;

/// Shared state of the feed router
#[derive(Clone)]
pub struct FeedState {
    pub bus: Arc<EventBus>,
    pub pending: Arc<PendingRequestCounter>,
    pub run_id: Uuid,
    pub schedule: Arc<ScheduleConfig>,
    pub started: Instant,
    /// Rendered at `/metrics/prometheus` when a recorder is installed
    pub prometheus: Option<PrometheusHandle>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    run_id: Uuid,
    uptime_seconds: u64,
    pending_requests: usize,
}

/// Response for GET /api/schedule
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    /// One-line chart title, e.g. `20(+10) reqs + 0.1s > 3(+2) bursts + 6s > 4 loops + 30s`
    pub title: String,
    pub schedule: ScheduleConfig,
}

/// GET /health
async fn health(State(state): State<FeedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        run_id: state.run_id,
        uptime_seconds: state.started.elapsed().as_secs(),
        pending_requests: state.pending.get(),
    })
}

/// GET /api/events - Pop everything published since the previous call,
/// oldest first, per stream
async fn drain_events(State(state): State<FeedState>) -> Json<Drained> {
    let drained = state.bus.drain_all();
    if !drained.is_empty() {
        tracing::debug!(
            "Feed drained {} jobs, {} memory, {} metrics, {} spans",
            drained.jobs.len(),
            drained.memory.len(),
            drained.metrics.len(),
            drained.spans.len()
        );
    }
    Json(drained)
}

/// GET /api/schedule
async fn schedule(State(state): State<FeedState>) -> Json<ScheduleResponse> {
    Json(ScheduleResponse {
        title: state.schedule.title(),
        schedule: state.schedule.as_ref().clone(),
    })
}

/// GET /metrics/prometheus
async fn prometheus_metrics(State(state): State<FeedState>) -> Response {
    match state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "Prometheus recorder not installed").into_response(),
    }
}

/// Create the feed router
pub fn feed_routes(state: FeedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/events", get(drain_events))
        .route("/api/schedule", get(schedule))
        .route("/metrics/prometheus", get(prometheus_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
