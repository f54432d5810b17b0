use anyhow::Context;
use burst_stress::config::{Config, RunConfig};
use burst_stress::events::EventBus;
use burst_stress::executor;
use burst_stress::feed::{FeedState, feed_routes, spawn_log_drain};
use burst_stress::schedule::TestOrchestrator;
use burst_stress::telemetry::{MetricsPoller, ProcessMemoryProbe, TelemetrySampler};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often queued events are discarded when no feed consumes them
const HEADLESS_DRAIN_PERIOD: Duration = Duration::from_secs(5);

/// Initialize the Prometheus metrics recorder
fn setup_prometheus_metrics() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let started = Instant::now();

    // Initialize Prometheus metrics recorder (must be done before any metrics are recorded)
    let prometheus_handle = setup_prometheus_metrics()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "burst_stress=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment, then the run document
    let config = Config::from_env();
    info!(
        "Loaded configuration: feed={}:{} (enabled={}), run config={:?}",
        config.host, config.port, config.feed_enabled, config.run_config_path
    );
    let mut run_config = RunConfig::load(&config.run_config_path)?;

    // `burst-stress <pid>` overrides the pid from the run document
    if let Some(arg) = std::env::args().nth(1) {
        let pid = arg
            .parse::<u32>()
            .with_context(|| format!("Invalid target pid: {}", arg))?;
        run_config.target_pid = Some(pid);
    }
    let pid = run_config.require_pid()?;
    info!("Target pid: {}", pid);

    let executor = executor::from_config(&run_config.executor)?;
    let probe = ProcessMemoryProbe::new(pid)?;
    let poller = match &run_config.metrics_url {
        Some(url) => {
            info!("Polling target metrics at {}", url);
            Some(MetricsPoller::new(url.clone(), run_config.metrics_timeout)?)
        }
        None => {
            info!("Target metrics polling disabled (metrics_url not set)");
            None
        }
    };

    let bus = Arc::new(EventBus::new());
    let sampler = Arc::new(TelemetrySampler::new(
        Arc::clone(&bus),
        Arc::new(probe),
        poller,
        run_config.schedule.measurement_delay,
    ));
    let orchestrator = TestOrchestrator::new(
        Arc::clone(&bus),
        executor,
        sampler,
        run_config.schedule,
        run_config.payloads,
    )?;

    // Start the feed
    if config.feed_enabled {
        let state = FeedState {
            bus: Arc::clone(orchestrator.bus()),
            pending: Arc::clone(orchestrator.pending()),
            run_id: orchestrator.run_id(),
            schedule: Arc::clone(orchestrator.schedule()),
            started,
            prometheus: Some(prometheus_handle),
        };
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Event feed listening on {}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, feed_routes(state)).await {
                warn!("Event feed stopped: {}", e);
            }
        });
    } else {
        info!("Event feed disabled (FEED_ENABLED=false), discarding events");
        spawn_log_drain(Arc::clone(orchestrator.bus()), HEADLESS_DRAIN_PERIOD);
    }

    let run = orchestrator.run().await;

    if config.hold_after_run {
        info!("Run complete, still sampling; press Ctrl-C to exit");
        tokio::signal::ctrl_c().await?;
    }
    drop(run.telemetry);

    Ok(())
}
