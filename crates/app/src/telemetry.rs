use std::{
    fmt::Write as _,
    sync::{Mutex, OnceLock},
    time::Instant,
};

use metrics::{describe_counter, describe_gauge, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{
    fmt::time::UtcTime, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
    EnvFilter, Layer, Registry,
};

use domdash_util::{AppConfig, Environment};

const VERSION: &str = env!("CARGO_PKG_VERSION");

static SUBSCRIBER: OnceLock<()> = OnceLock::new();
static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();
static RECORDER_LOCK: Mutex<()> = Mutex::new(());
static STARTED_AT: OnceLock<Instant> = OnceLock::new();

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to initialize tracing: {0}")]
    Tracing(#[from] TryInitError),
    #[error("failed to install prometheus recorder: {0}")]
    Metrics(#[from] BuildError),
}

fn git_sha() -> &'static str {
    option_env!("GIT_SHA").unwrap_or("unknown")
}

/// Installs the global subscriber once per process.
///
/// Development and test get human-readable output; production emits JSON
/// lines. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryError> {
    if SUBSCRIBER.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let base = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_timer(UtcTime::rfc_3339());
    let output: Box<dyn Layer<Registry> + Send + Sync> = match config.environment {
        Environment::Production => base.json().boxed(),
        Environment::Development | Environment::Test => base.pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()?;
    SUBSCRIBER.set(()).ok();

    info!(
        stage = "telemetry",
        env = config.environment.as_str(),
        version = VERSION,
        git_sha = git_sha(),
        "tracing initialized"
    );
    Ok(())
}

/// Installs the Prometheus recorder, returning the shared handle on repeat calls.
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    let _guard = RECORDER_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(handle) = RECORDER.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    RECORDER.set(handle.clone()).ok();
    STARTED_AT.get_or_init(Instant::now);

    describe_counter!(
        "login_attempts_total",
        "Login form submissions by result (success, failure, invalid)"
    );
    describe_counter!(
        "dashboard_requests_total",
        "Dashboard views served, by format (html, json)"
    );
    describe_gauge!(
        "record_source_rows",
        Unit::Count,
        "Domain records loaded from the CSV at startup"
    );

    Ok(handle)
}

/// Renders the recorder output plus process-level build and uptime gauges.
pub fn render_metrics(handle: &PrometheusHandle) -> String {
    let mut body = handle.render();
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }

    let uptime = STARTED_AT
        .get()
        .map(|start| start.elapsed().as_secs_f64())
        .unwrap_or_default();
    let _ = writeln!(body, "# TYPE app_build_info gauge");
    let _ = writeln!(
        body,
        "app_build_info{{version=\"{VERSION}\",git=\"{}\"}} 1",
        git_sha()
    );
    let _ = writeln!(body, "# TYPE app_uptime_seconds gauge");
    let _ = writeln!(body, "app_uptime_seconds {uptime}");
    body
}
