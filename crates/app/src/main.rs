mod credentials;
mod dashboard;
mod login;
mod problem;
mod render;
mod router;
mod session;
mod telemetry;

use std::net::SocketAddr;

use tracing::info;
use domdash_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let state = router::AppState::from_config(&config, metrics).await;

    let addr: SocketAddr = config.bind_addr;
    info!(
        stage = "app",
        %addr,
        env = %config.environment.as_str(),
        csv = %config.domains_csv_path.display(),
        "starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
