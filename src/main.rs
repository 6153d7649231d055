// Main entry point - Dependency injection, background tasks and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::clock::SystemClock;
use crate::application::monitor_service::MonitorService;
use crate::infrastructure::config::load_monitor_config;
use crate::infrastructure::file_store::FileStateStore;
use crate::infrastructure::http_source::HttpSnapshotSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_dashboard, health_check, refresh, set_auto_refresh, stream_dashboard,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_monitor_config()?;

    // Create adapters (infrastructure layer)
    let source = Arc::new(HttpSnapshotSource::new(
        config.source_url(),
        std::time::Duration::from_secs(config.source.request_timeout_secs),
    )?);
    let store = Arc::new(FileStateStore::open(&config.state.path));

    // Create monitor (application layer)
    let monitor = Arc::new(MonitorService::new(
        source,
        store,
        Arc::new(SystemClock),
        config.monitor_settings(),
        config.polling.auto_refresh,
    ));

    // Initial load, then background timers
    if let Err(e) = monitor.poll().await {
        tracing::warn!("Initial poll failed: {}", e);
    }
    let auto_refresh = tokio::spawn(monitor.clone().run_auto_refresh());
    let revert_checks = tokio::spawn(monitor.clone().run_revert_checks());

    let state = Arc::new(AppState { monitor });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/stream", get(stream_dashboard))
        .route("/refresh", post(refresh))
        .route("/auto-refresh", put(set_auto_refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting tank-monitor on {}", addr);

    let served = axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    auto_refresh.abort();
    revert_checks.abort();
    served?;

    Ok(())
}
