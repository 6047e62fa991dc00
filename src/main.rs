//! dobi-bridge server entry point.
//!
//! Connects the configured transports, then serves REST and WebSocket
//! endpoints until Ctrl-C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use dobi_bridge::app_state::AppState;
use dobi_bridge::config::{BridgeConfig, LogFormat};
use dobi_bridge::server::{build_app, drain_and_close, shutdown_signal};
use dobi_bridge::service::BridgeCoordinator;

/// Upper bound on waiting for sessions to end before the links close.
const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BridgeConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format);
    tracing::info!(
        addr = %config.listen_addr,
        mode = %config.control_mode,
        "starting dobi-bridge"
    );

    // Transports
    let coordinator = Arc::new(BridgeCoordinator::connect(&config).await);

    // Application
    let state = AppState::new(Arc::clone(&coordinator), config.telemetry_interval);
    let sessions = Arc::clone(&state.sessions);
    let app = build_app(state, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let signalled = Arc::clone(&sessions);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signalled.shutdown();
        })
        .await;

    // Upgraded sockets outlive `serve`; links close only once they are gone.
    drain_and_close(&sessions, &coordinator, SESSION_DRAIN_TIMEOUT).await;
    served.context("server error")?;

    tracing::info!("shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
