//! System endpoints: health check and bridge status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{HealthResponse, StatusResponse, TransportStatusDto};
use crate::app_state::AppState;

/// `GET /health` — Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns `ok` whenever the process is serving, regardless of link state.",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /api/v1/status` — Control mode and link status.
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "System",
    summary = "Bridge status",
    description = "Reports the configured control mode, each constructed link and whether it is open, and the number of connected WebSocket sessions.",
    responses(
        (status = 200, description = "Current bridge status", body = StatusResponse),
    )
)]
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();
    Json(StatusResponse {
        mode: state.coordinator.mode().as_str().to_string(),
        transports: state
            .coordinator
            .transports()
            .into_iter()
            .map(TransportStatusDto::from)
            .collect(),
        active_sessions: state.sessions.active(),
        telemetry_interval_ms: u64::try_from(state.telemetry_interval.as_millis())
            .unwrap_or(u64::MAX),
        started_at: state.started_at,
        uptime_secs: (now - state.started_at).num_seconds(),
    })
}

/// Routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
