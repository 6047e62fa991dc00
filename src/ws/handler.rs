//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::ConnectionSession;
use crate::app_state::AppState;

/// `GET /ws` — Upgrade to a telemetry/control session.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let session = ConnectionSession::new(
        Arc::downgrade(&state.coordinator),
        state.telemetry_interval,
        &state.sessions,
    );
    tracing::debug!(session_id = %session.id(), "upgrading client connection");

    ws.on_upgrade(move |socket| session.serve(socket))
}
