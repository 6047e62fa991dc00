//! Drive command and mode switch endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{CommandRequest, DispatchResponse, ModeRequest};
use crate::app_state::AppState;
use crate::error::{BridgeError, ErrorResponse};

/// `POST /command` — Send a drive command on every active link.
///
/// # Errors
///
/// Returns [`BridgeError`] if the command cannot be encoded or no link
/// exists.
#[utoipa::path(
    post,
    path = "/api/v1/command",
    tag = "Control",
    summary = "Send a drive command",
    description = "Maps a logical command through the command map and publishes the resulting byte on every active link. Per-link failures are reported in the body, not as an error.",
    request_body = CommandRequest,
    responses(
        (status = 202, description = "Command dispatched", body = DispatchResponse),
        (status = 400, description = "Command cannot be encoded", body = ErrorResponse),
        (status = 503, description = "No transport link exists", body = ErrorResponse),
    )
)]
pub async fn send_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Result<impl IntoResponse, BridgeError> {
    let report = state.coordinator.publish_command(&req.command).await?;
    Ok((StatusCode::ACCEPTED, Json(DispatchResponse::from(report))))
}

/// `POST /mode` — Send a mode switch on every active link.
///
/// # Errors
///
/// Returns [`BridgeError`] if the mode is blank or no link exists.
#[utoipa::path(
    post,
    path = "/api/v1/mode",
    tag = "Control",
    summary = "Switch robot mode",
    description = "Publishes the mode string on every active link.",
    request_body = ModeRequest,
    responses(
        (status = 202, description = "Mode dispatched", body = DispatchResponse),
        (status = 400, description = "Mode is blank", body = ErrorResponse),
        (status = 503, description = "No transport link exists", body = ErrorResponse),
    )
)]
pub async fn set_mode(
    State(state): State<AppState>,
    Json(req): Json<ModeRequest>,
) -> Result<impl IntoResponse, BridgeError> {
    if req.mode.trim().is_empty() {
        return Err(BridgeError::InvalidRequest("mode must not be blank".to_string()));
    }
    let report = state.coordinator.publish_mode(&req.mode).await?;
    Ok((StatusCode::ACCEPTED, Json(DispatchResponse::from(report))))
}

/// Control routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/command", post(send_command))
        .route("/mode", post(set_mode))
}
