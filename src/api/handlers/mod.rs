//! REST endpoint handlers organized by resource.

pub mod control;
pub mod system;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(system::status_handler))
        .merge(control::routes())
}
