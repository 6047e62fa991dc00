//! Router assembly, OpenAPI document and the shutdown sequence.

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api;
use crate::api::dto::{
    CommandRequest, DispatchResponse, HealthResponse, ModeRequest, StatusResponse,
    TransportStatusDto,
};
use crate::app_state::AppState;
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::BridgeCoordinator;
use crate::ws::SessionTracker;
use crate::ws::handler::ws_handler;

/// OpenAPI description of the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "dobi-bridge", description = "Teleoperation and telemetry bridge"),
    paths(
        api::handlers::system::health_handler,
        api::handlers::system::status_handler,
        api::handlers::control::send_command,
        api::handlers::control::set_mode,
    ),
    components(schemas(
        HealthResponse,
        StatusResponse,
        TransportStatusDto,
        CommandRequest,
        ModeRequest,
        DispatchResponse,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "System", description = "Health and status"),
        (name = "Control", description = "Drive commands and mode switches"),
    )
)]
pub struct ApiDoc;

/// Builds the full application: REST routes, `/ws`, and shared layers.
///
/// `request_timeout` bounds REST handlers only; WebSocket sessions are
/// long-lived.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let rest = api::build_router().layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        request_timeout,
    ));

    let app = Router::new().merge(rest).route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let app = app.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

/// Stops every session loop, waits up to `limit` for them to end, then
/// closes the coordinator's links.
///
/// Returns `false` if sessions were still live when the links were closed.
pub async fn drain_and_close(
    sessions: &SessionTracker,
    coordinator: &BridgeCoordinator,
    limit: Duration,
) -> bool {
    sessions.shutdown();
    let drained = sessions.wait_idle(limit).await;
    if !drained {
        tracing::warn!(
            active = sessions.active(),
            "sessions still running, closing links anyway"
        );
    }
    coordinator.close().await;
    drained
}
