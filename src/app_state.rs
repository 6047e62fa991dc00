//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::service::BridgeCoordinator;
use crate::ws::SessionTracker;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The process-wide transport coordinator.
    pub coordinator: Arc<BridgeCoordinator>,
    /// Live WebSocket sessions and the shutdown signal they watch.
    pub sessions: Arc<SessionTracker>,
    /// How long a session waits for client input before pushing telemetry.
    pub telemetry_interval: Duration,
    /// When the server started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Creates state around an already-connected coordinator.
    #[must_use]
    pub fn new(coordinator: Arc<BridgeCoordinator>, telemetry_interval: Duration) -> Self {
        Self {
            coordinator,
            sessions: Arc::new(SessionTracker::new()),
            telemetry_interval,
            started_at: Utc::now(),
        }
    }
}
