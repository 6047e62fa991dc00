//! Health and status DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::service::TransportStatus;

/// Response body for `GET /health`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// One configured transport link.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransportStatusDto {
    /// `ros` or `serial`.
    pub kind: String,
    /// Whether the link's channel is open.
    pub available: bool,
}

impl From<TransportStatus> for TransportStatusDto {
    fn from(status: TransportStatus) -> Self {
        Self {
            kind: status.kind.as_str().to_string(),
            available: status.available,
        }
    }
}

/// Response body for `GET /api/v1/status`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Configured control mode.
    pub mode: String,
    /// Links that were constructed at startup.
    pub transports: Vec<TransportStatusDto>,
    /// Connected WebSocket sessions.
    pub active_sessions: usize,
    /// Telemetry push interval in milliseconds.
    pub telemetry_interval_ms: u64,
    /// Server start time.
    pub started_at: DateTime<Utc>,
    /// Seconds since start.
    pub uptime_secs: i64,
}
