//! Command and mode DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::DispatchReport;

/// Request body for `POST /api/v1/command`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommandRequest {
    /// Logical command name such as `forward`, or a raw single character.
    pub command: String,
}

/// Request body for `POST /api/v1/mode`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ModeRequest {
    /// Mode string forwarded verbatim to the robot.
    pub mode: String,
}

/// Response body for accepted dispatches.
#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchResponse {
    /// Links that accepted the call.
    pub delivered: usize,
    /// Links whose call failed.
    pub failed: usize,
}

impl From<DispatchReport> for DispatchResponse {
    fn from(report: DispatchReport) -> Self {
        Self {
            delivered: report.delivered,
            failed: report.failed,
        }
    }
}
