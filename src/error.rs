//! Bridge error types with HTTP status code mapping.
//!
//! [`BridgeError`] is the central error type for the bridge. Transport
//! operations return it instead of panicking so callers can log and
//! continue; the REST layer maps each variant to a status code and a
//! structured JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid command: empty payload"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Bridge-wide error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                 |
/// |-----------|------------|-----------------------------|
/// | 1000–1999 | Validation | 400 Bad Request             |
/// | 2000–2999 | Transport  | 503 Service Unavailable     |
/// | 3000–3999 | Server     | 500 Internal Server Error   |
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The logical command cannot be encoded as a single wire byte.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The transport is not open (construction failed or it was closed).
    #[error("{transport} transport unavailable: {reason}")]
    TransportUnavailable {
        /// Transport name (`"ros"`, `"serial"`, ...).
        transport: &'static str,
        /// Why the transport cannot be used.
        reason: String,
    },

    /// No transport is configured for the current control mode.
    #[error("no transport configured")]
    NoTransport,

    /// A single publish/write call failed.
    #[error("{transport} publish failed: {reason}")]
    Publish {
        /// Transport name.
        transport: &'static str,
        /// Underlying failure.
        reason: String,
    },

    /// A single read call failed.
    #[error("{transport} read failed: {reason}")]
    Read {
        /// Transport name.
        transport: &'static str,
        /// Underlying failure.
        reason: String,
    },

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidCommand(_) => 1002,
            Self::Config(_) => 1003,
            Self::TransportUnavailable { .. } => 2001,
            Self::NoTransport => 2002,
            Self::Publish { .. } => 2003,
            Self::Read { .. } => 2004,
            Self::Serialization(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidCommand(_) | Self::Config(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::TransportUnavailable { .. }
            | Self::NoTransport
            | Self::Publish { .. }
            | Self::Read { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Serialization(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
