//! Client stream protocol: inbound commands and outbound telemetry.
//!
//! ```text
//! client → bridge   {"type": "command", "data": "forward"}
//!                   {"type": "mode",    "data": "auto"}
//! bridge → client   {"type": "telemetry", "data": <snapshot | string | null>}
//! ```
//!
//! Extra fields are ignored. Unknown `type` values are ignored without a
//! reply.

use serde::{Deserialize, Serialize};

use crate::domain::Telemetry;
use crate::error::BridgeError;

/// A recognized inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Logical drive command.
    Command(String),
    /// Mode switch.
    Mode(String),
}

#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    msg_type: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Parses one inbound text frame.
///
/// Returns `Ok(None)` for a well-formed message whose `type` is not
/// recognized.
///
/// # Errors
///
/// Returns [`BridgeError::Serialization`] for text that is not a JSON
/// object with a string `type`, and [`BridgeError::InvalidRequest`] when a
/// known type carries a non-string `data`.
pub fn parse_client_message(text: &str) -> Result<Option<ClientMessage>, BridgeError> {
    let envelope: InboundEnvelope = serde_json::from_str(text)?;
    let build: fn(String) -> ClientMessage = match envelope.msg_type.as_str() {
        "command" => ClientMessage::Command,
        "mode" => ClientMessage::Mode,
        _ => return Ok(None),
    };
    match envelope.data {
        Some(serde_json::Value::String(data)) => Ok(Some(build(data))),
        other => Err(BridgeError::InvalidRequest(format!(
            "'{}' message needs string data, got {}",
            envelope.msg_type,
            other.map_or_else(|| "nothing".to_string(), |v| v.to_string())
        ))),
    }
}

/// Messages the bridge pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Latest telemetry, `null` when no transport has any.
    Telemetry(Option<Telemetry>),
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::TelemetrySnapshot;

    #[test]
    fn parses_command() {
        let parsed = parse_client_message(r#"{"type":"command","data":"forward"}"#);
        assert!(matches!(parsed, Ok(Some(ClientMessage::Command(ref c))) if c == "forward"));
    }

    #[test]
    fn parses_mode_and_ignores_extra_fields() {
        let parsed = parse_client_message(r#"{"type":"mode","data":"auto","id":7}"#);
        assert!(matches!(parsed, Ok(Some(ClientMessage::Mode(ref m))) if m == "auto"));
    }

    #[test]
    fn unknown_type_is_ignored() {
        assert!(matches!(
            parse_client_message(r#"{"type":"ping","data":1}"#),
            Ok(None)
        ));
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(parse_client_message("not json").is_err());
        assert!(parse_client_message(r#"{"data":"forward"}"#).is_err());
        assert!(parse_client_message("[1,2]").is_err());
        assert!(matches!(
            parse_client_message(r#"{"type":"command","data":5}"#),
            Err(BridgeError::InvalidRequest(_))
        ));
        assert!(parse_client_message(r#"{"type":"command"}"#).is_err());
    }

    #[test]
    fn telemetry_without_data_serializes_null() {
        let Ok(json) = serde_json::to_string(&ServerMessage::Telemetry(None)) else {
            panic!("serializable");
        };
        assert_eq!(json, r#"{"type":"telemetry","data":null}"#);
    }

    #[test]
    fn telemetry_snapshot_is_nested_under_data() {
        let msg = ServerMessage::Telemetry(Some(Telemetry::Snapshot(TelemetrySnapshot {
            ultrasonic_left: Some(10.0),
            ..TelemetrySnapshot::default()
        })));
        let Ok(value) = serde_json::to_value(&msg) else {
            panic!("serializable");
        };
        assert_eq!(value.pointer("/type").and_then(|v| v.as_str()), Some("telemetry"));
        assert_eq!(
            value.pointer("/data/ultrasonic_left").and_then(|v| v.as_f64()),
            Some(10.0)
        );
        assert!(value.pointer("/data/imu").is_none_or(|v| v.is_null()));
    }
}
