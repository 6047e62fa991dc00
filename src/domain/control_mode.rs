//! Deployment control mode: which transports the bridge drives.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::BridgeError;

/// Selects the transport(s) the bridge activates at startup.
///
/// Read once from configuration and never mutated afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// rosbridge pub/sub link only.
    #[default]
    Ros,
    /// Serial link only.
    Serial,
    /// Both links; telemetry prefers the ROS link.
    Both,
}

impl ControlMode {
    /// Returns `true` if this mode activates the ROS link.
    #[must_use]
    pub const fn uses_ros(self) -> bool {
        matches!(self, Self::Ros | Self::Both)
    }

    /// Returns `true` if this mode activates the serial link.
    #[must_use]
    pub const fn uses_serial(self) -> bool {
        matches!(self, Self::Serial | Self::Both)
    }

    /// Returns the configuration string for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ros => "ros",
            Self::Serial => "serial",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ros" => Ok(Self::Ros),
            "serial" => Ok(Self::Serial),
            "both" => Ok(Self::Both),
            other => Err(BridgeError::Config(format!(
                "unknown control mode '{other}' (expected ros, serial or both)"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("ROS".parse::<ControlMode>().ok(), Some(ControlMode::Ros));
        assert_eq!(" serial ".parse::<ControlMode>().ok(), Some(ControlMode::Serial));
        assert_eq!("Both".parse::<ControlMode>().ok(), Some(ControlMode::Both));
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!("udp".parse::<ControlMode>().is_err());
    }

    #[test]
    fn transport_selection_per_mode() {
        assert!(ControlMode::Ros.uses_ros() && !ControlMode::Ros.uses_serial());
        assert!(!ControlMode::Serial.uses_ros() && ControlMode::Serial.uses_serial());
        assert!(ControlMode::Both.uses_ros() && ControlMode::Both.uses_serial());
    }

    #[test]
    fn display_round_trips_config_string() {
        assert_eq!(ControlMode::Both.to_string(), "both");
    }
}
