//! Bridge configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`), are read once at startup and never change afterwards.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::{CommandMap, ControlMode};
use crate::error::BridgeError;

/// rosbridge connection and topic settings.
#[derive(Debug, Clone)]
pub struct RosConfig {
    /// WebSocket URL of the rosbridge server.
    pub url: String,
    /// Upper bound on the initial connect + handshake.
    pub connect_timeout: Duration,
    /// `queue_length` requested on every subscription.
    pub queue_depth: u32,
    /// Topic carrying single-byte drive commands (`std_msgs/msg/Char`).
    pub command_topic: String,
    /// Topic carrying mode switches (`std_msgs/msg/String`).
    pub mode_topic: String,
    /// Left ultrasonic range topic (`std_msgs/msg/Float32`).
    pub ultrasonic_left_topic: String,
    /// Right ultrasonic range topic (`std_msgs/msg/Float32`).
    pub ultrasonic_right_topic: String,
    /// IMU topic (`sensor_msgs/msg/Imu`).
    pub imu_topic: String,
}

impl Default for RosConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:9090".to_string(),
            connect_timeout: Duration::from_millis(2000),
            queue_depth: 10,
            command_topic: "/motor_command".to_string(),
            mode_topic: "/control_mode".to_string(),
            ultrasonic_left_topic: "/ultrasonic_left".to_string(),
            ultrasonic_right_topic: "/ultrasonic_right".to_string(),
            imu_topic: "/imu".to_string(),
        }
    }
}

/// Serial device settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub path: String,
    /// Baud rate.
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Top-level bridge configuration.
///
/// Loaded once at startup via [`BridgeConfig::from_env`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Socket address to bind the HTTP/WebSocket server to.
    pub listen_addr: SocketAddr,

    /// Which transports to activate.
    pub control_mode: ControlMode,

    /// Serial link settings (used when the mode includes serial).
    pub serial: SerialConfig,

    /// rosbridge settings (used when the mode includes ROS).
    pub ros: RosConfig,

    /// Logical command table.
    pub command_map: CommandMap,

    /// Telemetry push cadence, also the bound on each inbound wait.
    pub telemetry_interval: Duration,

    /// Timeout applied to REST requests.
    pub request_timeout: Duration,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            control_mode: ControlMode::default(),
            serial: SerialConfig::default(),
            ros: RosConfig::default(),
            command_map: CommandMap::default(),
            telemetry_interval: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
            log_format: LogFormat::default(),
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file,
    /// then delegates to [`BridgeConfig::from_lookup`].
    ///
    /// # Errors
    ///
    /// See [`BridgeConfig::from_lookup`].
    pub fn from_env() -> Result<Self, BridgeError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Missing keys take their defaults. Numeric keys with unparseable
    /// values also fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if `LISTEN_ADDR`, `CONTROL_MODE` or
    /// `COMMAND_MAP` is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|e| BridgeError::Config(format!("LISTEN_ADDR '{raw}': {e}")))?,
            None => defaults.listen_addr,
        };

        let control_mode = match lookup("CONTROL_MODE") {
            Some(raw) => raw.parse()?,
            None => defaults.control_mode,
        };

        let command_map = match lookup("COMMAND_MAP") {
            Some(raw) => raw.parse()?,
            None => defaults.command_map,
        };

        let serial = SerialConfig {
            path: lookup("SERIAL_PORT").unwrap_or(defaults.serial.path),
            baud_rate: parse_or(&lookup, "BAUD_RATE", defaults.serial.baud_rate),
        };

        let ros = RosConfig {
            url: lookup("ROSBRIDGE_URL").unwrap_or(defaults.ros.url),
            connect_timeout: Duration::from_millis(parse_or(
                &lookup,
                "ROS_CONNECT_TIMEOUT_MS",
                2000,
            )),
            queue_depth: parse_or(&lookup, "ROS_QUEUE_DEPTH", defaults.ros.queue_depth),
            command_topic: lookup("ROS_COMMAND_TOPIC").unwrap_or(defaults.ros.command_topic),
            mode_topic: lookup("ROS_MODE_TOPIC").unwrap_or(defaults.ros.mode_topic),
            ultrasonic_left_topic: lookup("ROS_ULTRASONIC_LEFT_TOPIC")
                .unwrap_or(defaults.ros.ultrasonic_left_topic),
            ultrasonic_right_topic: lookup("ROS_ULTRASONIC_RIGHT_TOPIC")
                .unwrap_or(defaults.ros.ultrasonic_right_topic),
            imu_topic: lookup("ROS_IMU_TOPIC").unwrap_or(defaults.ros.imu_topic),
        };

        let telemetry_interval =
            Duration::from_millis(parse_or::<_, u64>(&lookup, "TELEMETRY_INTERVAL_MS", 500).max(1));
        let request_timeout = Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 10));

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            control_mode,
            serial,
            ros,
            command_map,
            telemetry_interval,
            request_timeout,
            log_format,
        })
    }
}

/// Parses `key` as `T`, returning `default` on missing or invalid values.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let Ok(cfg) = BridgeConfig::from_lookup(lookup_from(&[])) else {
            panic!("defaults should load");
        };
        assert_eq!(cfg.listen_addr.port(), 8000);
        assert_eq!(cfg.control_mode, ControlMode::Ros);
        assert_eq!(cfg.serial, SerialConfig::default());
        assert_eq!(cfg.telemetry_interval, Duration::from_millis(500));
        assert_eq!(cfg.command_map, CommandMap::default());
        assert_eq!(cfg.ros.imu_topic, "/imu");
        assert_eq!(cfg.log_format, LogFormat::Text);
    }

    #[test]
    fn overrides_are_applied() {
        let Ok(cfg) = BridgeConfig::from_lookup(lookup_from(&[
            ("LISTEN_ADDR", "127.0.0.1:9000"),
            ("CONTROL_MODE", "both"),
            ("SERIAL_PORT", "/dev/ttyACM0"),
            ("BAUD_RATE", "9600"),
            ("TELEMETRY_INTERVAL_MS", "250"),
            ("COMMAND_MAP", "go=g"),
            ("LOG_FORMAT", "json"),
        ])) else {
            panic!("overrides should load");
        };
        assert_eq!(cfg.listen_addr.port(), 9000);
        assert_eq!(cfg.control_mode, ControlMode::Both);
        assert_eq!(cfg.serial.path, "/dev/ttyACM0");
        assert_eq!(cfg.serial.baud_rate, 9600);
        assert_eq!(cfg.telemetry_interval, Duration::from_millis(250));
        assert_eq!(cfg.command_map.get("go"), Some("g"));
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_numeric_falls_back_to_default() {
        let Ok(cfg) = BridgeConfig::from_lookup(lookup_from(&[("BAUD_RATE", "fast")])) else {
            panic!("should load");
        };
        assert_eq!(cfg.serial.baud_rate, 115_200);
    }

    #[test]
    fn invalid_control_mode_is_an_error() {
        let result = BridgeConfig::from_lookup(lookup_from(&[("CONTROL_MODE", "wifi")]));
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn invalid_listen_addr_is_an_error() {
        let result = BridgeConfig::from_lookup(lookup_from(&[("LISTEN_ADDR", "nowhere")]));
        assert!(result.is_err());
    }
}
