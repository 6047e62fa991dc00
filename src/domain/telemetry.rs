//! Telemetry snapshot aggregated from independent sensor topics.
//!
//! Each sensor updates only its own field; no attempt is made to
//! time-align fields. A snapshot is "latest value per field".

use serde::{Deserialize, Serialize};

/// Orientation quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quaternion {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
    /// W (scalar) component.
    pub w: f64,
}

/// Three-axis vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    /// X axis.
    pub x: f64,
    /// Y axis.
    pub y: f64,
    /// Z axis.
    pub z: f64,
}

/// Compact IMU summary.
///
/// Deserializes straight from a `sensor_msgs/msg/Imu` body; header and
/// covariance fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImuReading {
    /// Orientation estimate.
    pub orientation: Quaternion,
    /// Angular velocity (rad/s).
    pub angular_velocity: Vector3,
    /// Linear acceleration (m/s²).
    pub linear_acceleration: Vector3,
}

/// Latest-known sensor values.
///
/// Missing readings serialize as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Left ultrasonic range (cm).
    #[serde(default)]
    pub ultrasonic_left: Option<f64>,
    /// Right ultrasonic range (cm).
    #[serde(default)]
    pub ultrasonic_right: Option<f64>,
    /// IMU summary.
    #[serde(default)]
    pub imu: Option<ImuReading>,
}

impl TelemetrySnapshot {
    /// Returns `true` if no sensor has reported yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ultrasonic_left.is_none() && self.ultrasonic_right.is_none() && self.imu.is_none()
    }

    /// Applies one sensor update, touching only that sensor's field.
    pub fn apply(&mut self, update: SensorUpdate) {
        match update {
            SensorUpdate::UltrasonicLeft(range) => self.ultrasonic_left = Some(range),
            SensorUpdate::UltrasonicRight(range) => self.ultrasonic_right = Some(range),
            SensorUpdate::Imu(reading) => self.imu = Some(reading),
        }
    }
}

/// A single reading from one sensor source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorUpdate {
    /// New left ultrasonic range.
    UltrasonicLeft(f64),
    /// New right ultrasonic range.
    UltrasonicRight(f64),
    /// New IMU reading.
    Imu(ImuReading),
}

/// Telemetry as pushed to clients.
///
/// The ROS link always yields a structured snapshot. The serial link
/// yields a snapshot when the firmware prints one as a JSON object, and
/// the raw trimmed line otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Telemetry {
    /// Structured snapshot.
    Snapshot(TelemetrySnapshot),
    /// Free-form serial line.
    Raw(String),
}

impl Telemetry {
    /// Interprets one trimmed serial line.
    #[must_use]
    pub fn from_serial_line(line: String) -> Self {
        if line.starts_with('{')
            && let Ok(snapshot) = serde_json::from_str::<TelemetrySnapshot>(&line)
            && !snapshot.is_empty()
        {
            return Self::Snapshot(snapshot);
        }
        Self::Raw(line)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn updates_touch_only_their_field() {
        let mut snap = TelemetrySnapshot::default();
        assert!(snap.is_empty());

        snap.apply(SensorUpdate::UltrasonicRight(42.5));
        assert_eq!(snap.ultrasonic_right, Some(42.5));
        assert_eq!(snap.ultrasonic_left, None);
        assert!(snap.imu.is_none());

        snap.apply(SensorUpdate::UltrasonicRight(40.0));
        assert_eq!(snap.ultrasonic_right, Some(40.0));
        assert!(!snap.is_empty());
    }

    #[test]
    fn empty_snapshot_serializes_nulls() {
        let Ok(json) = serde_json::to_value(TelemetrySnapshot::default()) else {
            panic!("serializable");
        };
        assert_eq!(
            json,
            serde_json::json!({
                "ultrasonic_left": null,
                "ultrasonic_right": null,
                "imu": null
            })
        );
    }

    #[test]
    fn imu_reading_ignores_extra_ros_fields() {
        let body = serde_json::json!({
            "header": {"frame_id": "imu_link"},
            "orientation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0},
            "orientation_covariance": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            "angular_velocity": {"x": 0.1, "y": 0.2, "z": 0.3},
            "linear_acceleration": {"x": 0.0, "y": 0.0, "z": 9.81}
        });
        let Ok(imu) = serde_json::from_value::<ImuReading>(body) else {
            panic!("imu body should parse");
        };
        assert!((imu.orientation.w - 1.0).abs() < f64::EPSILON);
        assert!((imu.linear_acceleration.z - 9.81).abs() < f64::EPSILON);
    }

    #[test]
    fn serial_json_line_becomes_snapshot() {
        let t = Telemetry::from_serial_line(r#"{"ultrasonic_left": 12.0}"#.to_string());
        let Telemetry::Snapshot(snap) = t else {
            panic!("expected snapshot");
        };
        assert_eq!(snap.ultrasonic_left, Some(12.0));
    }

    #[test]
    fn serial_plain_line_stays_raw() {
        assert_eq!(
            Telemetry::from_serial_line("L:12 R:30".to_string()),
            Telemetry::Raw("L:12 R:30".to_string())
        );
        assert_eq!(
            Telemetry::from_serial_line(r#"{"status":"ok"}"#.to_string()),
            Telemetry::Raw(r#"{"status":"ok"}"#.to_string())
        );
    }

    #[test]
    fn raw_telemetry_serializes_as_string() {
        let Ok(json) = serde_json::to_string(&Telemetry::Raw("hello".to_string())) else {
            panic!("serializable");
        };
        assert_eq!(json, r#""hello""#);
    }
}
