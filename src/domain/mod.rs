//! Domain layer: control mode, command mapping, telemetry model.
//!
//! These types carry no I/O. Transports and sessions build on them.

pub mod command;
pub mod control_mode;
pub mod session_id;
pub mod telemetry;

pub use command::{ByteCommand, CommandMap, CommandRouter};
pub use control_mode::ControlMode;
pub use session_id::SessionId;
pub use telemetry::{ImuReading, Quaternion, SensorUpdate, Telemetry, TelemetrySnapshot, Vector3};
