//! Transport links: the channels between the bridge and the robot.
//!
//! The bridge never speaks to ROS or a serial device directly; it holds
//! [`TransportLink`] trait objects and lets each link translate commands
//! and telemetry into its own wire format.
//!
//! - [`RosLink`] – rosbridge v2 JSON over a WebSocket client.
//! - [`SerialLink`] – raw bytes over a serial device.
//! - [`MemoryLink`] – in-process link for tests and dry runs.

pub mod memory;
pub mod ros;
pub mod serial;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{ByteCommand, Telemetry};
use crate::error::BridgeError;

pub use memory::MemoryLink;
pub use ros::RosLink;
pub use serial::SerialLink;

/// Which concrete channel a link drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// rosbridge pub/sub.
    Ros,
    /// Serial device.
    Serial,
}

impl TransportKind {
    /// Short name used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ros => "ros",
            Self::Serial => "serial",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every outbound/inbound channel to the robot implements this trait.
///
/// # Contract
///
/// * Operations never panic; failures come back as [`BridgeError`] so the
///   caller can log and carry on with the next transport.
/// * Sends and receives on the same link are serialized by the link itself;
///   callers need no extra locking.
/// * `close` is idempotent.
#[async_trait]
pub trait TransportLink: Send + Sync + fmt::Debug {
    /// Which channel this link drives.
    fn kind(&self) -> TransportKind;

    /// Returns `true` while the underlying channel is open.
    fn is_available(&self) -> bool;

    /// Sends one command byte.
    async fn publish_command(&self, command: ByteCommand) -> Result<(), BridgeError>;

    /// Sends a mode switch.
    async fn publish_mode(&self, mode: &str) -> Result<(), BridgeError>;

    /// Returns the most recent telemetry, or `None` if there is none yet.
    async fn read_latest_telemetry(&self) -> Result<Option<Telemetry>, BridgeError>;

    /// Releases the channel.
    async fn close(&self) -> Result<(), BridgeError>;
}
