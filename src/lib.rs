//! # dobi-bridge
//!
//! Teleoperation and telemetry bridge between WebSocket clients and a
//! mobile robot.
//!
//! Clients send logical drive commands (`forward`, `stop`, ...) and mode
//! switches. The bridge maps each command to a single byte and publishes it
//! on every active transport: a rosbridge pub/sub link, a serial line, or
//! both. In the other direction it pushes the most recent sensor readings
//! back to each client at a fixed interval, preferring ROS data over serial.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS sessions (ws/)        one task per client
//!     ├── REST handlers (api/)     health, status, command, mode
//!     │
//!     ├── BridgeCoordinator (service/)
//!     │       │
//!     │       ├── RosLink     (transport/ros.rs)    rosbridge v2 over WebSocket
//!     │       └── SerialLink  (transport/serial.rs) raw bytes / text lines
//!     │
//!     └── CommandRouter, Telemetry (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod transport;
pub mod ws;
