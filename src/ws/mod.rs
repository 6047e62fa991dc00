//! WebSocket layer: client sessions, message parsing, session tracking.
//!
//! The endpoint at `/ws` accepts drive commands and mode switches from a
//! client and pushes the latest telemetry back at a fixed interval.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod tracker;

pub use connection::{ConnectionSession, SessionState};
pub use messages::{ClientMessage, ServerMessage, parse_client_message};
pub use tracker::{SessionGuard, SessionTracker};
