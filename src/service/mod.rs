//! Service layer: the coordinator that sits between sessions and links.

pub mod bridge_coordinator;

pub use bridge_coordinator::{BridgeCoordinator, DispatchReport, TransportStatus};
