//! Bridge coordinator: one logical command API over every active link.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::join_all;
use serde::Serialize;

use crate::config::BridgeConfig;
use crate::domain::{CommandRouter, ControlMode, Telemetry};
use crate::error::BridgeError;
use crate::transport::{RosLink, SerialLink, TransportKind, TransportLink};

/// Outcome of fanning one command or mode switch out to the links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Links that accepted the call.
    pub delivered: usize,
    /// Links whose call failed.
    pub failed: usize,
}

/// Availability of one configured link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransportStatus {
    /// Which link.
    pub kind: TransportKind,
    /// Whether its channel is currently open.
    pub available: bool,
}

/// Owns the process's transport links and composes calls over them.
///
/// Exactly one coordinator exists per process. It is shared behind an
/// [`Arc`] by every session and needs no lock of its own: each link
/// serializes access to its own channel, and every coordinator call is a
/// self-contained composition of link calls.
///
/// # Failure isolation
///
/// Each link call is awaited independently. A failing link is logged and
/// counted in the [`DispatchReport`]; it never stops the call reaching the
/// other link.
#[derive(Debug)]
pub struct BridgeCoordinator {
    mode: ControlMode,
    router: CommandRouter,
    ros: Option<Arc<dyn TransportLink>>,
    serial: Option<Arc<dyn TransportLink>>,
    closed: AtomicBool,
}

impl BridgeCoordinator {
    /// Builds the links the configured mode asks for.
    ///
    /// Construction is best-effort: a ROS link that cannot connect is left
    /// out, a serial device that cannot be opened yields an unavailable
    /// serial link. Neither failure affects the other link.
    pub async fn connect(config: &BridgeConfig) -> Self {
        let mode = config.control_mode;

        let ros = if mode.uses_ros() {
            match RosLink::connect(&config.ros).await {
                Ok(link) => Some(Arc::new(link) as Arc<dyn TransportLink>),
                Err(e) => {
                    tracing::warn!(error = %e, "ros link unavailable, continuing without it");
                    None
                }
            }
        } else {
            None
        };

        let serial = if mode.uses_serial() {
            Some(Arc::new(SerialLink::open(&config.serial)) as Arc<dyn TransportLink>)
        } else {
            None
        };

        let coordinator = Self::from_links(
            mode,
            CommandRouter::new(config.command_map.clone()),
            ros,
            serial,
        );
        tracing::info!(
            mode = %mode,
            transports = ?coordinator.transports(),
            "bridge coordinator ready"
        );
        coordinator
    }

    /// Assembles a coordinator from already-built links.
    #[must_use]
    pub fn from_links(
        mode: ControlMode,
        router: CommandRouter,
        ros: Option<Arc<dyn TransportLink>>,
        serial: Option<Arc<dyn TransportLink>>,
    ) -> Self {
        Self {
            mode,
            router,
            ros,
            serial,
            closed: AtomicBool::new(false),
        }
    }

    /// The configured control mode.
    #[must_use]
    pub const fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Status of each link that was constructed.
    #[must_use]
    pub fn transports(&self) -> Vec<TransportStatus> {
        self.links()
            .map(|link| TransportStatus {
                kind: link.kind(),
                available: link.is_available(),
            })
            .collect()
    }

    fn links(&self) -> impl Iterator<Item = &Arc<dyn TransportLink>> {
        self.ros.iter().chain(self.serial.iter())
    }

    /// Routes a logical command and sends it on every link.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NoTransport`] if no link was constructed, or
    /// [`BridgeError::InvalidCommand`] if the command cannot be encoded.
    /// Per-link failures are not errors; they are counted in the report.
    pub async fn publish_command(&self, logical: &str) -> Result<DispatchReport, BridgeError> {
        if self.links().next().is_none() {
            return Err(BridgeError::NoTransport);
        }
        let command = self.router.route(logical)?;

        let results = join_all(self.links().map(|link| async move {
            (link.kind(), link.publish_command(command).await)
        }))
        .await;

        let report = tally("command", results);
        tracing::debug!(logical, %command, ?report, "command dispatched");
        Ok(report)
    }

    /// Sends a mode switch on every link.
    ///
    /// The ROS link publishes it as a string message; the serial link
    /// writes it newline-terminated.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NoTransport`] if no link was constructed.
    pub async fn publish_mode(&self, mode: &str) -> Result<DispatchReport, BridgeError> {
        if self.links().next().is_none() {
            return Err(BridgeError::NoTransport);
        }

        let results = join_all(
            self.links()
                .map(|link| async move { (link.kind(), link.publish_mode(mode).await) }),
        )
        .await;

        let report = tally("mode", results);
        tracing::debug!(mode, ?report, "mode dispatched");
        Ok(report)
    }

    /// Returns the latest telemetry with strict precedence.
    ///
    /// The ROS link wins whenever it exists and has data. Otherwise the
    /// serial link is consulted. The check is made on every call, so a
    /// ROS link that recovers takes over again immediately.
    pub async fn get_latest_data(&self) -> Option<Telemetry> {
        if let Some(ros) = &self.ros {
            match ros.read_latest_telemetry().await {
                Ok(Some(telemetry)) => return Some(telemetry),
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "ros telemetry unavailable"),
            }
        }
        if let Some(serial) = &self.serial {
            match serial.read_latest_telemetry().await {
                Ok(telemetry) => return telemetry,
                Err(e) => tracing::debug!(error = %e, "serial telemetry unavailable"),
            }
        }
        None
    }

    /// Closes every link once.
    ///
    /// Each link is closed independently; a failure is logged and does not
    /// prevent the other link from closing. Later calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for link in self.links() {
            if let Err(e) = link.close().await {
                tracing::warn!(transport = %link.kind(), error = %e, "link close failed");
            }
        }
        tracing::info!("bridge coordinator closed");
    }
}

/// Counts per-link results, logging each failure.
fn tally(what: &str, results: Vec<(TransportKind, Result<(), BridgeError>)>) -> DispatchReport {
    let mut report = DispatchReport::default();
    for (kind, result) in results {
        match result {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(transport = %kind, error = %e, "{what} dispatch failed");
            }
        }
    }
    report
}
