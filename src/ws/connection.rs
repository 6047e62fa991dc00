//! Per-client session state machine.
//!
//! ```text
//!   Open ──► AwaitingClientMessage ──(message or interval elapsed)──► SendingTelemetry
//!                   ▲                                                       │
//!                   └──────────────────────(push ok)────────────────────────┘
//!
//!   any state ──(client close, receive error, push failure, shutdown)──► Closed
//! ```
//!
//! Each wait for an inbound message is bounded by the telemetry interval,
//! so a silent client still gets a telemetry frame at least once per
//! interval. A received command is dispatched before the push that follows
//! it. A malformed message is logged and dropped; the session stays open.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::watch;

use super::messages::{ClientMessage, ServerMessage, parse_client_message};
use super::tracker::{SessionGuard, SessionTracker};
use crate::domain::SessionId;
use crate::service::BridgeCoordinator;

/// Lifecycle state of one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upgrade accepted, loop not yet started.
    Open,
    /// Waiting up to one interval for a client message.
    AwaitingClientMessage,
    /// Pushing the latest telemetry.
    SendingTelemetry,
    /// Terminal.
    Closed,
}

/// One connected client.
///
/// Holds a non-owning handle to the coordinator; the coordinator's
/// lifetime belongs to the server. If the coordinator is gone the session
/// closes.
#[derive(Debug)]
pub struct ConnectionSession {
    id: SessionId,
    coordinator: Weak<BridgeCoordinator>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
    state: SessionState,
    _guard: SessionGuard,
}

impl ConnectionSession {
    /// Creates a session registered with `tracker`.
    #[must_use]
    pub fn new(
        coordinator: Weak<BridgeCoordinator>,
        interval: Duration,
        tracker: &Arc<SessionTracker>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            coordinator,
            interval,
            shutdown: tracker.shutdown_signal(),
            state: SessionState::Open,
            _guard: tracker.register(),
        }
    }

    /// Session identifier used in logs.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Drives the session over an upgraded WebSocket.
    pub async fn serve(self, socket: WebSocket) {
        let (ws_tx, ws_rx) = socket.split();
        self.run(ws_tx, ws_rx).await;
    }

    /// Runs the session loop until the client leaves or shutdown starts.
    ///
    /// The outbound half is closed exactly once, on exit.
    pub async fn run<Tx, Rx, E>(mut self, mut ws_tx: Tx, mut ws_rx: Rx)
    where
        Tx: Sink<Message> + Unpin,
        Tx::Error: fmt::Display,
        Rx: Stream<Item = Result<Message, E>> + Unpin,
        E: fmt::Display,
    {
        let interval = self.interval;
        tracing::info!(session_id = %self.id, "session opened");

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            self.transition(SessionState::AwaitingClientMessage);

            let inbound = tokio::select! {
                _ = self.shutdown.changed() => break,
                inbound = tokio::time::timeout(interval, ws_rx.next()) => inbound,
            };

            match inbound {
                Err(_elapsed) => {}
                Ok(Some(Ok(Message::Text(text)))) => self.dispatch(text.as_str()).await,
                Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                    tracing::debug!(session_id = %self.id, "client disconnected");
                    break;
                }
                Ok(Some(Err(e))) => {
                    tracing::debug!(session_id = %self.id, error = %e, "receive failed");
                    break;
                }
                Ok(Some(Ok(_))) => {}
            }

            // Shutdown may have been signalled while a dispatch was in flight.
            if *self.shutdown.borrow() {
                break;
            }
            self.transition(SessionState::SendingTelemetry);
            let Some(coordinator) = self.coordinator.upgrade() else {
                break;
            };
            let frame = ServerMessage::Telemetry(coordinator.get_latest_data().await);
            drop(coordinator);

            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(session_id = %self.id, error = %e, "telemetry encode failed");
                    continue;
                }
            };
            if let Err(e) = ws_tx.send(Message::text(json)).await {
                tracing::debug!(session_id = %self.id, error = %e, "telemetry push failed");
                break;
            }
        }

        self.transition(SessionState::Closed);
        if let Err(e) = ws_tx.close().await {
            tracing::debug!(session_id = %self.id, error = %e, "socket close failed");
        }
        tracing::info!(session_id = %self.id, "session closed");
    }

    async fn dispatch(&self, text: &str) {
        let message = match parse_client_message(text) {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::debug!(session_id = %self.id, "ignoring message of unknown type");
                return;
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "malformed client message");
                return;
            }
        };
        let Some(coordinator) = self.coordinator.upgrade() else {
            return;
        };
        let result = match &message {
            ClientMessage::Command(command) => coordinator.publish_command(command).await,
            ClientMessage::Mode(mode) => coordinator.publish_mode(mode).await,
        };
        match result {
            Ok(report) => tracing::debug!(session_id = %self.id, ?message, ?report, "dispatched"),
            Err(e) => tracing::warn!(session_id = %self.id, ?message, error = %e, "dispatch failed"),
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!(session_id = %self.id, from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}
