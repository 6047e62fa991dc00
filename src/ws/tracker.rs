//! Live-session bookkeeping and shutdown fan-out.
//!
//! Every [`super::connection::ConnectionSession`] registers with the
//! [`SessionTracker`] and holds a [`SessionGuard`] for its lifetime. The
//! tracker also owns a `watch` channel that every session loop selects on,
//! so process shutdown can cancel all loops at once, and can then wait for
//! the live count to reach zero before the transports are closed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Counts live sessions and broadcasts shutdown.
#[derive(Debug)]
pub struct SessionTracker {
    active: watch::Sender<usize>,
    shutdown: watch::Sender<bool>,
}

impl SessionTracker {
    /// Creates a tracker with no sessions.
    #[must_use]
    pub fn new() -> Self {
        let (active, _) = watch::channel(0);
        let (shutdown, _) = watch::channel(false);
        Self { active, shutdown }
    }

    /// Registers one session; it stays counted until the guard drops.
    #[must_use]
    pub fn register(self: &Arc<Self>) -> SessionGuard {
        self.active.send_modify(|n| *n += 1);
        SessionGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Number of live sessions.
    #[must_use]
    pub fn active(&self) -> usize {
        *self.active.borrow()
    }

    /// Waits until every session has ended, for at most `limit`.
    ///
    /// Returns `false` if sessions were still live when `limit` elapsed.
    pub async fn wait_idle(&self, limit: Duration) -> bool {
        let mut active = self.active.subscribe();
        tokio::time::timeout(limit, active.wait_for(|n| *n == 0))
            .await
            .is_ok_and(|changed| changed.is_ok())
    }

    /// Receiver that flips to `true` when shutdown starts.
    #[must_use]
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Signals every session loop to stop.
    pub fn shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!(active = self.active(), "signalled sessions to close");
        }
    }

    /// Returns `true` once [`SessionTracker::shutdown`] has been called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps one session counted while alive.
#[derive(Debug)]
pub struct SessionGuard {
    tracker: Arc<SessionTracker>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.tracker.active.send_modify(|n| *n = n.saturating_sub(1));
    }
}
