//! In-process transport link.
//!
//! [`MemoryLink`] records every command and mode it is given and serves
//! whatever telemetry was last injected. It can be switched into a failing
//! state to exercise the coordinator's failure isolation, or slowed down
//! to hold a call in flight.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{TransportKind, TransportLink};
use crate::domain::{ByteCommand, Telemetry};
use crate::error::BridgeError;

#[derive(Debug, Default)]
struct Recorded {
    commands: Vec<ByteCommand>,
    modes: Vec<String>,
    telemetry: Option<Telemetry>,
}

/// Link that keeps everything in memory.
#[derive(Debug)]
pub struct MemoryLink {
    kind: TransportKind,
    state: Mutex<Recorded>,
    failing: AtomicBool,
    latency_ms: AtomicU64,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    calls_after_close: AtomicUsize,
}

impl MemoryLink {
    /// Creates an empty, healthy link reporting itself as `kind`.
    #[must_use]
    pub fn new(kind: TransportKind) -> Self {
        Self {
            kind,
            state: Mutex::new(Recorded::default()),
            failing: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            calls_after_close: AtomicUsize::new(0),
        }
    }

    /// Makes every subsequent operation fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delays every publish by `latency` before it takes effect.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Replaces the telemetry returned by `read_latest_telemetry`.
    pub async fn set_telemetry(&self, telemetry: Option<Telemetry>) {
        self.state.lock().await.telemetry = telemetry;
    }

    /// Commands received so far, oldest first.
    pub async fn commands(&self) -> Vec<ByteCommand> {
        self.state.lock().await.commands.clone()
    }

    /// Mode strings received so far, oldest first.
    pub async fn modes(&self) -> Vec<String> {
        self.state.lock().await.modes.clone()
    }

    /// Number of times `close` was called.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Publish or read calls that reached the link after it was closed.
    #[must_use]
    pub fn calls_after_close(&self) -> usize {
        self.calls_after_close.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        let millis = self.latency_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    fn check(&self) -> Result<(), BridgeError> {
        if self.closed.load(Ordering::SeqCst) {
            self.calls_after_close.fetch_add(1, Ordering::SeqCst);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(BridgeError::Publish {
                transport: self.kind.as_str(),
                reason: "injected failure".to_string(),
            });
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::TransportUnavailable {
                transport: self.kind.as_str(),
                reason: "closed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TransportLink for MemoryLink {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn publish_command(&self, command: ByteCommand) -> Result<(), BridgeError> {
        self.delay().await;
        self.check()?;
        self.state.lock().await.commands.push(command);
        Ok(())
    }

    async fn publish_mode(&self, mode: &str) -> Result<(), BridgeError> {
        self.delay().await;
        self.check()?;
        self.state.lock().await.modes.push(mode.to_string());
        Ok(())
    }

    async fn read_latest_telemetry(&self) -> Result<Option<Telemetry>, BridgeError> {
        self.check()?;
        Ok(self.state.lock().await.telemetry.clone())
    }

    async fn close(&self) -> Result<(), BridgeError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(BridgeError::Internal("injected close failure".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn records_commands_and_modes() {
        let link = MemoryLink::new(TransportKind::Serial);
        assert_ok!(link.publish_command(ByteCommand::new(b'w')).await);
        assert_ok!(link.publish_mode("auto").await);

        assert_eq!(link.commands().await, vec![ByteCommand::new(b'w')]);
        assert_eq!(link.modes().await, vec!["auto".to_string()]);
    }

    #[tokio::test]
    async fn failing_link_rejects_calls() {
        let link = MemoryLink::new(TransportKind::Ros);
        link.set_failing(true);
        assert_err!(link.publish_command(ByteCommand::new(b'x')).await);
        assert!(link.commands().await.is_empty());
    }

    #[tokio::test]
    async fn closed_link_is_unavailable() {
        let link = MemoryLink::new(TransportKind::Ros);
        assert_ok!(link.close().await);
        assert!(!link.is_available());
        assert!(matches!(
            link.read_latest_telemetry().await,
            Err(BridgeError::TransportUnavailable { .. })
        ));
        assert_eq!(link.calls_after_close(), 1);
    }

    #[tokio::test]
    async fn latency_holds_publish_in_flight() {
        let link = MemoryLink::new(TransportKind::Serial);
        link.set_latency(Duration::from_millis(50));
        let started = tokio::time::Instant::now();
        assert_ok!(link.publish_command(ByteCommand::new(b'x')).await);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(link.calls_after_close(), 0);
    }
}
