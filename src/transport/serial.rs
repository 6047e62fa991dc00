//! Serial transport link.
//!
//! Commands go out as single raw bytes, mode switches as newline-terminated
//! strings. Telemetry is whatever newline-delimited text the firmware
//! prints; it is read opportunistically and never waited for.
//!
//! A device that cannot be opened does not fail construction: the link
//! starts in an unavailable state and every operation returns
//! [`BridgeError::TransportUnavailable`].

use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serialport::SerialPort;
use tokio::sync::Mutex;

use super::{TransportKind, TransportLink};
use crate::config::SerialConfig;
use crate::domain::{ByteCommand, Telemetry};
use crate::error::BridgeError;

/// Read/write timeout on the device.
const PORT_TIMEOUT: Duration = Duration::from_millis(100);

/// Partial-line input beyond this many bytes is discarded.
const MAX_PENDING_BYTES: usize = 4096;

const TRANSPORT: &str = "serial";

/// Accumulates raw serial bytes and splits them into lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly read bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_PENDING_BYTES && !self.pending.contains(&b'\n') {
            tracing::warn!(
                discarded = self.pending.len(),
                "serial input exceeded line limit without a newline"
            );
            self.pending.clear();
        }
    }

    /// Drains every complete line and returns the most recent non-blank
    /// one, decoded permissively and trimmed.
    ///
    /// Bytes after the last newline stay buffered for the next call.
    pub fn latest_line(&mut self) -> Option<String> {
        let last_newline = self.pending.iter().rposition(|&b| b == b'\n')?;
        let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();
        complete
            .split(|&b| b == b'\n')
            .rev()
            .map(|raw| decode_permissive(raw).trim().to_string())
            .find(|line| !line.is_empty())
    }

    /// Number of buffered bytes not yet part of a complete line.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Decodes UTF-8, dropping invalid byte sequences instead of failing.
fn decode_permissive(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

struct PortState {
    port: Option<Box<dyn SerialPort>>,
    lines: LineBuffer,
}

/// Link to the robot over a serial device.
pub struct SerialLink {
    path: String,
    state: Arc<Mutex<PortState>>,
    available: AtomicBool,
}

impl fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialLink")
            .field("path", &self.path)
            .field("available", &self.is_available())
            .finish_non_exhaustive()
    }
}

impl SerialLink {
    /// Opens the device described by `config` (8N1).
    ///
    /// Never fails: if the device cannot be opened the link is returned in
    /// the unavailable state and the reason is logged.
    #[must_use]
    pub fn open(config: &SerialConfig) -> Self {
        let port = serialport::new(&config.path, config.baud_rate)
            .timeout(PORT_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .open();

        let port = match port {
            Ok(port) => {
                tracing::info!(path = %config.path, baud = config.baud_rate, "serial port opened");
                Some(port)
            }
            Err(e) => {
                tracing::warn!(path = %config.path, error = %e, "serial port open failed");
                None
            }
        };

        Self {
            path: config.path.clone(),
            available: AtomicBool::new(port.is_some()),
            state: Arc::new(Mutex::new(PortState {
                port,
                lines: LineBuffer::new(),
            })),
        }
    }

    /// Runs `op` against the port state on the blocking pool, holding the
    /// link's lock for the duration so reads and writes never interleave.
    async fn with_port<T, F>(&self, op: F) -> Result<T, BridgeError>
    where
        F: FnOnce(&mut PortState) -> Result<T, BridgeError> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || {
            let mut guard = state.blocking_lock();
            op(&mut guard)
        })
        .await
        .map_err(|e| BridgeError::Internal(format!("serial task failed: {e}")))?
    }

    async fn write_bytes(&self, bytes: Vec<u8>) -> Result<(), BridgeError> {
        self.with_port(move |state| {
            let port = state.port.as_mut().ok_or_else(unavailable)?;
            port.write_all(&bytes)
                .and_then(|()| port.flush())
                .map_err(|e| BridgeError::Publish {
                    transport: TRANSPORT,
                    reason: e.to_string(),
                })
        })
        .await
    }
}

fn unavailable() -> BridgeError {
    BridgeError::TransportUnavailable {
        transport: TRANSPORT,
        reason: "device not open".to_string(),
    }
}

fn read_error(e: &dyn std::error::Error) -> BridgeError {
    BridgeError::Read {
        transport: TRANSPORT,
        reason: e.to_string(),
    }
}

#[async_trait]
impl TransportLink for SerialLink {
    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn publish_command(&self, command: ByteCommand) -> Result<(), BridgeError> {
        self.write_bytes(vec![command.byte()]).await
    }

    async fn publish_mode(&self, mode: &str) -> Result<(), BridgeError> {
        self.write_bytes(format!("{mode}\n").into_bytes()).await
    }

    async fn read_latest_telemetry(&self) -> Result<Option<Telemetry>, BridgeError> {
        self.with_port(|state| {
            let port = state.port.as_mut().ok_or_else(unavailable)?;
            let waiting = port.bytes_to_read().map_err(|e| read_error(&e))?;
            if waiting > 0 {
                let len = usize::try_from(waiting)
                    .unwrap_or(MAX_PENDING_BYTES)
                    .min(MAX_PENDING_BYTES);
                let mut buf = vec![0u8; len];
                match port.read(&mut buf) {
                    Ok(n) => {
                        buf.truncate(n);
                        state.lines.push(&buf);
                    }
                    Err(e) if e.kind() == ErrorKind::TimedOut => {}
                    Err(e) => return Err(read_error(&e)),
                }
            }
            Ok(state.lines.latest_line().map(Telemetry::from_serial_line))
        })
        .await
    }

    async fn close(&self) -> Result<(), BridgeError> {
        self.available.store(false, Ordering::SeqCst);
        let path = self.path.clone();
        self.with_port(move |state| {
            if state.port.take().is_some() {
                tracing::info!(%path, "serial port closed");
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn returns_none_without_newline() {
        let mut buf = LineBuffer::new();
        buf.push(b"L:12");
        assert_eq!(buf.latest_line(), None);
        assert_eq!(buf.pending_len(), 4);
    }

    #[test]
    fn completes_line_across_pushes() {
        let mut buf = LineBuffer::new();
        buf.push(b"L:1");
        buf.push(b"2 R:30\r\n");
        assert_eq!(buf.latest_line(), Some("L:12 R:30".to_string()));
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn keeps_latest_complete_line_and_buffers_tail() {
        let mut buf = LineBuffer::new();
        buf.push(b"old\nnew\npart");
        assert_eq!(buf.latest_line(), Some("new".to_string()));
        assert_eq!(buf.pending_len(), 4);
        buf.push(b"ial\n");
        assert_eq!(buf.latest_line(), Some("partial".to_string()));
    }

    #[test]
    fn blank_lines_yield_nothing() {
        let mut buf = LineBuffer::new();
        buf.push(b"  \r\n\n");
        assert_eq!(buf.latest_line(), None);
    }

    #[test]
    fn invalid_utf8_is_dropped() {
        let mut buf = LineBuffer::new();
        buf.push(b"ok\xff\xfe!\n");
        assert_eq!(buf.latest_line(), Some("ok!".to_string()));
    }

    #[test]
    fn oversized_partial_line_is_discarded() {
        let mut buf = LineBuffer::new();
        buf.push(&[b'a'; MAX_PENDING_BYTES + 1]);
        assert_eq!(buf.pending_len(), 0);
    }

    fn missing_device() -> SerialConfig {
        SerialConfig {
            path: "/dev/dobi-bridge-missing-tty".to_string(),
            baud_rate: 115_200,
        }
    }

    #[tokio::test]
    async fn missing_device_degrades_to_unavailable() {
        let link = SerialLink::open(&missing_device());
        assert!(!link.is_available());
        assert_eq!(link.kind(), TransportKind::Serial);

        assert!(matches!(
            link.publish_command(ByteCommand::new(b'x')).await,
            Err(BridgeError::TransportUnavailable { .. })
        ));
        assert!(link.publish_mode("auto").await.is_err());
        assert!(link.read_latest_telemetry().await.is_err());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let link = SerialLink::open(&missing_device());
        assert_ok!(link.close().await);
        assert_ok!(link.close().await);
        assert!(!link.is_available());
    }
}
