//! rosbridge pub/sub transport link.
//!
//! [`RosLink`] talks to a ROS 2 graph through a `rosbridge_server`
//! WebSocket using the rosbridge v2 JSON protocol:
//!
//! * **Outbound** – drive commands are published as `std_msgs/msg/Char`
//!   on the command topic, mode switches as `std_msgs/msg/String` on the
//!   mode topic. Both topics are advertised on connect.
//!
//! * **Inbound** – the two ultrasonic `std_msgs/msg/Float32` topics and
//!   the `sensor_msgs/msg/Imu` topic are subscribed on connect. A
//!   background pump applies each `publish` frame to a shared
//!   [`TelemetrySnapshot`], one field per topic.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::{TransportKind, TransportLink};
use crate::config::RosConfig;
use crate::domain::{ByteCommand, ImuReading, SensorUpdate, Telemetry, TelemetrySnapshot};
use crate::error::BridgeError;

/// How long the pump waits for a frame before re-checking its running flag.
const PUMP_POLL: Duration = Duration::from_millis(20);

/// Upper bound on waiting for the pump to exit during `close`.
const PUMP_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

const TRANSPORT: &str = "ros";

const CHAR_TYPE: &str = "std_msgs/msg/Char";
const STRING_TYPE: &str = "std_msgs/msg/String";
const FLOAT32_TYPE: &str = "std_msgs/msg/Float32";
const IMU_TYPE: &str = "sensor_msgs/msg/Imu";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Topic names the link publishes to and subscribes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosTopics {
    /// Drive command topic.
    pub command: String,
    /// Mode switch topic.
    pub mode: String,
    /// Left ultrasonic range topic.
    pub ultrasonic_left: String,
    /// Right ultrasonic range topic.
    pub ultrasonic_right: String,
    /// IMU topic.
    pub imu: String,
}

impl From<&RosConfig> for RosTopics {
    fn from(config: &RosConfig) -> Self {
        Self {
            command: config.command_topic.clone(),
            mode: config.mode_topic.clone(),
            ultrasonic_left: config.ultrasonic_left_topic.clone(),
            ultrasonic_right: config.ultrasonic_right_topic.clone(),
            imu: config.imu_topic.clone(),
        }
    }
}

/// Frames sent right after connecting: advertise both outbound topics,
/// subscribe to every sensor topic.
fn handshake_frames(topics: &RosTopics, queue_depth: u32) -> Vec<serde_json::Value> {
    let subscribe = |topic: &str, msg_type: &str| {
        json!({
            "op": "subscribe",
            "topic": topic,
            "type": msg_type,
            "queue_length": queue_depth
        })
    };
    vec![
        json!({ "op": "advertise", "topic": topics.command, "type": CHAR_TYPE }),
        json!({ "op": "advertise", "topic": topics.mode, "type": STRING_TYPE }),
        subscribe(&topics.ultrasonic_left, FLOAT32_TYPE),
        subscribe(&topics.ultrasonic_right, FLOAT32_TYPE),
        subscribe(&topics.imu, IMU_TYPE),
    ]
}

#[derive(Debug, Deserialize)]
struct IncomingFrame {
    op: String,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    msg: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ScalarMsg {
    data: f64,
}

/// Parses one rosbridge frame into a sensor update.
///
/// Returns `Ok(None)` for frames that are not a `publish` on a sensor
/// topic.
fn parse_sensor_update(
    topics: &RosTopics,
    text: &str,
) -> Result<Option<SensorUpdate>, BridgeError> {
    let frame: IncomingFrame = serde_json::from_str(text)?;
    if frame.op != "publish" {
        return Ok(None);
    }
    let (Some(topic), Some(msg)) = (frame.topic, frame.msg) else {
        return Ok(None);
    };

    let update = if topic == topics.ultrasonic_left {
        SensorUpdate::UltrasonicLeft(serde_json::from_value::<ScalarMsg>(msg)?.data)
    } else if topic == topics.ultrasonic_right {
        SensorUpdate::UltrasonicRight(serde_json::from_value::<ScalarMsg>(msg)?.data)
    } else if topic == topics.imu {
        SensorUpdate::Imu(serde_json::from_value::<ImuReading>(msg)?)
    } else {
        return Ok(None);
    };
    Ok(Some(update))
}

/// Reads frames until the running flag drops or the socket closes.
async fn run_pump(
    mut source: WsSource,
    topics: RosTopics,
    snapshot: Arc<RwLock<TelemetrySnapshot>>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Acquire) {
        let Ok(next) = tokio::time::timeout(PUMP_POLL, source.next()).await else {
            continue;
        };
        match next {
            Some(Ok(Message::Text(text))) => match parse_sensor_update(&topics, text.as_str()) {
                Ok(Some(update)) => snapshot.write().await.apply(update),
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "ignoring rosbridge frame"),
            },
            Some(Ok(Message::Close(_))) | None => {
                tracing::warn!("rosbridge closed the connection");
                break;
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "rosbridge receive failed");
                break;
            }
            Some(Ok(_)) => {}
        }
    }
    running.store(false, Ordering::Release);
    tracing::debug!("rosbridge pump stopped");
}

fn unavailable(reason: impl Into<String>) -> BridgeError {
    BridgeError::TransportUnavailable {
        transport: TRANSPORT,
        reason: reason.into(),
    }
}

/// Link to the robot through a `rosbridge_server`.
pub struct RosLink {
    url: String,
    topics: RosTopics,
    sink: Mutex<WsSink>,
    snapshot: Arc<RwLock<TelemetrySnapshot>>,
    running: Arc<AtomicBool>,
    pump: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl fmt::Debug for RosLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RosLink")
            .field("url", &self.url)
            .field("topics", &self.topics)
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RosLink {
    /// Connects to the rosbridge server, advertises and subscribes, and
    /// starts the background pump.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::TransportUnavailable`] if the server cannot be
    /// reached within the configured timeout or the handshake frames cannot
    /// be sent.
    pub async fn connect(config: &RosConfig) -> Result<Self, BridgeError> {
        let (stream, _response) =
            tokio::time::timeout(config.connect_timeout, connect_async(config.url.as_str()))
                .await
                .map_err(|_| unavailable(format!("connect to {} timed out", config.url)))?
                .map_err(|e| unavailable(format!("connect to {}: {e}", config.url)))?;

        let topics = RosTopics::from(config);
        let (mut sink, source) = stream.split();
        for frame in handshake_frames(&topics, config.queue_depth) {
            sink.send(Message::text(frame.to_string()))
                .await
                .map_err(|e| unavailable(format!("handshake with {}: {e}", config.url)))?;
        }

        let snapshot = Arc::new(RwLock::new(TelemetrySnapshot::default()));
        let running = Arc::new(AtomicBool::new(true));
        let pump = tokio::spawn(run_pump(
            source,
            topics.clone(),
            Arc::clone(&snapshot),
            Arc::clone(&running),
        ));

        tracing::info!(url = %config.url, "rosbridge link connected");
        Ok(Self {
            url: config.url.clone(),
            topics,
            sink: Mutex::new(sink),
            snapshot,
            running,
            pump: Mutex::new(Some(pump)),
            closed: AtomicBool::new(false),
        })
    }

    async fn publish(&self, topic: &str, msg: serde_json::Value) -> Result<(), BridgeError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(unavailable("link closed"));
        }
        let frame = json!({ "op": "publish", "topic": topic, "msg": msg });
        let mut sink = self.sink.lock().await;
        sink.send(Message::text(frame.to_string()))
            .await
            .map_err(|e| BridgeError::Publish {
                transport: TRANSPORT,
                reason: e.to_string(),
            })
    }
}

impl Drop for RosLink {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[async_trait]
impl TransportLink for RosLink {
    fn kind(&self) -> TransportKind {
        TransportKind::Ros
    }

    fn is_available(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.closed.load(Ordering::Acquire)
    }

    async fn publish_command(&self, command: ByteCommand) -> Result<(), BridgeError> {
        self.publish(&self.topics.command, json!({ "data": command.byte() }))
            .await
    }

    async fn publish_mode(&self, mode: &str) -> Result<(), BridgeError> {
        self.publish(&self.topics.mode, json!({ "data": mode })).await
    }

    async fn read_latest_telemetry(&self) -> Result<Option<Telemetry>, BridgeError> {
        if !self.is_available() {
            return Err(unavailable("rosbridge connection lost"));
        }
        // Deliberately `None` rather than an all-null snapshot until some
        // sensor topic has reported; the coordinator then falls through to
        // the serial link.
        let snapshot = *self.snapshot.read().await;
        Ok((!snapshot.is_empty()).then_some(Telemetry::Snapshot(snapshot)))
    }

    async fn close(&self) -> Result<(), BridgeError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.running.store(false, Ordering::Release);

        if let Some(pump) = self.pump.lock().await.take()
            && tokio::time::timeout(PUMP_JOIN_TIMEOUT, pump).await.is_err()
        {
            tracing::warn!("rosbridge pump did not stop in time");
        }

        let mut sink = self.sink.lock().await;
        match sink.close().await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                tracing::info!(url = %self.url, "rosbridge link closed");
                Ok(())
            }
            Err(e) => Err(BridgeError::Internal(format!("rosbridge close: {e}"))),
        }
    }
}
