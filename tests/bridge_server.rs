//! End-to-end tests: REST and WebSocket clients against a served bridge
//! backed by in-memory links.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use dobi_bridge::app_state::AppState;
use dobi_bridge::domain::{ByteCommand, CommandRouter, ControlMode, Telemetry};
use dobi_bridge::server::build_app;
use dobi_bridge::service::BridgeCoordinator;
use dobi_bridge::transport::{MemoryLink, TransportKind, TransportLink};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Bridge {
    addr: SocketAddr,
    ros: Arc<MemoryLink>,
    serial: Arc<MemoryLink>,
}

async fn serve(coordinator: BridgeCoordinator, interval: Duration) -> SocketAddr {
    let state = AppState::new(Arc::new(coordinator), interval);
    let app = build_app(state, Duration::from_secs(5));
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn spawn_bridge(interval: Duration) -> Bridge {
    let ros = Arc::new(MemoryLink::new(TransportKind::Ros));
    let serial = Arc::new(MemoryLink::new(TransportKind::Serial));
    let coordinator = BridgeCoordinator::from_links(
        ControlMode::Both,
        CommandRouter::default(),
        Some(Arc::clone(&ros) as Arc<dyn TransportLink>),
        Some(Arc::clone(&serial) as Arc<dyn TransportLink>),
    );
    let addr = serve(coordinator, interval).await;
    Bridge { addr, ros, serial }
}

async fn connect(addr: SocketAddr) -> Client {
    let Ok((client, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await else {
        panic!("ws connect failed");
    };
    client
}

async fn next_telemetry(client: &mut Client) -> Value {
    loop {
        let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_secs(2), client.next()).await
        else {
            panic!("no frame from bridge");
        };
        if let Message::Text(text) = msg {
            let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                panic!("frame is not json");
            };
            assert_eq!(value.get("type").and_then(Value::as_str), Some("telemetry"));
            return value;
        }
    }
}

async fn get_json(url: String) -> (u16, Value) {
    let Ok(response) = reqwest::get(url).await else {
        panic!("request failed");
    };
    let status = response.status().as_u16();
    let Ok(body) = response.json::<Value>().await else {
        panic!("body is not json");
    };
    (status, body)
}

async fn post_json(url: String, body: Value) -> (u16, Value) {
    let Ok(response) = reqwest::Client::new().post(url).json(&body).send().await else {
        panic!("request failed");
    };
    let status = response.status().as_u16();
    let Ok(body) = response.json::<Value>().await else {
        panic!("body is not json");
    };
    (status, body)
}

#[tokio::test]
async fn health_is_ok() {
    let bridge = spawn_bridge(Duration::from_millis(100)).await;
    let (status, body) = get_json(format!("http://{}/health", bridge.addr)).await;
    assert_eq!(status, 200);
    assert_eq!(body.get("status").and_then(Value::as_str), Some("ok"));
}

#[tokio::test]
async fn status_reports_mode_and_links() {
    let bridge = spawn_bridge(Duration::from_millis(100)).await;
    let (status, body) = get_json(format!("http://{}/api/v1/status", bridge.addr)).await;
    assert_eq!(status, 200);
    assert_eq!(body.get("mode").and_then(Value::as_str), Some("both"));
    assert_eq!(
        body.get("transports"),
        Some(&json!([
            {"kind": "ros", "available": true},
            {"kind": "serial", "available": true},
        ]))
    );
    assert_eq!(body.get("active_sessions").and_then(Value::as_u64), Some(0));
}

#[tokio::test]
async fn rest_command_reaches_both_links() {
    let bridge = spawn_bridge(Duration::from_millis(100)).await;
    let (status, body) = post_json(
        format!("http://{}/api/v1/command", bridge.addr),
        json!({"command": "backward"}),
    )
    .await;
    assert_eq!(status, 202);
    assert_eq!(body, json!({"delivered": 2, "failed": 0}));
    assert_eq!(bridge.ros.commands().await, vec![ByteCommand::new(b's')]);
    assert_eq!(bridge.serial.commands().await, vec![ByteCommand::new(b's')]);
}

#[tokio::test]
async fn rest_rejects_empty_command_and_blank_mode() {
    let bridge = spawn_bridge(Duration::from_millis(100)).await;
    let (status, body) = post_json(
        format!("http://{}/api/v1/command", bridge.addr),
        json!({"command": ""}),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body.pointer("/error/code").is_some());

    let (status, _) = post_json(
        format!("http://{}/api/v1/mode", bridge.addr),
        json!({"mode": "  "}),
    )
    .await;
    assert_eq!(status, 400);
    assert!(bridge.ros.modes().await.is_empty());
}

#[tokio::test]
async fn rest_command_without_links_is_unavailable() {
    let coordinator =
        BridgeCoordinator::from_links(ControlMode::Ros, CommandRouter::default(), None, None);
    let addr = serve(coordinator, Duration::from_millis(100)).await;
    let (status, _) = post_json(
        format!("http://{addr}/api/v1/command"),
        json!({"command": "stop"}),
    )
    .await;
    assert_eq!(status, 503);
}

#[tokio::test]
async fn ws_forward_becomes_w_on_every_link() {
    let bridge = spawn_bridge(Duration::from_secs(30)).await;
    let mut client = connect(bridge.addr).await;

    let sent = client
        .send(Message::text(r#"{"type":"command","data":"forward"}"#))
        .await;
    assert!(sent.is_ok());
    let frame = next_telemetry(&mut client).await;
    assert!(frame.get("data").is_some_and(Value::is_null));

    assert_eq!(bridge.ros.commands().await, vec![ByteCommand::new(b'w')]);
    assert_eq!(bridge.serial.commands().await, vec![ByteCommand::new(b'w')]);
    let _ = client.close(None).await;
}

#[tokio::test]
async fn ws_pushes_serial_text_when_ros_is_silent() {
    let bridge = spawn_bridge(Duration::from_millis(50)).await;
    bridge
        .serial
        .set_telemetry(Some(Telemetry::Raw("L:12 R:30".to_string())))
        .await;
    let mut client = connect(bridge.addr).await;

    let frame = next_telemetry(&mut client).await;
    assert_eq!(frame.get("data").and_then(Value::as_str), Some("L:12 R:30"));
    let _ = client.close(None).await;
}

#[tokio::test]
async fn ws_malformed_message_does_not_close_session() {
    let bridge = spawn_bridge(Duration::from_secs(30)).await;
    let mut client = connect(bridge.addr).await;

    assert!(client.send(Message::text("{oops")).await.is_ok());
    let _ = next_telemetry(&mut client).await;

    assert!(
        client
            .send(Message::text(r#"{"type":"command","data":"stop"}"#))
            .await
            .is_ok()
    );
    let _ = next_telemetry(&mut client).await;
    assert_eq!(bridge.ros.commands().await, vec![ByteCommand::new(b'x')]);
    let _ = client.close(None).await;
}

#[tokio::test]
async fn ws_sessions_are_independent() {
    let bridge = spawn_bridge(Duration::from_millis(50)).await;
    let mut first = connect(bridge.addr).await;
    let mut second = connect(bridge.addr).await;
    let _ = next_telemetry(&mut first).await;
    let _ = next_telemetry(&mut second).await;

    let _ = first.close(None).await;
    drop(first);

    for _ in 0..3 {
        let _ = next_telemetry(&mut second).await;
    }

    let mut active = None;
    for _ in 0..40 {
        let (_, body) = get_json(format!("http://{}/api/v1/status", bridge.addr)).await;
        active = body.get("active_sessions").and_then(Value::as_u64);
        if active == Some(1) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(active, Some(1));
    let _ = second.close(None).await;
}
