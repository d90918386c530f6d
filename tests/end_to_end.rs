//! End-to-end tests: real controller server, real WebSocket client

use color_link::color::{Color, Rgb};
use color_link::connection::ConnectionManager;
use color_link::controller::{ControllerServer, LoggingStrip};
use color_link::status::{ConnectionState, StatusPublisher};
use color_link::transport::WebSocketTransport;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// Poll `condition` until it holds or 5 s pass
async fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for {}", what);
}

type SharedStrip = Arc<parking_lot::Mutex<LoggingStrip>>;

async fn start_server(leds: usize) -> (String, SharedStrip, Arc<AtomicBool>) {
    let server = ControllerServer::bind(
        "127.0.0.1:0",
        Duration::from_millis(10),
        LoggingStrip::new(leds, 1.0),
    )
    .await
    .unwrap();
    let endpoint = format!("ws://{}", server.local_addr());
    let strip = server.strip();
    let shutdown = Arc::new(AtomicBool::new(false));
    tokio::spawn(server.run(shutdown.clone()));
    (endpoint, strip, shutdown)
}

#[tokio::test]
async fn test_colors_reach_the_strip() {
    let (endpoint, strip, shutdown) = start_server(4).await;

    let status = StatusPublisher::new();
    let manager = ConnectionManager::new(
        endpoint,
        Color::parse("#00FF80").unwrap(),
        WebSocketTransport::new(),
        status.clone(),
    );
    let handle = manager.handle();
    let task = tokio::spawn(manager.run());

    // Initial sync on open, acknowledged by the controller
    wait_for("initial sync ack", || {
        status.last_message() == "LED update queued: RGB: (0, 255, 128)"
    })
    .await;
    assert_eq!(status.state(), ConnectionState::Connected);
    wait_for("strip update", || {
        strip.lock().shown() == [Rgb::new(0, 255, 128); 4]
    })
    .await;

    handle.select_color("#0000ff").unwrap();
    wait_for("second color", || {
        strip.lock().shown() == [Rgb::new(0, 0, 255); 4]
    })
    .await;

    // Controller going away shows up as a disconnect
    shutdown.store(true, Ordering::SeqCst);
    wait_for("disconnect", || status.state() == ConnectionState::Disconnected).await;
    wait_for("strip off", || strip.lock().shown() == [Rgb::BLACK; 4]).await;

    handle.stop().await;
    task.await.unwrap();
}

/// Send one frame and return the controller's JSON reply
async fn exchange(
    ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
    text: &str,
) -> serde_json::Value {
    ws.send(Message::Text(text.to_string().into())).await.unwrap();
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(reply))) => return serde_json::from_str(reply.as_str()).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_controller_replies_to_bad_frames() {
    let (endpoint, strip, shutdown) = start_server(2).await;
    let (mut ws, _) = connect_async(endpoint.as_str()).await.unwrap();

    let invalid = exchange(&mut ws, "not-json").await;
    assert_eq!(invalid["status"], "error");
    assert_eq!(invalid["message"], "Invalid JSON format");

    let missing = exchange(&mut ws, r#"{"r":1}"#).await;
    assert_eq!(missing["message"], "Missing RGB values");

    let clamped = exchange(&mut ws, r#"{"r":300,"g":-5,"b":"7"}"#).await;
    assert_eq!(clamped["status"], "success");
    assert_eq!(clamped["message"], "LED update queued: RGB: (255, 0, 7)");

    wait_for("clamped color", || strip.lock().shown() == [Rgb::new(255, 0, 7); 2]).await;
    shutdown.store(true, Ordering::SeqCst);
}
