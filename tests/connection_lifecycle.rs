//! Connection lifecycle tests
//!
//! Drives a running `ConnectionManager` through its public handle with a
//! mock transport, so every transport event is under test control.

use color_link::color::Color;
use color_link::connection::ConnectionManager;
use color_link::constants::RECONNECT_DELAY_MS;
use color_link::status::{ConnectionState, StatusPublisher};
use color_link::transport::{Transport, TransportChannels, TransportEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

// =============================================================================
// Mock Transport
// =============================================================================

struct MockConnection {
    events: mpsc::Sender<TransportEvent>,
    outbound: mpsc::Receiver<String>,
}

/// Records every spawned connection; tests play the remote side
#[derive(Clone, Default)]
struct MockTransport {
    connections: Arc<Mutex<Vec<MockConnection>>>,
}

impl MockTransport {
    fn count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Emit an event on connection `index`
    async fn emit(&self, index: usize, event: TransportEvent) {
        let events = self.connections.lock()[index].events.clone();
        events.send(event).await.expect("manager dropped events");
    }

    /// Frames written to connection `index` since the last call
    fn sent(&self, index: usize) -> Vec<String> {
        let mut connections = self.connections.lock();
        let mut frames = Vec::new();
        while let Ok(frame) = connections[index].outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

impl Transport for MockTransport {
    fn spawn(&self, _endpoint: &str) -> TransportChannels {
        let (events_tx, events_rx) = mpsc::channel(16);
        let (out_tx, out_rx) = mpsc::channel(16);
        self.connections.lock().push(MockConnection {
            events: events_tx,
            outbound: out_rx,
        });
        TransportChannels {
            events: events_rx,
            tx: out_tx,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn setup(initial: &str) -> (ConnectionManager<MockTransport>, MockTransport, StatusPublisher) {
    let transport = MockTransport::default();
    let status = StatusPublisher::new();
    let manager = ConnectionManager::new(
        "ws://controller.local:8765",
        Color::parse(initial).unwrap(),
        transport.clone(),
        status.clone(),
    );
    (manager, transport, status)
}

/// Let spawned tasks run without moving the clock
async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_start_connects_once_despite_repeated_requests() {
    let (manager, transport, status) = setup("#ff0000");
    let handle = manager.handle();
    tokio::spawn(manager.run());

    handle.ensure_connected();
    handle.ensure_connected();
    settle().await;

    assert_eq!(transport.count(), 1);
    assert_eq!(status.state(), ConnectionState::Connecting);
}

#[tokio::test]
async fn test_color_picked_while_disconnected_is_sent_once_on_open() {
    let (manager, transport, status) = setup("#ff0000");
    let handle = manager.handle();
    tokio::spawn(manager.run());
    settle().await;

    handle.select_color("#00FF80").unwrap();
    settle().await;
    assert!(transport.sent(0).is_empty());

    transport.emit(0, TransportEvent::Open).await;
    settle().await;

    assert_eq!(transport.sent(0), vec![r#"{"r":0,"g":255,"b":128}"#]);
    assert_eq!(status.state(), ConnectionState::Connected);
    assert_eq!(status.last_message(), "Connected to server");
}

#[tokio::test]
async fn test_invalid_pick_is_rejected_before_the_manager() {
    let (manager, transport, _status) = setup("#123456");
    let handle = manager.handle();
    tokio::spawn(manager.run());
    settle().await;
    transport.emit(0, TransportEvent::Open).await;
    settle().await;
    transport.sent(0);

    assert!(handle.select_color("#GGGGGG").is_err());
    settle().await;
    assert!(transport.sent(0).is_empty());
}

#[tokio::test]
async fn test_inbound_notifications_reach_status() {
    let (manager, transport, status) = setup("#ff0000");
    let _handle = manager.handle();
    tokio::spawn(manager.run());
    settle().await;
    transport.emit(0, TransportEvent::Open).await;

    transport
        .emit(0, TransportEvent::Message(r#"{"message":"ack"}"#.into()))
        .await;
    settle().await;
    assert_eq!(status.last_message(), "ack");

    transport
        .emit(0, TransportEvent::Message("not-json".into()))
        .await;
    settle().await;
    assert!(status.last_message().contains("not-json"));
    assert_eq!(status.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_starts_after_delay_exactly_once() {
    let (manager, transport, status) = setup("#ff0000");
    let _handle = manager.handle();
    tokio::spawn(manager.run());
    settle().await;
    transport.emit(0, TransportEvent::Open).await;
    transport.emit(0, TransportEvent::Close).await;
    settle().await;

    let closed_at = Instant::now();
    assert_eq!(status.state(), ConnectionState::Disconnected);
    assert_eq!(status.last_message(), "Disconnected from server");

    tokio::time::sleep(Duration::from_millis(RECONNECT_DELAY_MS - 1)).await;
    settle().await;
    assert_eq!(transport.count(), 1, "reconnected early");

    tokio::time::sleep(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(transport.count(), 2);
    assert!(closed_at.elapsed() >= Duration::from_millis(RECONNECT_DELAY_MS));
    assert_eq!(status.state(), ConnectionState::Connecting);

    tokio::time::sleep(Duration::from_millis(RECONNECT_DELAY_MS * 6)).await;
    settle().await;
    assert_eq!(transport.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_attempts_retry_forever() {
    let (manager, transport, status) = setup("#ff0000");
    let _handle = manager.handle();
    tokio::spawn(manager.run());
    settle().await;

    for attempt in 0..3 {
        transport
            .emit(attempt, TransportEvent::Error("connection refused".into()))
            .await;
        settle().await;
        assert_eq!(status.state(), ConnectionState::Error);
        assert_eq!(status.last_message(), "WebSocket error: connection refused");

        transport.emit(attempt, TransportEvent::Close).await;
        settle().await;
        tokio::time::sleep(Duration::from_millis(RECONNECT_DELAY_MS)).await;
        settle().await;
        assert_eq!(transport.count(), attempt + 2);
    }
}

#[tokio::test(start_paused = true)]
async fn test_error_without_close_does_not_reconnect() {
    let (manager, transport, status) = setup("#ff0000");
    let handle = manager.handle();
    tokio::spawn(manager.run());
    settle().await;
    transport.emit(0, TransportEvent::Open).await;
    transport
        .emit(0, TransportEvent::Error("broken pipe".into()))
        .await;
    settle().await;

    assert_eq!(status.state(), ConnectionState::Error);

    handle.ensure_connected();
    tokio::time::sleep(Duration::from_millis(RECONNECT_DELAY_MS * 4)).await;
    settle().await;
    assert_eq!(transport.count(), 1);
    assert_eq!(status.state(), ConnectionState::Error);
}

#[tokio::test]
async fn test_burst_of_picks_ends_on_last_pick() {
    let (manager, transport, _status) = setup("#000000");
    let handle = manager.handle();
    tokio::spawn(manager.run());
    settle().await;
    transport.emit(0, TransportEvent::Open).await;
    settle().await;
    transport.sent(0);

    for i in 0..299 {
        handle.select_color(&format!("#{:06x}", i)).unwrap();
    }
    handle.select_color("#ff00ff").unwrap();
    settle().await;

    let frames = transport.sent(0);
    assert_eq!(frames.last().map(String::as_str), Some(r#"{"r":255,"g":0,"b":255}"#));
}

#[tokio::test]
async fn test_slow_transport_still_receives_last_pick() {
    let (manager, transport, _status) = setup("#000000");
    let handle = manager.handle();
    tokio::spawn(manager.run());
    settle().await;
    transport.emit(0, TransportEvent::Open).await;
    settle().await;

    // Nobody drains the outbound queue while picks arrive
    for i in 1..40 {
        handle.select_color(&format!("#0000{:02x}", i)).unwrap();
        settle().await;
    }
    handle.select_color("#ff00ff").unwrap();
    settle().await;

    let mut frames = transport.sent(0);
    assert_eq!(frames.len(), 16);
    settle().await;
    frames.extend(transport.sent(0));

    assert_eq!(frames.len(), 17);
    assert_eq!(frames.last().map(String::as_str), Some(r#"{"r":255,"g":0,"b":255}"#));
}

#[tokio::test]
async fn test_dropping_every_handle_ends_the_manager() {
    let (manager, transport, status) = setup("#ff0000");
    let handle = manager.handle();
    let other = handle.clone();
    let task = tokio::spawn(manager.run());
    settle().await;
    transport.emit(0, TransportEvent::Open).await;
    settle().await;

    drop(handle);
    settle().await;
    assert!(!task.is_finished());

    drop(other);
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("manager kept running")
        .unwrap();
    assert_eq!(status.state(), ConnectionState::Disconnected);
    assert_eq!(status.last_message(), "Stopped");
}

#[tokio::test]
async fn test_stop_closes_connection() {
    let (manager, transport, status) = setup("#ff0000");
    let handle = manager.handle();
    let task = tokio::spawn(manager.run());
    settle().await;
    transport.emit(0, TransportEvent::Open).await;
    settle().await;

    handle.stop().await;
    task.await.unwrap();

    assert!(handle.is_stopped());
    assert_eq!(status.state(), ConnectionState::Disconnected);
    // Outbound sender dropped with the handle
    transport.sent(0);
    let closed = transport.connections.lock()[0].outbound.try_recv();
    assert!(matches!(
        closed,
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
}
