//! Transport abstraction for message-oriented connections
//!
//! Separates I/O concerns from connection lifecycle:
//! - **Transport**: how text frames flow (WebSocket, test doubles...)
//! - **ConnectionManager**: when to connect, what to send, when to retry
//!
//! A transport reports everything through events, the way a browser-style
//! socket does: `Open` once connected, `Message` per inbound frame, `Error`
//! on failure, and exactly one `Close` when the connection is gone (including
//! when it never opened).

pub mod websocket;

pub use websocket::WebSocketTransport;

use tokio::sync::mpsc;

/// Lifecycle and data events emitted by a spawned connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established, outbound frames are now delivered
    Open,
    /// Inbound text frame
    Message(String),
    /// Transport failure description. A `Close` normally follows.
    Error(String),
    /// Connection is gone. Last event of a connection.
    Close,
}

/// Channels for one spawned connection
///
/// Dropping `tx` asks the transport to close the connection.
pub struct TransportChannels {
    /// Lifecycle and inbound data events
    ///
    /// Returns `None` once the transport task has finished.
    pub events: mpsc::Receiver<TransportEvent>,

    /// Outbound text frames
    pub tx: mpsc::Sender<String>,
}

/// Trait for connection factories
///
/// # Lifecycle
///
/// 1. `spawn()` returns immediately with channels; connecting happens in background
/// 2. `Open` arrives on success, or `Error` + `Close` on failure
/// 3. Frames sent on `tx` are written while the connection is open
/// 4. `Close` is emitted once, after which the channels are dead
///
/// A transport does NOT handle:
/// - Reconnection (that's the manager's job)
/// - Frame contents (colors and notifications are encoded elsewhere)
pub trait Transport: Send + Sync + 'static {
    /// Start connecting to `endpoint` in background
    fn spawn(&self, endpoint: &str) -> TransportChannels;
}
