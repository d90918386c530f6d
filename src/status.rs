//! Connection status signal
//!
//! Maps the connection state to a status label and color cue, and keeps the
//! most recent notification (inbound or manager-generated) for display.
//! Consumers observe changes through a `watch` receiver.

use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Connection state, one per manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Color cue shown next to the status label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Green,
    Orange,
    Red,
}

impl Indicator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Red => "red",
        }
    }
}

/// Status color for a connection state
pub fn indicator(state: ConnectionState) -> Indicator {
    match state {
        ConnectionState::Connected => Indicator::Green,
        ConnectionState::Connecting => Indicator::Orange,
        ConnectionState::Error | ConnectionState::Disconnected => Indicator::Red,
    }
}

// =============================================================================
// Inbound notifications
// =============================================================================

/// Text frame received from the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundNotification {
    /// `{"message": "..."}`
    Message(String),
    /// Anything else, kept verbatim
    Raw(String),
}

impl InboundNotification {
    /// Classify a payload. Never fails: unknown shapes become `Raw`.
    pub fn parse(payload: &str) -> Self {
        let object = serde_json::from_str::<Map<String, Value>>(payload).ok();
        match object.as_ref().and_then(|o| o.get("message")).and_then(Value::as_str) {
            Some(message) => Self::Message(message.to_string()),
            None => Self::Raw(payload.to_string()),
        }
    }

    pub fn display_text(&self) -> String {
        match self {
            Self::Message(message) => message.clone(),
            Self::Raw(raw) => format!("Received: {}", raw),
        }
    }
}

// =============================================================================
// Publisher
// =============================================================================

/// Current status as seen by observers
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    pub last_message: String,
    pub updated_at: DateTime<Local>,
}

impl StatusSnapshot {
    pub fn indicator(&self) -> Indicator {
        indicator(self.state)
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_message: String::new(),
            updated_at: Local::now(),
        }
    }
}

/// Publishes connection state and the last notification
///
/// Cloning shares the same underlying signal.
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    tx: Arc<watch::Sender<StatusSnapshot>>,
}

impl StatusPublisher {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StatusSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.tx.borrow().state
    }

    pub fn last_message(&self) -> String {
        self.tx.borrow().last_message.clone()
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.tx.send_if_modified(|status| {
            if status.state == state {
                return false;
            }
            status.state = state;
            status.updated_at = Local::now();
            true
        });
    }

    pub fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|status| {
            status.last_message = message;
            status.updated_at = Local::now();
        });
    }

    /// Record an inbound notification as the last message
    pub fn notify(&self, notification: &InboundNotification) {
        self.set_message(notification.display_text());
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
