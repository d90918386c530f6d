//! Handles: the live connection owned by the manager, and the cloneable
//! control handle given to consumers.

use crate::color::{Color, Rgb};
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, OwnedPermit};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Phase of the live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlePhase {
    /// Attempt started, not open yet
    Connecting,
    /// Open, frames are delivered
    Open,
    /// Transport reported an error, waiting for its close
    Closing,
}

/// The live connection, owned exclusively by `ConnectionManager`
///
/// Read-only outside the manager: the outbound sender is private.
///
/// When the transport queue is full, only the newest frame is held back and
/// later frames replace it, so the last color picked always goes out last.
#[derive(Debug)]
pub struct ConnectionHandle {
    attempt: u64,
    phase: HandlePhase,
    tx: mpsc::Sender<String>,
    pending: Option<String>,
}

impl ConnectionHandle {
    pub(super) fn new(attempt: u64, tx: mpsc::Sender<String>) -> Self {
        Self {
            attempt,
            phase: HandlePhase::Connecting,
            tx,
            pending: None,
        }
    }

    /// Attempt number that created this connection (starts at 1)
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn phase(&self) -> HandlePhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == HandlePhase::Open
    }

    pub(super) fn set_phase(&mut self, phase: HandlePhase) {
        self.phase = phase;
    }

    /// Frame waiting for room in the transport queue
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Queue a frame without waiting
    ///
    /// A full queue keeps the frame aside, replacing any frame already kept.
    pub(super) fn transmit(&mut self, frame: String) {
        if self.pending.is_some() {
            // Must not overtake the held frame
            self.pending = Some(frame);
            return;
        }
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(frame)) => {
                warn!(attempt = self.attempt, "Outbound queue full, holding latest frame");
                self.pending = Some(frame);
            }
            Err(TrySendError::Closed(_)) => {
                debug!(attempt = self.attempt, "Transport gone, dropping frame")
            }
        }
    }

    pub(super) fn sender(&self) -> mpsc::Sender<String> {
        self.tx.clone()
    }

    /// Hand the held frame to the transport once `permit` frees a slot
    pub(super) fn flush(&mut self, permit: Option<OwnedPermit<String>>) {
        let Some(frame) = self.pending.take() else {
            return;
        };
        match permit {
            Some(permit) => {
                permit.send(frame);
            }
            None => debug!(attempt = self.attempt, "Transport gone, dropping frame"),
        }
    }
}

// =============================================================================
// Manager control handle
// =============================================================================

/// Commands accepted by a running manager
///
/// Picked colors travel separately on a `watch` channel: only the newest
/// one matters, and it can never be crowded out by older picks.
#[derive(Debug)]
pub enum ManagerCommand {
    /// Make sure a connection exists or is being made
    EnsureConnected,
    /// Close the connection and leave the event loop
    Stop,
}

/// Cloneable handle to a running `ConnectionManager`
///
/// Every call returns immediately; nothing waits on the connection.
/// The manager's event loop ends once every handle is dropped.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    tx: mpsc::Sender<ManagerCommand>,
    color_tx: Arc<watch::Sender<Color>>,
}

impl ManagerHandle {
    pub(super) fn new(tx: mpsc::Sender<ManagerCommand>, color_tx: watch::Sender<Color>) -> Self {
        Self {
            tx,
            color_tx: Arc::new(color_tx),
        }
    }

    /// Handle attached to no manager; behaves like one whose manager stopped
    pub(super) fn detached() -> Self {
        let (tx, _) = mpsc::channel(1);
        let (color_tx, _) = watch::channel(Color::from(Rgb::BLACK));
        Self::new(tx, color_tx)
    }

    /// Picker callback: validate `hex` and forward it to the manager
    ///
    /// Invalid input is rejected here and never reaches the transport.
    /// A newer pick replaces one the manager has not handled yet.
    pub fn select_color(&self, hex: &str) -> Result<()> {
        let color = Color::parse(hex)?;
        self.color_tx.send_replace(color);
        Ok(())
    }

    pub fn ensure_connected(&self) {
        self.command(ManagerCommand::EnsureConnected);
    }

    /// Ask the manager to stop and wait until the request is queued
    pub async fn stop(&self) {
        let _ = self.tx.send(ManagerCommand::Stop).await;
    }

    /// True once the manager's event loop has exited
    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }

    fn command(&self, command: ManagerCommand) {
        if let Err(e) = self.tx.try_send(command) {
            debug!("Manager command dropped: {}", e);
        }
    }
}
