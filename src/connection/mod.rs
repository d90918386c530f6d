//! Connection lifecycle manager
//!
//! Owns the single logical connection to the controller and drives it
//! through an explicit state machine:
//!
//! ```text
//! Disconnected --ensure_connected--> Connecting --open--> Connected
//!      ^                                                      |
//!      +---- timer (5 s) ---- Disconnected <----close---------+
//!
//! any state --error--> Error --close--> Disconnected (normal cycle)
//! ```
//!
//! All transitions run on one event loop (`run`), fed by transport events,
//! reconnect timers and consumer commands. The `connecting` guard is set
//! before a transport is spawned and cleared on open, close and error, so
//! a second caller during the connect phase never opens a second connection.
//!
//! A transport error does not schedule a reconnect by itself; only a close
//! does. A transport that errors without ever closing stalls reconnection.
//!
//! Picked colors are latest-wins end to end: consumers publish them on a
//! `watch` channel, and a connection whose outbound queue is full holds back
//! only the newest frame.

mod handle;

pub use handle::{ConnectionHandle, HandlePhase, ManagerCommand, ManagerHandle};

use crate::color::Color;
use crate::constants::{CHANNEL_CAPACITY, RECONNECT_DELAY_MS};
use crate::error::Result;
use crate::status::{ConnectionState, InboundNotification, StatusPublisher};
use crate::transport::{Transport, TransportEvent};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::{self, OwnedPermit};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Events processed by the manager's event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    /// Event from the connection created by `attempt`
    Transport { attempt: u64, event: TransportEvent },
    /// Reconnection delay elapsed
    ReconnectDue,
}

/// Owns the connection to one fixed endpoint
///
/// Lifecycle: `new()` once at the composition root, `handle()` for consumers,
/// `run()` to start the event loop, `ManagerHandle::stop()` (or dropping every
/// handle) to end it.
pub struct ConnectionManager<T: Transport> {
    endpoint: String,
    transport: T,
    status: StatusPublisher,

    state: ConnectionState,
    handle: Option<ConnectionHandle>,
    /// Attempt in progress
    connecting: bool,
    attempts: u64,
    reconnects_scheduled: u64,

    /// Last valid color picked, sent on every open
    color: Color,

    events_tx: mpsc::UnboundedSender<ManagerEvent>,
    events_rx: mpsc::UnboundedReceiver<ManagerEvent>,
    commands_rx: mpsc::Receiver<ManagerCommand>,
    color_rx: watch::Receiver<Color>,
    /// Template for consumer handles, released when `run()` starts
    control: Option<ManagerHandle>,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(
        endpoint: impl Into<String>,
        initial_color: Color,
        transport: T,
        status: StatusPublisher,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (color_tx, color_rx) = watch::channel(initial_color.clone());
        status.set_state(ConnectionState::Disconnected);

        Self {
            endpoint: endpoint.into(),
            transport,
            status,
            state: ConnectionState::Disconnected,
            handle: None,
            connecting: false,
            attempts: 0,
            reconnects_scheduled: 0,
            color: initial_color,
            events_tx,
            events_rx,
            commands_rx,
            color_rx,
            control: Some(ManagerHandle::new(commands_tx, color_tx)),
        }
    }

    /// Control handle for consumers
    pub fn handle(&self) -> ManagerHandle {
        self.control.clone().unwrap_or_else(ManagerHandle::detached)
    }

    // =========================================================================
    // State queries
    // =========================================================================

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current connection, if any
    pub fn connection(&self) -> Option<&ConnectionHandle> {
        self.handle.as_ref()
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    /// A frame is held back waiting for room in the transport queue
    pub fn has_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(ConnectionHandle::has_pending)
    }

    /// Number of connection attempts started so far
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Number of reconnect timers armed so far
    pub fn reconnects_scheduled(&self) -> u64 {
        self.reconnects_scheduled
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Make sure a connection exists or is being made. Idempotent.
    ///
    /// - open connection: returned, and the current color is re-sent over it
    /// - connection mid-connect: returned, no second attempt
    /// - connection closing after an error: `None`, its close drives the retry
    /// - attempt already in flight: `None`
    /// - otherwise: exactly one new attempt is started and returned
    pub fn ensure_connected(&mut self) -> Option<&ConnectionHandle> {
        match self.handle.as_ref().map(ConnectionHandle::phase) {
            Some(HandlePhase::Open) => {
                self.set_state(ConnectionState::Connected);
                self.status.set_message("Reusing existing connection");
                self.transmit_current();
                return self.handle.as_ref();
            }
            Some(HandlePhase::Connecting) => {
                self.set_state(ConnectionState::Connecting);
                return self.handle.as_ref();
            }
            Some(HandlePhase::Closing) => {
                debug!("Connection closing, waiting for close before reconnecting");
                return None;
            }
            None => {}
        }

        if self.connecting {
            return None;
        }
        // Guard goes up before any async work starts
        self.connecting = true;
        self.set_state(ConnectionState::Connecting);

        self.attempts += 1;
        let attempt = self.attempts;
        info!(attempt, endpoint = %self.endpoint, "Connecting");

        let channels = self.transport.spawn(&self.endpoint);
        self.forward_events(attempt, channels.events);
        self.handle = Some(ConnectionHandle::new(attempt, channels.tx));
        self.handle.as_ref()
    }

    /// Send a color if the connection is open, otherwise do nothing
    pub fn send(&mut self, color: &Color) {
        match self.handle.as_mut() {
            Some(handle) if handle.is_open() => handle.transmit(color.rgb().to_frame()),
            _ => debug!("Not connected, not sending {}", color.hex()),
        }
    }

    /// Picker callback: validate, remember and send
    ///
    /// Invalid input leaves the current color untouched and sends nothing.
    pub fn select_color(&mut self, hex: &str) -> Result<()> {
        let color = Color::parse(hex)?;
        self.set_color(color);
        Ok(())
    }

    /// Remember an already validated color and send it
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.transmit_current();
    }

    // =========================================================================
    // Event loop
    // =========================================================================

    /// Start connecting and process events until stopped
    pub async fn run(mut self) {
        // From here on only consumer handles keep the command channel open
        self.control = None;
        self.ensure_connected();

        loop {
            let room = self.pending_room();
            tokio::select! {
                command = self.commands_rx.recv() => match command {
                    Some(ManagerCommand::EnsureConnected) => {
                        self.ensure_connected();
                    }
                    Some(ManagerCommand::Stop) => break,
                    None => {
                        debug!("All handles dropped");
                        break;
                    }
                },
                Ok(()) = self.color_rx.changed() => {
                    let color = self.color_rx.borrow_and_update().clone();
                    self.set_color(color);
                }
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                permit = room, if self.has_pending() => self.flush_pending(permit),
            }
        }

        self.shutdown();
    }

    /// Apply one event to the state machine
    pub fn handle_event(&mut self, event: ManagerEvent) {
        match event {
            ManagerEvent::ReconnectDue => {
                debug!("Reconnect timer fired");
                self.ensure_connected();
            }
            ManagerEvent::Transport { attempt, event } => {
                if self.handle.as_ref().map(ConnectionHandle::attempt) != Some(attempt) {
                    debug!(attempt, "Ignoring {:?} from stale connection", event);
                    return;
                }
                match event {
                    TransportEvent::Open => self.on_open(),
                    TransportEvent::Close => self.on_close(),
                    TransportEvent::Error(description) => self.on_error(&description),
                    TransportEvent::Message(payload) => self.on_message(&payload),
                }
            }
        }
    }

    fn on_open(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.set_phase(HandlePhase::Open);
        }
        self.connecting = false;
        self.set_state(ConnectionState::Connected);
        self.status.set_message("Connected to server");
        info!(endpoint = %self.endpoint, "Connected");

        // Initial sync
        self.transmit_current();
    }

    fn on_close(&mut self) {
        self.set_state(ConnectionState::Disconnected);
        self.status.set_message("Disconnected from server");
        self.handle = None;
        self.connecting = false;
        self.schedule_reconnect();
    }

    fn on_error(&mut self, description: &str) {
        self.set_state(ConnectionState::Error);
        self.connecting = false;
        if let Some(handle) = self.handle.as_mut() {
            handle.set_phase(HandlePhase::Closing);
        }
        warn!("Connection error: {}", description);
        self.status
            .set_message(format!("WebSocket error: {}", description));
    }

    fn on_message(&mut self, payload: &str) {
        let notification = InboundNotification::parse(payload);
        debug!("Controller says: {:?}", notification);
        self.status.notify(&notification);
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.status.set_state(state);
    }

    fn transmit_current(&mut self) {
        let frame = self.color.rgb().to_frame();
        if let Some(handle) = self.handle.as_mut().filter(|h| h.is_open()) {
            handle.transmit(frame);
        }
    }

    /// Resolves once the transport queue has room for the held frame
    fn pending_room(&self) -> impl Future<Output = Option<OwnedPermit<String>>> + 'static {
        let tx = self
            .handle
            .as_ref()
            .filter(|h| h.has_pending())
            .map(ConnectionHandle::sender);
        async move {
            match tx {
                Some(tx) => tx.reserve_owned().await.ok(),
                None => std::future::pending().await,
            }
        }
    }

    fn flush_pending(&mut self, permit: Option<OwnedPermit<String>>) {
        if let Some(handle) = self.handle.as_mut() {
            handle.flush(permit);
        }
    }

    /// Pump one connection's events into the event loop, tagged with its attempt
    fn forward_events(&self, attempt: u64, mut events: mpsc::Receiver<TransportEvent>) {
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if events_tx
                    .send(ManagerEvent::Transport { attempt, event })
                    .is_err()
                {
                    break; // Manager gone
                }
            }
        });
    }

    /// Arm one one-shot reconnect timer
    fn schedule_reconnect(&mut self) {
        self.reconnects_scheduled += 1;
        let delay = Duration::from_millis(RECONNECT_DELAY_MS);
        info!("Reconnecting in {} ms", RECONNECT_DELAY_MS);

        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events_tx.send(ManagerEvent::ReconnectDue);
        });
    }

    fn shutdown(&mut self) {
        // Dropping the outbound sender closes the connection
        if self.handle.take().is_some() {
            info!("Closing connection");
        }
        self.connecting = false;
        self.set_state(ConnectionState::Disconnected);
        self.status.set_message("Stopped");
    }
}

// =============================================================================
// Tests
// =============================================================================
