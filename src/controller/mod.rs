//! Controller-side LED server
//!
//! Accepts WebSocket clients, queues the colors they send and applies the
//! latest one to the strip at a fixed rate. Every frame is acknowledged.
//!
//! Architecture:
//! ```text
//! color-link ──ws:8765──► ControllerServer ──pending──► updater (100 ms) ──► LedStrip
//! ```

pub mod protocol;
pub mod strip;

pub use strip::{LedStrip, LoggingStrip};

use crate::color::Rgb;
use crate::constants::SHUTDOWN_POLL_MS;
use crate::error::{LinkError, Result};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Latest color waiting to be shown. A newer one replaces it.
type Pending = Arc<Mutex<Option<Rgb>>>;

/// WebSocket server driving an LED strip
pub struct ControllerServer<S: LedStrip> {
    listener: TcpListener,
    local_addr: SocketAddr,
    strip: Arc<Mutex<S>>,
    pending: Pending,
    update_interval: Duration,
}

impl<S: LedStrip> ControllerServer<S> {
    /// Bind the listening socket (`addr` like `0.0.0.0:8765`, port 0 for any)
    pub async fn bind(addr: &str, update_interval: Duration, strip: S) -> Result<Self> {
        let bind_err = |source| LinkError::WebSocketBind {
            addr: addr.to_string(),
            source,
        };
        let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        Ok(Self {
            listener,
            local_addr,
            strip: Arc::new(Mutex::new(strip)),
            pending: Arc::new(Mutex::new(None)),
            update_interval,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared access to the strip
    pub fn strip(&self) -> Arc<Mutex<S>> {
        self.strip.clone()
    }

    /// Serve clients until `shutdown` is set, then turn the strip off
    pub async fn run(self, shutdown: Arc<AtomicBool>) -> Result<()> {
        info!("Controller listening on ws://{}", self.local_addr);

        let updater = tokio::spawn(run_updater(
            self.pending.clone(),
            self.strip.clone(),
            self.update_interval,
            shutdown.clone(),
        ));

        while !shutdown.load(Ordering::Relaxed) {
            match tokio::time::timeout(
                Duration::from_millis(SHUTDOWN_POLL_MS),
                self.listener.accept(),
            )
            .await
            {
                Ok(Ok((stream, addr))) => {
                    info!("Client {} connected", addr);
                    let pending = self.pending.clone();
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, pending, shutdown).await {
                            debug!("Client {} error: {}", addr, e);
                        }
                        info!("Client {} disconnected", addr);
                    });
                }
                Ok(Err(e)) => {
                    warn!("Failed to accept connection: {}", e);
                }
                Err(_) => {} // Timeout, check shutdown flag
            }
        }

        if let Err(e) = updater.await {
            error!("LED updater task failed: {}", e);
        }

        info!("Turning off all LEDs");
        let mut strip = self.strip.lock();
        strip.fill(Rgb::BLACK);
        strip.show();
        Ok(())
    }
}

/// Apply the pending color at most once per `interval`
async fn run_updater<S: LedStrip>(
    pending: Pending,
    strip: Arc<Mutex<S>>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        tokio::time::sleep(interval).await;

        let Some(rgb) = pending.lock().take() else {
            continue;
        };
        let mut strip = strip.lock();
        strip.fill(rgb);
        strip.show();
        debug!("Rate-limited update applied: {}", rgb);
    }
}

/// Serve one client: queue its colors and acknowledge each frame
async fn handle_client(
    stream: TcpStream,
    pending: Pending,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| LinkError::WebSocketAccept {
            source: Box::new(e),
        })?;

    let (mut ws_sink, mut ws_stream) = ws_stream.split();
    let transfer_err = |e| LinkError::WebSocketTransfer {
        source: Box::new(e),
    };

    while !shutdown.load(Ordering::Relaxed) {
        let text = match tokio::time::timeout(
            Duration::from_millis(SHUTDOWN_POLL_MS),
            ws_stream.next(),
        )
        .await
        {
            Ok(Some(Ok(Message::Text(text)))) => text.as_str().to_owned(),
            Ok(Some(Ok(Message::Binary(data)))) => String::from_utf8_lossy(&data).into_owned(),
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
            Ok(Some(Ok(_))) => continue, // Ping/pong
            Ok(Some(Err(e))) => return Err(transfer_err(e)),
            Err(_) => continue,          // Timeout
        };

        let (rgb, reply) = protocol::handle_frame(&text);
        match rgb {
            Some(rgb) => *pending.lock() = Some(rgb),
            None => warn!("Rejected frame {:?}: {}", text, reply.message),
        }

        ws_sink
            .send(Message::Text(reply.to_frame().into()))
            .await
            .map_err(transfer_err)?;
    }

    let _ = ws_sink.close().await;
    Ok(())
}
