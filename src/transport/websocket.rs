//! WebSocket client transport
//!
//! Connects to the controller endpoint and relays text frames bidirectionally.
//!
//! Architecture:
//! ```text
//! ConnectionManager ──channels──► WebSocketTransport ──ws:8765──► Controller
//! ```

use super::{Transport, TransportChannels, TransportEvent};
use crate::constants::CHANNEL_CAPACITY;
use crate::error::{LinkError, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// WebSocket client transport
///
/// Each `spawn` opens one independent connection.
///
/// # Example
///
/// ```ignore
/// let channels = WebSocketTransport::new().spawn("ws://localhost:8765");
///
/// // Lifecycle and inbound frames come through channels.events
/// // Strings sent to channels.tx go out as text frames
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    fn spawn(&self, endpoint: &str) -> TransportChannels {
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(CHANNEL_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

        let endpoint = endpoint.to_string();
        tokio::spawn(async move {
            if let Err(e) = run_client(&endpoint, &event_tx, out_rx).await {
                warn!(endpoint = %endpoint, "WebSocket error: {}", e);
                let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
            }
            info!(endpoint = %endpoint, "WebSocket closed");
            let _ = event_tx.send(TransportEvent::Close).await;
        });

        TransportChannels {
            events: event_rx,
            tx: out_tx,
        }
    }
}

/// Run one client connection until either side closes it
async fn run_client(
    endpoint: &str,
    events: &mpsc::Sender<TransportEvent>,
    mut out_rx: mpsc::Receiver<String>,
) -> Result<()> {
    let (ws_stream, _) = connect_async(endpoint)
        .await
        .map_err(|e| LinkError::WebSocketConnect {
            endpoint: endpoint.to_string(),
            source: Box::new(e),
        })?;

    info!(endpoint = %endpoint, "WebSocket connected");
    if events.send(TransportEvent::Open).await.is_err() {
        return Ok(()); // Nobody listening anymore
    }

    let (mut ws_sink, mut ws_stream) = ws_stream.split();
    let transfer_err = |e| LinkError::WebSocketTransfer {
        source: Box::new(e),
    };

    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(text) => {
                    debug!("-> {}", text);
                    ws_sink.send(Message::Text(text.into())).await.map_err(transfer_err)?;
                }
                None => {
                    // Owner dropped the handle, close gracefully
                    let _ = ws_sink.close().await;
                    return Ok(());
                }
            },
            inbound = ws_stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    debug!("<- {}", text.as_str());
                    let message = TransportEvent::Message(text.as_str().to_owned());
                    if events.send(message).await.is_err() {
                        return Ok(());
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    if events.send(TransportEvent::Message(text)).await.is_err() {
                        return Ok(());
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {} // Ping/pong handled by tungstenite
                Some(Err(e)) => return Err(transfer_err(e)),
            },
        }
    }
}
