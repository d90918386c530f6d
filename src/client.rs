//! Client composition root
//!
//! Wires the picker input (stdin lines), the connection manager and the
//! status output together, and owns the manager for the process lifetime.

use crate::color::Color;
use crate::connection::{ConnectionManager, ManagerHandle};
use crate::error::Result;
use crate::status::{StatusPublisher, StatusSnapshot};
use crate::transport::WebSocketTransport;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

/// Run the client until Ctrl-C
pub async fn run(endpoint: String, initial_color: Color) -> Result<()> {
    info!("Starting color link to {} with {}", endpoint, initial_color);

    let status = StatusPublisher::new();
    let manager = ConnectionManager::new(
        endpoint,
        initial_color,
        WebSocketTransport::new(),
        status.clone(),
    );
    let handle = manager.handle();

    let printer = tokio::spawn(print_status(status.subscribe()));
    let manager_task = tokio::spawn(manager.run());
    let input = tokio::spawn(read_picker_input(handle.clone()));

    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");

    input.abort();
    handle.stop().await;
    if let Err(e) = manager_task.await {
        warn!("Connection manager task failed: {}", e);
    }
    printer.abort();
    Ok(())
}

/// Treat each stdin line as a picked color
///
/// EOF stops reading; the connection stays up until Ctrl-C.
async fn read_picker_input(handle: ManagerHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Err(e) = handle.select_color(line) {
                    warn!("{}", e);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
}

/// Print a status line on every change
async fn print_status(mut rx: watch::Receiver<StatusSnapshot>) {
    loop {
        println!("{}", format_status(&rx.borrow_and_update()));
        if rx.changed().await.is_err() {
            break;
        }
    }
}

/// `[HH:MM:SS] Status: <state> (<color>) | Server: <last message>`
pub fn format_status(status: &StatusSnapshot) -> String {
    format!(
        "[{}] Status: {} ({}) | Server: {}",
        status.updated_at.format("%H:%M:%S"),
        status.state,
        status.indicator().as_str(),
        status.last_message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ConnectionState;

    #[test]
    fn test_format_status() {
        let status = StatusSnapshot {
            state: ConnectionState::Connected,
            last_message: "ack".into(),
            ..StatusSnapshot::default()
        };
        let line = format_status(&status);
        assert!(line.ends_with("Status: connected (green) | Server: ack"));
        assert!(line.starts_with('['));
    }

    #[test]
    fn test_format_status_disconnected_is_red() {
        let line = format_status(&StatusSnapshot::default());
        assert!(line.contains("Status: disconnected (red)"));
    }
}
