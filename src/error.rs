//! Centralized error types
//!
//! All errors are represented by the `LinkError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, LinkError>`.

use std::fmt;
use std::path::PathBuf;

/// All color-link errors
#[derive(Debug)]
pub enum LinkError {
    // === Color ===
    /// Input is not a `#RRGGBB` color
    InvalidColor { input: String },

    // === Network ===
    /// Failed to open a WebSocket connection to the controller
    WebSocketConnect {
        endpoint: String,
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    /// WebSocket read or write failed on an established connection
    WebSocketTransfer {
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    /// Failed to bind the controller WebSocket server
    WebSocketBind {
        addr: String,
        source: std::io::Error,
    },
    /// Failed to accept WebSocket connection
    WebSocketAccept {
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    // === Config ===
    /// Config file could not be read
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config file is not valid TOML for `Config`
    ConfigParse { path: PathBuf, reason: String },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// Tokio runtime creation failed
    Runtime { source: std::io::Error },
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::WebSocketBind { source, .. }
            | Self::ConfigRead { source, .. }
            | Self::Runtime { source } => Some(source),
            Self::WebSocketConnect { source, .. }
            | Self::WebSocketTransfer { source }
            | Self::WebSocketAccept { source } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidColor { input } => {
                write!(f, "Invalid color: {} (expected #RRGGBB)", input)
            }
            Self::WebSocketConnect { endpoint, source } => {
                write!(f, "Cannot connect to {}: {}", endpoint, source)
            }
            Self::WebSocketTransfer { source } => {
                write!(f, "WebSocket transfer failed: {}", source)
            }
            Self::WebSocketBind { addr, .. } => {
                write!(f, "Cannot bind WebSocket server on {}", addr)
            }
            Self::WebSocketAccept { .. } => write!(f, "Failed to accept WebSocket connection"),
            Self::ConfigRead { path, .. } => write!(f, "Cannot read config: {}", path.display()),
            Self::ConfigParse { path, reason } => {
                write!(f, "Invalid config {}: {}", path.display(), reason)
            }
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
        }
    }
}

/// Alias for Result with LinkError
pub type Result<T> = std::result::Result<T, LinkError>;
