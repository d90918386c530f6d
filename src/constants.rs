//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Network
// =============================================================================

/// Controller endpoint used when neither config nor CLI provide one
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8765";

/// Address the controller server listens on
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Port the controller server listens on
pub const DEFAULT_CONTROLLER_PORT: u16 = 8765;

// =============================================================================
// Timing - Reconnection
// =============================================================================

/// Delay between a connection close and the next connection attempt (milliseconds)
///
/// Flat interval: no backoff, no jitter, no retry limit.
pub const RECONNECT_DELAY_MS: u64 = 5000;

/// Poll interval for shutdown-aware loops (milliseconds)
pub const SHUTDOWN_POLL_MS: u64 = 100;

// =============================================================================
// Color
// =============================================================================

/// Color held before the user picks anything
pub const DEFAULT_COLOR: &str = "#ff0000";

// =============================================================================
// Controller
// =============================================================================

/// Number of pixels on the strip
pub const DEFAULT_LED_COUNT: usize = 30;

/// Strip brightness (0.0 = dark, 1.0 = full)
pub const DEFAULT_BRIGHTNESS: f32 = 0.5;

/// Minimum interval between two strip updates (milliseconds)
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 100;

// =============================================================================
// Buffers
// =============================================================================

/// Channel capacity for async message passing
pub const CHANNEL_CAPACITY: usize = 256;
