//! Configuration management
//!
//! Config file is stored next to the executable as `config.toml`.
//! Dev builds fall back to `config/default.toml` in the project root.

use crate::color::hex_to_rgb;
use crate::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_BRIGHTNESS, DEFAULT_COLOR, DEFAULT_CONTROLLER_PORT,
    DEFAULT_ENDPOINT, DEFAULT_LED_COUNT, DEFAULT_UPDATE_INTERVAL_MS,
};
use crate::error::{LinkError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client: ClientConfig,
    pub controller: ControllerConfig,
}

/// Client side: where to connect and what to start with
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Controller endpoint (`ws://host:port`)
    pub endpoint: String,
    /// Color held until the user picks one (`#RRGGBB`)
    pub initial_color: String,
}

/// Controller side: listening socket and strip settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Number of pixels on the strip
    pub led_count: usize,
    /// 0.0 (dark) to 1.0 (full)
    pub brightness: f32,
    /// Minimum interval between strip updates
    pub update_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            initial_color: DEFAULT_COLOR.to_string(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_CONTROLLER_PORT,
            led_count: DEFAULT_LED_COUNT,
            brightness: DEFAULT_BRIGHTNESS,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
        }
    }
}

impl ControllerConfig {
    /// `bind_address:port`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

impl Config {
    /// Check values that deserialize fine but make no sense
    pub fn validate(&self) -> Result<()> {
        let endpoint = &self.client.endpoint;
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(LinkError::ConfigValidation {
                field: "client.endpoint",
                reason: format!("'{}' is not a ws:// or wss:// URL", endpoint),
            });
        }
        if hex_to_rgb(&self.client.initial_color).is_none() {
            return Err(LinkError::ConfigValidation {
                field: "client.initial_color",
                reason: format!("'{}' is not #RRGGBB", self.client.initial_color),
            });
        }
        if self.controller.led_count == 0 {
            return Err(LinkError::ConfigValidation {
                field: "controller.led_count",
                reason: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.controller.brightness) {
            return Err(LinkError::ConfigValidation {
                field: "controller.brightness",
                reason: format!("{} is outside 0.0..=1.0", self.controller.brightness),
            });
        }
        if self.controller.update_interval_ms == 0 {
            return Err(LinkError::ConfigValidation {
                field: "controller.update_interval_ms",
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Get the project root directory
///
/// Searches in order:
/// 1. Next to executable (production deployment)
/// 2. Up from target/release or target/debug (dev builds)
fn find_project_root() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| LinkError::ConfigRead {
        path: PathBuf::from("executable"),
        source: e,
    })?;
    let exe_dir = exe.parent().ok_or_else(|| LinkError::ConfigValidation {
        field: "exe_path",
        reason: "no parent directory".into(),
    })?;

    if exe_dir.join("config.toml").exists() {
        return Ok(exe_dir.to_path_buf());
    }

    // exe_dir = <root>/target/release in dev builds
    if let Some(target_dir) = exe_dir.parent() {
        if target_dir.file_name().is_some_and(|n| n == "target") {
            if let Some(project_root) = target_dir.parent() {
                if project_root.join("config").exists() {
                    return Ok(project_root.to_path_buf());
                }
            }
        }
    }

    Ok(exe_dir.to_path_buf())
}

/// Get the config file path
///
/// Looks for config.toml, falls back to config/default.toml
pub fn config_path() -> Result<PathBuf> {
    let root = find_project_root()?;

    let user_config = root.join("config.toml");
    if user_config.exists() {
        return Ok(user_config);
    }

    let default_config = root.join("config").join("default.toml");
    if default_config.exists() {
        return Ok(default_config);
    }

    Ok(user_config)
}

// =============================================================================
// Loading
// =============================================================================

/// Parse config text
pub fn parse(content: &str, path: &Path) -> Result<Config> {
    toml::from_str(content).map_err(|e| LinkError::ConfigParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Read and parse without validating. A missing file yields defaults.
fn read(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path).map_err(|e| LinkError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(&content, path)
}

/// Load and validate, reporting every problem
///
/// A missing file is not an error: defaults apply.
pub fn load_strict(path: &Path) -> Result<Config> {
    let config = read(path)?;
    config.validate()?;
    Ok(config)
}

/// Load config, falling back to defaults if the file can't be read or parsed
///
/// Values are not validated here; callers validate after applying overrides.
pub fn load(path: &Path) -> Config {
    match read(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}, using defaults", e);
            Config::default()
        }
    }
}

/// Render config as TOML
pub fn to_toml(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| LinkError::ConfigValidation {
        field: "config",
        reason: e.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================
