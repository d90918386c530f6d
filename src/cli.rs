//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Stream picked colors to a WebSocket LED controller
#[derive(Parser, Debug, Default)]
#[command(name = "color-link")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to the controller and send colors read from stdin (default)
    Connect {
        /// Controller endpoint (overrides config)
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Initial color, #RRGGBB (overrides config)
        #[arg(long, value_name = "HEX")]
        color: Option<String>,
    },

    /// Run the LED controller server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,

        /// Number of LEDs on the strip (overrides config)
        #[arg(long, value_name = "COUNT")]
        leds: Option<usize>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Validate the config file, exit non-zero on problems
    Check,
}

// =============================================================================
// Tests
// =============================================================================
