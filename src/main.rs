//! Color link - stream picked colors to a WebSocket LED controller
//!
//! Usage:
//!   color-link                  Connect and send colors typed on stdin
//!   color-link serve            Run the LED controller server
//!   color-link config show      Print the effective configuration

use clap::Parser;
use color_link::cli::{Cli, Command, ConfigAction};
use color_link::color::Color;
use color_link::config::{self, Config};
use color_link::controller::{ControllerServer, LoggingStrip};
use color_link::error::{LinkError, Result};
use color_link::logging;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_path()?,
    };

    match cli.command {
        Some(Command::Config { action }) => run_config(action, config_path),
        Some(Command::Serve { port, leds }) => {
            let mut cfg = config::load(&config_path);
            if let Some(port) = port {
                cfg.controller.port = port;
            }
            if let Some(leds) = leds {
                cfg.controller.led_count = leds;
            }
            cfg.validate()?;
            runtime()?.block_on(run_serve(cfg))
        }
        Some(Command::Connect { endpoint, color }) => {
            run_connect(config::load(&config_path), endpoint, color)
        }
        None => run_connect(config::load(&config_path), None, None),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| LinkError::Runtime { source: e })
}

fn run_connect(mut cfg: Config, endpoint: Option<String>, color: Option<String>) -> Result<()> {
    if let Some(endpoint) = endpoint {
        cfg.client.endpoint = endpoint;
    }
    if let Some(color) = color {
        cfg.client.initial_color = color;
    }
    cfg.validate()?;

    let initial = Color::parse(&cfg.client.initial_color)?;
    runtime()?.block_on(color_link::client::run(cfg.client.endpoint, initial))
}

async fn run_serve(cfg: Config) -> Result<()> {
    let strip = LoggingStrip::new(cfg.controller.led_count, cfg.controller.brightness);
    let server = ControllerServer::bind(
        &cfg.controller.listen_addr(),
        cfg.controller.update_interval(),
        strip,
    )
    .await?;

    // Setup shutdown handler
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_clone.store(true, Ordering::SeqCst);
    });

    server.run(shutdown).await
}

fn run_config(action: ConfigAction, path: PathBuf) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config::load(&path);
            println!("# {}", path.display());
            print!("{}", config::to_toml(&cfg)?);
        }
        ConfigAction::Check => {
            config::load_strict(&path)?;
            println!("{}: OK", path.display());
        }
    }
    Ok(())
}
