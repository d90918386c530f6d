//! Color link: keeps one WebSocket connection to an LED controller alive and
//! streams picked colors over it.
//!
//! - `color`: hex/RGB codec
//! - `connection`: connection lifecycle manager (state machine, reconnect timer)
//! - `status`: observable connection status and last controller message
//! - `transport`: message-oriented connection abstraction, WebSocket client
//! - `controller`: the LED controller server side

pub mod cli;
pub mod client;
pub mod color;
pub mod config;
pub mod connection;
pub mod constants;
pub mod controller;
pub mod error;
pub mod logging;
pub mod status;
pub mod transport;
