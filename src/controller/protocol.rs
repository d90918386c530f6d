//! Controller wire protocol
//!
//! Inbound: text frame `{"r": .., "g": .., "b": ..}`.
//! Outbound: `{"status": "success" | "error", "message": ".."}` per frame.

use crate::color::Rgb;
use serde_json::{json, Value};

/// Outcome reported back to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Success,
    Error,
}

impl ReplyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Acknowledgement sent for every inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: ReplyStatus,
    pub message: String,
}

impl Reply {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            message: message.into(),
        }
    }

    pub fn to_frame(&self) -> String {
        json!({ "status": self.status.as_str(), "message": self.message }).to_string()
    }
}

/// Handle one inbound frame
///
/// Returns the color to queue (if the frame carried one) and the reply to send.
pub fn handle_frame(text: &str) -> (Option<Rgb>, Reply) {
    match parse_color_command(text) {
        Ok(rgb) => (
            Some(rgb),
            Reply::success(format!("LED update queued: RGB: {}", rgb)),
        ),
        Err(reply) => (None, reply),
    }
}

/// Parse a color command, sanitizing each channel into 0-255
pub fn parse_color_command(text: &str) -> Result<Rgb, Reply> {
    let value: Value =
        serde_json::from_str(text).map_err(|_| Reply::error("Invalid JSON format"))?;

    let missing = || Reply::error("Missing RGB values");
    let object = value.as_object().ok_or_else(missing)?;
    let (r, g, b) = match (object.get("r"), object.get("g"), object.get("b")) {
        (Some(r), Some(g), Some(b)) => (r, g, b),
        _ => return Err(missing()),
    };

    Ok(Rgb::new(
        sanitize_channel("r", r)?,
        sanitize_channel("g", g)?,
        sanitize_channel("b", b)?,
    ))
}

/// Coerce a JSON value into a channel: truncate toward zero, clamp to 0-255
fn sanitize_channel(key: &str, value: &Value) -> Result<u8, Reply> {
    let invalid = || Reply::error(format!("Error: invalid value for {}", key));

    let number = match value {
        Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())? as f64,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return Err(invalid()),
    };

    Ok(number.trunc().clamp(0.0, 255.0) as u8)
}
