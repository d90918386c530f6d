//! Color codec
//!
//! Converts between the `#RRGGBB` representation the picker produces and
//! the `{r, g, b}` triple sent to the controller. Pure functions only.

use crate::error::{LinkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Red/green/blue triple, each channel 0-255
///
/// Serializes to the controller wire format `{"r":..,"g":..,"b":..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Format as lowercase `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Encode as the outbound text frame
    pub fn to_frame(self) -> String {
        format!(r#"{{"r":{},"g":{},"b":{}}}"#, self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Parse `#RRGGBB` (leading `#` optional, hex digits case-insensitive)
///
/// Returns `None` for anything else.
pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

/// A picked color: the hex the user chose and its decoded triple
///
/// Only constructible from valid input, so `rgb` always matches `hex`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Color {
    hex: String,
    rgb: Rgb,
}

impl Color {
    /// Validate and decode a picker value
    pub fn parse(hex: &str) -> Result<Self> {
        let rgb = hex_to_rgb(hex).ok_or_else(|| LinkError::InvalidColor {
            input: hex.to_string(),
        })?;
        Ok(Self {
            hex: hex.to_string(),
            rgb,
        })
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn rgb(&self) -> Rgb {
        self.rgb
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Self {
            hex: rgb.to_hex(),
            rgb,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} RGB: {}", self.hex, self.rgb)
    }
}

// =============================================================================
// Tests
// =============================================================================
