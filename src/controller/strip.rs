//! LED strip output

use crate::color::Rgb;
use tracing::info;

/// Addressable LED strip driven by the controller
pub trait LedStrip: Send + 'static {
    /// Number of pixels
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set every pixel (not visible until `show`)
    fn fill(&mut self, color: Rgb);

    /// Push the pixel buffer to the strip
    fn show(&mut self);
}

/// In-memory strip that logs every update
///
/// Stands in for hardware: keeps the last frame shown, brightness applied.
#[derive(Debug, Clone)]
pub struct LoggingStrip {
    pixels: Vec<Rgb>,
    brightness: f32,
    shown: Vec<Rgb>,
    shows: u64,
}

impl LoggingStrip {
    pub fn new(count: usize, brightness: f32) -> Self {
        Self {
            pixels: vec![Rgb::BLACK; count],
            brightness: brightness.clamp(0.0, 1.0),
            shown: vec![Rgb::BLACK; count],
            shows: 0,
        }
    }

    /// Last frame pushed by `show`, brightness applied
    pub fn shown(&self) -> &[Rgb] {
        &self.shown
    }

    /// Number of `show` calls
    pub fn shows(&self) -> u64 {
        self.shows
    }

    fn scale(&self, channel: u8) -> u8 {
        (f32::from(channel) * self.brightness).round() as u8
    }
}

impl LedStrip for LoggingStrip {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    fn show(&mut self) {
        self.shown = self
            .pixels
            .iter()
            .map(|p| Rgb::new(self.scale(p.r), self.scale(p.g), self.scale(p.b)))
            .collect();
        self.shows += 1;
        if let Some(first) = self.pixels.first() {
            info!("LEDs set to RGB: {}", first);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_not_visible_until_show() {
        let mut strip = LoggingStrip::new(3, 1.0);
        strip.fill(Rgb::new(10, 20, 30));
        assert_eq!(strip.shown(), &[Rgb::BLACK; 3]);

        strip.show();
        assert_eq!(strip.shown(), &[Rgb::new(10, 20, 30); 3]);
        assert_eq!(strip.shows(), 1);
    }

    #[test]
    fn test_brightness_scales_output() {
        let mut strip = LoggingStrip::new(2, 0.5);
        strip.fill(Rgb::new(255, 100, 0));
        strip.show();
        assert_eq!(strip.shown()[0], Rgb::new(128, 50, 0));
    }

    #[test]
    fn test_len() {
        assert_eq!(LoggingStrip::new(30, 0.5).len(), 30);
        assert!(LoggingStrip::new(0, 0.5).is_empty());
    }
}
