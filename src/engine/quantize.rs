//! Palette quantizer.
//!
//! Maps every opaque pixel to the nearest of four palette colors under
//! squared RGB distance. Nearly transparent pixels become fully transparent
//! black so the cropper treats them as background.

use image::{Rgba, RgbaImage};

use super::color::Color;

/// Pixels with alpha below this are treated as fully transparent.
pub const ALPHA_THRESHOLD: u8 = 10;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// The four allowed output colors, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    entries: [Color; 4],
}

impl Palette {
    /// `[primary, secondary, white, black]`.
    pub fn new(primary: Color, secondary: Color) -> Self {
        Self {
            entries: [primary, secondary, Color::WHITE, Color::BLACK],
        }
    }

    pub fn primary(&self) -> Color {
        self.entries[0]
    }

    pub fn secondary(&self) -> Color {
        self.entries[1]
    }

    pub fn entries(&self) -> &[Color; 4] {
        &self.entries
    }

    /// Nearest palette entry. The first entry at the minimum distance wins,
    /// so primary/secondary beat white/black on exact ties.
    pub fn nearest(&self, color: Color) -> Color {
        let mut best = self.entries[0];
        let mut best_d = u32::MAX;
        for entry in &self.entries {
            let d = color.distance_sq(entry);
            if d < best_d {
                best_d = d;
                best = *entry;
            }
        }
        best
    }

    pub fn contains(&self, color: Color) -> bool {
        self.entries.contains(&color)
    }
}

/// Produce a new buffer with every pixel snapped to `palette`.
pub fn quantize(img: &RgbaImage, palette: &Palette) -> RgbaImage {
    let mut out = RgbaImage::new(img.width(), img.height());
    for (src, dst) in img.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        *dst = if a < ALPHA_THRESHOLD {
            TRANSPARENT
        } else {
            let c = palette.nearest(Color::rgb(r, g, b));
            Rgba([c.r, c.g, c.b, 255])
        };
    }
    out
}
