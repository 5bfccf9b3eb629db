//! Color parsing, sanitizing and naming.
//!
//! User-entered color text is sanitized here, at the boundary, so that the
//! quantizer only ever sees a valid RGB triple. Anything unrecognized
//! becomes white.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Hex returned for any input that is neither valid hex nor a known name.
pub const DEFAULT_COLOR_HEX: &str = "#FFFFFF";

/// An opaque RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Named colors accepted verbatim from user input (CSS values).
const NAMED_COLORS: &[(&str, Color)] = &[
    ("white", Color::rgb(255, 255, 255)),
    ("black", Color::rgb(0, 0, 0)),
    ("red", Color::rgb(255, 0, 0)),
    ("blue", Color::rgb(0, 0, 255)),
    ("green", Color::rgb(0, 128, 0)),
    ("yellow", Color::rgb(255, 255, 0)),
    ("orange", Color::rgb(255, 165, 0)),
    ("purple", Color::rgb(128, 0, 128)),
    ("teal", Color::rgb(0, 128, 128)),
    ("navy", Color::rgb(0, 0, 128)),
    ("silver", Color::rgb(192, 192, 192)),
    ("gold", Color::rgb(255, 215, 0)),
    ("maroon", Color::rgb(128, 0, 0)),
    ("brown", Color::rgb(165, 42, 42)),
    ("pink", Color::rgb(255, 192, 203)),
    ("aqua", Color::rgb(0, 255, 255)),
    ("lime", Color::rgb(0, 255, 0)),
    ("gray", Color::rgb(128, 128, 128)),
    ("grey", Color::rgb(128, 128, 128)),
];

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RGB` / `#RRGGBB` (the `#` is optional, case-insensitive).
    pub fn from_hex(input: &str) -> Result<Self, AppError> {
        let h = input.trim();
        let h = h.strip_prefix('#').unwrap_or(h);
        if !h.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::Validation(format!("'{input}' is not a hex color")));
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|e| AppError::Validation(e.to_string()));
        match h.len() {
            3 => {
                let expand = |i: usize| {
                    let c = &h[i..i + 1];
                    channel(&format!("{c}{c}"))
                };
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(channel(&h[0..2])?, channel(&h[2..4])?, channel(&h[4..6])?)),
            _ => Err(AppError::Validation(format!("'{input}' must have 3 or 6 hex digits"))),
        }
    }

    /// Look up a recognized color name.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, c)| *c)
    }

    /// Resolve arbitrary user text to a color. Never fails: invalid input is white.
    pub fn from_user_input(input: &str) -> Self {
        let sanitized = sanitize(input);
        Self::from_name(&sanitized)
            .or_else(|| Self::from_hex(&sanitized).ok())
            .unwrap_or(Self::WHITE)
    }

    /// Squared Euclidean distance in RGB space.
    pub fn distance_sq(&self, other: &Color) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).map_or_else(|| Self::from_hex(s), Ok)
    }
}

/// Normalize user color text: valid hex becomes uppercase `#RRGGBB`/`#RGB`,
/// a known name becomes lowercase, anything else becomes [`DEFAULT_COLOR_HEX`].
pub fn sanitize(input: &str) -> String {
    let v = input.trim();
    let is_hex = v
        .strip_prefix('#')
        .map(|h| (h.len() == 3 || h.len() == 6) && h.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);
    if is_hex {
        return v.to_ascii_uppercase();
    }
    let lower = v.to_ascii_lowercase();
    if NAMED_COLORS.iter().any(|(n, _)| *n == lower) {
        return lower;
    }
    DEFAULT_COLOR_HEX.to_string()
}

/// Coarse human name for a color (HSV buckets), used in generation prompts.
pub fn simple_name(color: Color) -> &'static str {
    let (r, g, b) = (color.r as f64, color.g as f64, color.b as f64);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let v = max / 255.0;
    let s = if max == 0.0 { 0.0 } else { (max - min) / max };

    let mut hue = 0.0;
    if max != min {
        hue = if max == r {
            (g - b) / (max - min)
        } else if max == g {
            2.0 + (b - r) / (max - min)
        } else {
            4.0 + (r - g) / (max - min)
        };
        hue *= 60.0;
        if hue < 0.0 {
            hue += 360.0;
        }
    }

    if v < 0.12 {
        return "black";
    }
    if s < 0.10 {
        return if v > 0.85 { "white" } else { "gray" };
    }
    match hue {
        h if !(15.0..345.0).contains(&h) => "red",
        h if h < 45.0 => "orange",
        h if h < 70.0 => "gold",
        h if h < 90.0 => "yellow-green",
        h if h < 135.0 => "green",
        h if h < 160.0 => "teal",
        h if h < 200.0 => "cyan",
        h if h < 225.0 => "sky blue",
        h if h < 250.0 => "blue",
        h if h < 275.0 => "indigo",
        h if h < 300.0 => "purple",
        h if h < 330.0 => "magenta",
        _ => "crimson",
    }
}

/// Human-readable label for sanitized color text (names pass through).
pub fn describe(sanitized: &str) -> String {
    if sanitized.starts_with('#') {
        Color::from_hex(sanitized)
            .map(|c| simple_name(c).to_string())
            .unwrap_or_else(|_| "white".into())
    } else {
        sanitized.to_string()
    }
}
