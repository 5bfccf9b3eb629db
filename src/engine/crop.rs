//! Bounding-box auto-crop.
//!
//! One full scan tracks the min/max coordinates of foreground pixels
//! (not near-white, not transparent). The box is padded by 2% of the larger
//! side, clamped, and copied out into a new buffer.

use image::{GenericImageView, RgbaImage};

use super::quantize::ALPHA_THRESHOLD;

/// Channels strictly above this on all of r, g, b count as background.
pub const NEAR_WHITE: u8 = 245;

/// Padding as a fraction of `max(width, height)`.
const PADDING_RATIO: f64 = 0.02;

/// Inclusive pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Result of [`auto_crop`]; `origin` is the top-left of the crop in the source.
#[derive(Debug, Clone)]
pub struct Cropped {
    pub image: RgbaImage,
    pub origin: (u32, u32),
}

fn is_foreground(px: &image::Rgba<u8>) -> bool {
    let [r, g, b, a] = px.0;
    if a < ALPHA_THRESHOLD {
        return false;
    }
    !(r > NEAR_WHITE && g > NEAR_WHITE && b > NEAR_WHITE)
}

/// Padded, clamped bounding box of foreground pixels, or `None` when the
/// image has no foreground at all.
pub fn content_bounds(img: &RgbaImage) -> Option<BoundingBox> {
    let (width, height) = img.dimensions();
    let mut found: Option<BoundingBox> = None;

    for (x, y, px) in img.enumerate_pixels() {
        if !is_foreground(px) {
            continue;
        }
        found = Some(match found {
            None => BoundingBox { min_x: x, min_y: y, max_x: x, max_y: y },
            Some(b) => BoundingBox {
                min_x: b.min_x.min(x),
                min_y: b.min_y.min(y),
                max_x: b.max_x.max(x),
                max_y: b.max_y.max(y),
            },
        });
    }

    let b = found?;
    let pad = (width.max(height) as f64 * PADDING_RATIO).floor() as u32;
    Some(BoundingBox {
        min_x: b.min_x.saturating_sub(pad),
        min_y: b.min_y.saturating_sub(pad),
        max_x: (b.max_x + pad).min(width - 1),
        max_y: (b.max_y + pad).min(height - 1),
    })
}

/// Crop `img` to its content. With no foreground the original is returned
/// unchanged (as a copy) with origin `(0, 0)`.
pub fn auto_crop(img: &RgbaImage) -> Cropped {
    match content_bounds(img) {
        Some(b) => Cropped {
            image: img.view(b.min_x, b.min_y, b.width(), b.height()).to_image(),
            origin: (b.min_x, b.min_y),
        },
        None => Cropped {
            image: img.clone(),
            origin: (0, 0),
        },
    }
}
