//! Raster and vector export of processed logos.
//!
//! PNG is the mandatory, lossless output. The SVG trace is best-effort:
//! same-colored horizontal runs are merged down the rows into rectangles
//! and emitted as one `<path>` per palette color.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::error::AppError;

use super::quantize::ALPHA_THRESHOLD;

/// Vector output refuses images with more distinct opaque colors than this.
pub const MAX_VECTOR_COLORS: usize = 4;

/// Encode `img` as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Run {
    x0: u32,
    x1: u32,
    rgb: [u8; 3],
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

fn row_runs(img: &RgbaImage, y: u32) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut current: Option<Run> = None;
    for x in 0..img.width() {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        let px = (a >= ALPHA_THRESHOLD).then_some([r, g, b]);
        if let (Some(run), Some(rgb)) = (current.as_mut(), px) {
            if run.rgb == rgb {
                run.x1 = x;
                continue;
            }
        }
        if let Some(run) = current.take() {
            runs.push(run);
        }
        current = px.map(|rgb| Run { x0: x, x1: x, rgb });
    }
    runs.extend(current);
    runs
}

/// Trace `img` into an SVG document sized to the image.
pub fn trace_svg(img: &RgbaImage) -> Result<String, AppError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(AppError::Encode("cannot trace an empty image".into()));
    }

    let mut finished: Vec<([u8; 3], Rect)> = Vec::new();
    let mut open: HashMap<Run, Rect> = HashMap::new();
    let mut color_order: Vec<[u8; 3]> = Vec::new();

    for y in 0..height {
        let runs = row_runs(img, y);
        let mut next_open = HashMap::with_capacity(runs.len());
        for run in runs {
            if !color_order.contains(&run.rgb) {
                color_order.push(run.rgb);
                if color_order.len() > MAX_VECTOR_COLORS {
                    return Err(AppError::Encode(format!(
                        "image has more than {MAX_VECTOR_COLORS} colors; quantize before tracing"
                    )));
                }
            }
            let rect = match open.remove(&run) {
                Some(mut r) => {
                    r.h += 1;
                    r
                }
                None => Rect { x: run.x0, y, w: run.x1 - run.x0 + 1, h: 1 },
            };
            next_open.insert(run, rect);
        }
        finished.extend(open.drain().map(|(run, rect)| (run.rgb, rect)));
        open = next_open;
    }
    finished.extend(open.drain().map(|(run, rect)| (run.rgb, rect)));

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" shape-rendering="crispEdges">"#
    );
    for rgb in &color_order {
        let mut rects: Vec<&Rect> = finished.iter().filter(|(c, _)| c == rgb).map(|(_, r)| r).collect();
        rects.sort_by_key(|r| (r.y, r.x));
        let _ = write!(svg, r##"<path fill="#{:02X}{:02X}{:02X}" d=""##, rgb[0], rgb[1], rgb[2]);
        for r in rects {
            let _ = write!(svg, "M{} {}h{}v{}h-{}z", r.x, r.y, r.w, r.h, r.w);
        }
        svg.push_str(r#""/>"#);
    }
    svg.push_str("</svg>");
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_is_lossless() {
        let mut img = RgbaImage::from_pixel(6, 4, Rgba([255, 255, 255, 255]));
        img.put_pixel(1, 1, Rgba([0xC6, 0x0C, 0x30, 255]));
        img.put_pixel(2, 3, Rgba([0, 0, 0, 0]));
        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), img.as_raw());
    }

    #[test]
    fn test_trace_merges_rows_into_rectangles() {
        let mut img = RgbaImage::from_pixel(4, 3, Rgba([0, 0, 0, 0]));
        for y in 0..2 {
            for x in 1..3 {
                img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let svg = trace_svg(&img).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r##"fill="#FF0000""##));
        assert!(svg.contains("M1 0h2v2h-2z"));
        assert_eq!(svg.matches("<path").count(), 1);
    }

    #[test]
    fn test_trace_one_path_per_color() {
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([255, 255, 255, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let svg = trace_svg(&img).unwrap();
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains("M0 0h1v1h-1z"));
        assert!(svg.contains("M2 0h1v1h-1z"));
    }

    #[test]
    fn test_trace_rejects_unquantized() {
        let mut img = RgbaImage::new(5, 1);
        for x in 0..5 {
            img.put_pixel(x, 0, Rgba([x as u8 * 10, 0, 0, 255]));
        }
        assert!(matches!(trace_svg(&img), Err(AppError::Encode(_))));
    }
}
