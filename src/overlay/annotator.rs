/// Draw dashed highlight rectangles over a screenshot.
///
/// Every call paints onto its own fresh surface, so concurrent renders never
/// share state. The result is PNG so box edges survive byte-for-byte.
use base64::Engine as _;
use image::{DynamicImage, RgbaImage};

use crate::config::{parse_hex_color, OverlayConfig};
use crate::errors::{HighlightError, HighlightResult};
use crate::layout::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub dash_on: u32,
    pub dash_off: u32,
    pub stroke_width: u32,
    pub color: [u8; 4],
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            dash_on: 25,
            dash_off: 25,
            stroke_width: 15,
            color: [255, 255, 0, 255],
        }
    }
}

impl OverlayStyle {
    pub fn from_config(cfg: &OverlayConfig) -> HighlightResult<Self> {
        if cfg.dash_on == 0 {
            return Err(HighlightError::Config("overlay.dash_on must be > 0".into()));
        }
        Ok(Self {
            dash_on: cfg.dash_on,
            dash_off: cfg.dash_off,
            stroke_width: cfg.stroke_width,
            color: parse_hex_color(&cfg.color)?,
        })
    }

    /// Whether the stroke is inked at distance `s` along the path.
    fn is_on(&self, s: i64) -> bool {
        let period = (self.dash_on + self.dash_off) as i64;
        s.rem_euclid(period) < self.dash_on as i64
    }
}

/// Annotated screenshot, PNG-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl AnnotatedImage {
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }

    pub fn decode(&self) -> HighlightResult<DynamicImage> {
        Ok(image::load_from_memory_with_format(
            &self.png,
            image::ImageFormat::Png,
        )?)
    }
}

/// Copy `source` onto a new surface and stroke every box in input order.
///
/// Boxes with negative extent are skipped; zero-extent boxes still draw a line.
pub fn render(
    source: &DynamicImage,
    boxes: &[BoundingBox],
    style: &OverlayStyle,
) -> HighlightResult<AnnotatedImage> {
    let mut canvas: RgbaImage = source.to_rgba8();
    let (width, height) = canvas.dimensions();

    let mut drawn = 0usize;
    for bbox in boxes {
        if bbox.width() < 0 || bbox.height() < 0 {
            tracing::debug!(?bbox, "skipping box with negative extent");
            continue;
        }
        draw_dashed_rect(&mut canvas, bbox, style);
        drawn += 1;
    }

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| HighlightError::Render(format!("PNG encode: {e}")))?;

    tracing::debug!(width, height, boxes = drawn, bytes = png.len(), "overlay rendered");
    Ok(AnnotatedImage { width, height, png })
}

// ── Drawing primitives ──────────────────────────────────────────────────────

/// Stroke clockwise from the top-left corner with a continuous dash phase.
/// The stroke is centred on the edge, `stroke_width` pixels across, and
/// corners are filled square when the dash is on there.
fn draw_dashed_rect(canvas: &mut RgbaImage, bbox: &BoundingBox, style: &OverlayStyle) {
    let (l, t, r, b) = (
        bbox.left as i64,
        bbox.top as i64,
        bbox.right as i64,
        bbox.bottom as i64,
    );
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    let w = r - l;
    let h = b - t;
    let half = style.stroke_width as i64 / 2;
    let thick = style.stroke_width as i64;

    // Path distance at each corner: top-left, top-right, bottom-right, bottom-left.
    let corners = [(l, t, 0), (r, t, w), (r, b, w + h), (l, b, 2 * w + h)];
    for (cx, cy, s) in corners {
        if style.is_on(s) {
            paint_span(canvas, cx - half, cy - half, thick, thick, style.color);
        }
    }

    // Only steps whose pixel row/column lands on the canvas are walked.
    let mut s = 0i64;
    for step in visible_steps(l, w, cw, true) {
        if style.is_on(s + step) {
            paint_span(canvas, l + step, t - half, 1, thick, style.color);
        }
    }
    s += w;
    for step in visible_steps(t, h, ch, true) {
        if style.is_on(s + step) {
            paint_span(canvas, r - half, t + step, thick, 1, style.color);
        }
    }
    s += h;
    for step in visible_steps(r, w, cw, false) {
        if style.is_on(s + step) {
            paint_span(canvas, r - step, b - half, 1, thick, style.color);
        }
    }
    s += w;
    for step in visible_steps(b, h, ch, false) {
        if style.is_on(s + step) {
            paint_span(canvas, l - half, b - step, thick, 1, style.color);
        }
    }
}

/// Steps in `0..len` whose coordinate (`start ± step`) lies in `0..extent`.
fn visible_steps(start: i64, len: i64, extent: i64, forward: bool) -> std::ops::Range<i64> {
    if forward {
        (-start).max(0)..len.min(extent - start)
    } else {
        (start - extent + 1).max(0)..len.min(start + 1)
    }
}

/// Fill a `w`×`h` block at (`x`, `y`), clipped to the canvas.
fn paint_span(canvas: &mut RgbaImage, x: i64, y: i64, w: i64, h: i64, col: [u8; 4]) {
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(cw);
    let y1 = (y + h).min(ch);
    for py in y0..y1 {
        for px in x0..x1 {
            set_pixel(canvas, px as u32, py as u32, col);
        }
    }
}

fn set_pixel(canvas: &mut RgbaImage, x: u32, y: u32, col: [u8; 4]) {
    let p = canvas.get_pixel_mut(x, y);
    let a = col[3] as f32 / 255.0;
    p[0] = (p[0] as f32 * (1.0 - a) + col[0] as f32 * a).round() as u8;
    p[1] = (p[1] as f32 * (1.0 - a) + col[1] as f32 * a).round() as u8;
    p[2] = (p[2] as f32 * (1.0 - a) + col[2] as f32 * a).round() as u8;
    p[3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const YELLOW: Rgba<u8> = Rgba([255, 255, 0, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn black(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, BLACK))
    }

    fn rendered(source: &DynamicImage, boxes: &[BoundingBox]) -> RgbaImage {
        render(source, boxes, &OverlayStyle::default())
            .unwrap()
            .decode()
            .unwrap()
            .to_rgba8()
    }

    #[test]
    fn keeps_source_dimensions_and_pixels_without_boxes() {
        let src = black(40, 30);
        let out = render(&src, &[], &OverlayStyle::default()).unwrap();
        assert_eq!((out.width, out.height), (40, 30));
        assert_eq!(out.decode().unwrap().to_rgba8(), src.to_rgba8());
    }

    #[test]
    fn top_edge_is_dashed_25_on_25_off() {
        let img = rendered(&black(300, 300), &[BoundingBox::new(100, 100, 250, 250)]);
        // On: first 25 px of the top edge.
        assert_eq!(*img.get_pixel(100, 100), YELLOW);
        assert_eq!(*img.get_pixel(124, 100), YELLOW);
        // Off: the next 25 px.
        assert_eq!(*img.get_pixel(125, 100), BLACK);
        assert_eq!(*img.get_pixel(149, 100), BLACK);
        // On again.
        assert_eq!(*img.get_pixel(150, 100), YELLOW);
    }

    #[test]
    fn stroke_is_15px_wide_and_centred() {
        let img = rendered(&black(300, 300), &[BoundingBox::new(100, 100, 250, 250)]);
        assert_eq!(*img.get_pixel(110, 93), YELLOW);
        assert_eq!(*img.get_pixel(110, 107), YELLOW);
        assert_eq!(*img.get_pixel(110, 92), BLACK);
        assert_eq!(*img.get_pixel(110, 108), BLACK);
        // Interior untouched.
        assert_eq!(*img.get_pixel(175, 175), BLACK);
    }

    #[test]
    fn outer_corners_are_filled_when_dash_is_on() {
        let img = rendered(&black(300, 300), &[BoundingBox::new(100, 100, 250, 250)]);
        assert_eq!(*img.get_pixel(95, 95), YELLOW);
        assert_eq!(*img.get_pixel(93, 93), YELLOW);
        assert_eq!(*img.get_pixel(92, 92), BLACK);
    }

    #[test]
    fn huge_boxes_render_quickly_on_small_surfaces() {
        let started = std::time::Instant::now();
        let img = rendered(
            &black(100, 100),
            &[
                BoundingBox::new(0, 0, i32::MAX, i32::MAX),
                BoundingBox::new(50, 50, i32::MAX, i32::MAX),
            ],
        );
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert_eq!(*img.get_pixel(0, 0), YELLOW);
        assert_eq!(*img.get_pixel(50, 50), YELLOW);
        // Far edges are off-canvas; the interior stays clean.
        assert_eq!(*img.get_pixel(99, 99), BLACK);
    }

    #[test]
    fn visible_steps_clip_to_the_canvas() {
        assert_eq!(visible_steps(-10, 100, 20, true), 10..30);
        assert_eq!(visible_steps(0, i32::MAX as i64, 20, true), 0..20);
        assert_eq!(visible_steps(30, 25, 20, false), 11..25);
        assert!(visible_steps(500, 10, 20, true).is_empty());
    }

    #[test]
    fn boxes_beyond_the_surface_are_clipped() {
        let img = rendered(&black(20, 20), &[BoundingBox::new(0, 0, 1000, 1000)]);
        assert_eq!(img.dimensions(), (20, 20));
        assert_eq!(*img.get_pixel(0, 0), YELLOW);
    }

    #[test]
    fn inverted_boxes_are_skipped() {
        let src = black(50, 50);
        let img = rendered(&src, &[BoundingBox::new(40, 40, 10, 10)]);
        assert_eq!(img, src.to_rgba8());
    }

    #[test]
    fn source_is_not_mutated() {
        let src = black(60, 60);
        let before = src.to_rgba8();
        let _ = render(&src, &[BoundingBox::new(5, 5, 50, 50)], &OverlayStyle::default()).unwrap();
        assert_eq!(src.to_rgba8(), before);
    }

    #[test]
    fn data_url_is_base64_png() {
        let out = render(&black(4, 4), &[], &OverlayStyle::default()).unwrap();
        let url = out.to_data_url();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn style_from_config() {
        let style = OverlayStyle::from_config(&OverlayConfig::default()).unwrap();
        assert_eq!(style, OverlayStyle::default());

        let bad = OverlayConfig {
            dash_on: 0,
            ..OverlayConfig::default()
        };
        assert!(OverlayStyle::from_config(&bad).is_err());
    }
}
