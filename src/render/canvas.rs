use image::{Rgba, RgbaImage};

use super::font::{glyph, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Rectangle in display pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Rect {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_box(b: [f32; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// Raster surface the renderer draws on. The surface already contains the
/// source frame.
pub trait Canvas {
    fn dimensions(&self) -> (u32, u32);

    fn stroke_rect(&mut self, rect: Rect, color: Rgba<u8>, thickness: u32);

    /// Alpha-blended fill.
    fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>);

    /// Alpha-blended even-odd fill.
    fn fill_polygon(&mut self, points: &[(f32, f32)], color: Rgba<u8>);

    /// `(x, y)` is the top-left corner of the first glyph.
    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Rgba<u8>, scale: u32);
}

fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let alpha = src[3] as f32 / 255.0;
    if alpha >= 1.0 {
        *dst = src;
        return;
    }
    for channel in 0..3 {
        let mixed = src[channel] as f32 * alpha + dst[channel] as f32 * (1.0 - alpha);
        dst[channel] = mixed.round() as u8;
    }
    dst[3] = dst[3].max(src[3]);
}

/// Clamp a span of pixel coordinates to `[0, max)`; `None` when empty.
fn pixel_span(start: f32, end: f32, max: u32) -> Option<(u32, u32)> {
    if max == 0 {
        return None;
    }
    let lo = start.min(end).floor().max(0.0);
    let hi = start.max(end).ceil().min(max as f32) - 1.0;
    if hi < lo {
        return None;
    }
    Some((lo as u32, hi as u32))
}

fn blend_pixel(img: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>) {
    if x < img.width() && y < img.height() {
        blend(img.get_pixel_mut(x, y), color);
    }
}

impl Canvas for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbaImage::dimensions(self)
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgba<u8>, thickness: u32) {
        let (w, h) = RgbaImage::dimensions(self);
        let Some((x0, x1)) = pixel_span(rect.x1, rect.x2, w) else {
            return;
        };
        let Some((y0, y1)) = pixel_span(rect.y1, rect.y2, h) else {
            return;
        };

        for t in 0..thickness.max(1) {
            let xx0 = x0 + t;
            let yy0 = y0 + t;
            let xx1 = x1.saturating_sub(t);
            let yy1 = y1.saturating_sub(t);
            if xx0 > xx1 || yy0 > yy1 {
                break;
            }
            for x in xx0..=xx1 {
                blend_pixel(self, x, yy0, color);
                if yy1 != yy0 {
                    blend_pixel(self, x, yy1, color);
                }
            }
            for y in (yy0 + 1)..yy1 {
                blend_pixel(self, xx0, y, color);
                if xx1 != xx0 {
                    blend_pixel(self, xx1, y, color);
                }
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>) {
        let (w, h) = RgbaImage::dimensions(self);
        let Some((x0, x1)) = pixel_span(rect.x1, rect.x2, w) else {
            return;
        };
        let Some((y0, y1)) = pixel_span(rect.y1, rect.y2, h) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                blend_pixel(self, x, y, color);
            }
        }
    }

    fn fill_polygon(&mut self, points: &[(f32, f32)], color: Rgba<u8>) {
        if points.len() < 3 {
            return;
        }
        let (w, h) = RgbaImage::dimensions(self);
        let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
        let Some((row_start, row_end)) = pixel_span(min_y, max_y, h) else {
            return;
        };

        let mut crossings: Vec<f32> = Vec::with_capacity(points.len());
        for row in row_start..=row_end {
            // Sample at pixel centres.
            let sample_y = row as f32 + 0.5;
            crossings.clear();
            for (i, &(ax, ay)) in points.iter().enumerate() {
                let (bx, by) = points[(i + 1) % points.len()];
                if (ay <= sample_y && by > sample_y) || (by <= sample_y && ay > sample_y) {
                    let t = (sample_y - ay) / (by - ay);
                    crossings.push(ax + t * (bx - ax));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));

            for pair in crossings.chunks_exact(2) {
                let start = (pair[0] - 0.5).ceil().max(0.0);
                let end = (pair[1] - 0.5).floor().min(w as f32 - 1.0);
                if end < start {
                    continue;
                }
                for x in start as u32..=end as u32 {
                    blend_pixel(self, x, row, color);
                }
            }
        }
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Rgba<u8>, scale: u32) {
        let scale = scale.max(1);
        let origin_x = x.round() as i64;
        let origin_y = y.round() as i64;

        for (index, c) in text.chars().enumerate() {
            let rows = glyph(c);
            let glyph_x = origin_x + (index as u32 * GLYPH_ADVANCE * scale) as i64;
            for (row, bits) in rows.iter().enumerate().take(GLYPH_HEIGHT as usize) {
                for col in 0..GLYPH_WIDTH {
                    if bits & (0b100 >> col) == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = glyph_x + (col * scale + dx) as i64;
                            let py = origin_y + (row as u32 * scale + dy) as i64;
                            if px >= 0 && py >= 0 {
                                blend_pixel(self, px as u32, py as u32, color);
                            }
                        }
                    }
                }
            }
        }
    }
}
