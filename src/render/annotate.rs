use image::{Rgba, RgbaImage};

use crate::models::{DetectionResult, Frame, TaskType};

use super::{
    canvas::{Canvas, Rect},
    color::instance_color,
    font::{text_height, text_width},
};

const LABEL_TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BANNER_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 180]);
const BANNER_MARGIN: f32 = 8.0;

/// Independent horizontal and vertical factors from source-resolution
/// coordinates to display pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Scale {
    pub const IDENTITY: Scale = Scale { x: 1.0, y: 1.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// `display / source` per axis. A degenerate source gives identity.
    pub fn between(display: (u32, u32), source: (u32, u32)) -> Self {
        if source.0 == 0 || source.1 == 0 {
            return Self::IDENTITY;
        }
        Self {
            x: display.0 as f32 / source.0 as f32,
            y: display.1 as f32 / source.1 as f32,
        }
    }

    pub fn apply_point(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.x, y * self.y)
    }

    pub fn apply_box(&self, b: [f32; 4]) -> [f32; 4] {
        [b[0] * self.x, b[1] * self.y, b[2] * self.x, b[3] * self.y]
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawOptions {
    pub line_width: u32,
    pub text_scale: u32,
    pub label_padding: u32,
    /// Alpha applied to mask fills.
    pub mask_alpha: u8,
    /// `None` colours each box by its index, like masks.
    pub box_color: Option<Rgba<u8>>,
    pub show_labels: bool,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            line_width: 2,
            text_scale: 2,
            label_padding: 3,
            mask_alpha: 102,
            box_color: None,
            show_labels: true,
        }
    }
}

/// What one render pass put on the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub labeled_boxes: usize,
    pub masks: usize,
    pub banner: bool,
}

pub fn score_label(class_name: &str, score: f32) -> String {
    format!("{} {:.1}%", class_name, score * 100.0)
}

/// Draw `result` over a surface that already holds the source frame.
pub fn render_detections<C: Canvas + ?Sized>(
    canvas: &mut C,
    result: &DetectionResult,
    scale: Scale,
    options: &DrawOptions,
) -> RenderSummary {
    let mut summary = RenderSummary::default();

    match result.task_type {
        TaskType::Detect => {
            let rows = result
                .boxes
                .len()
                .min(result.scores.len())
                .min(result.class_names.len());
            for i in 0..rows {
                let color = options
                    .box_color
                    .unwrap_or_else(|| instance_color(i, 255));
                let rect = Rect::from_box(scale.apply_box(result.boxes[i]));
                draw_labeled_box(
                    canvas,
                    rect,
                    &score_label(&result.class_names[i], result.scores[i]),
                    color,
                    options,
                );
                summary.labeled_boxes += 1;
            }
        }
        TaskType::Segment => {
            for (i, mask) in result.masks.iter().enumerate() {
                let points: Vec<(f32, f32)> = mask
                    .polygon
                    .iter()
                    .map(|[x, y]| scale.apply_point(*x, *y))
                    .collect();
                canvas.fill_polygon(&points, instance_color(i, options.mask_alpha));
                summary.masks += 1;

                if let Some(bounds) = mask.bounding_box() {
                    let rect = Rect::from_box(scale.apply_box(bounds));
                    draw_labeled_box(
                        canvas,
                        rect,
                        &score_label(&mask.class_name, mask.score),
                        instance_color(i, 255),
                        options,
                    );
                    summary.labeled_boxes += 1;
                }
            }
        }
        TaskType::Classify => {
            if let (Some(class), Some(confidence)) = (&result.top_class, result.top_confidence) {
                draw_banner(canvas, &score_label(class, confidence), options);
                summary.banner = true;
            }
        }
    }

    summary
}

fn draw_labeled_box<C: Canvas + ?Sized>(
    canvas: &mut C,
    rect: Rect,
    label: &str,
    color: Rgba<u8>,
    options: &DrawOptions,
) {
    canvas.stroke_rect(rect, color, options.line_width);
    if !options.show_labels {
        return;
    }

    let pad = options.label_padding as f32;
    let chip_w = text_width(label, options.text_scale) as f32 + pad * 2.0;
    let chip_h = text_height(options.text_scale) as f32 + pad * 2.0;
    // Above the box when there is room, otherwise tucked inside its top edge.
    let chip_y = if rect.y1 - chip_h >= 0.0 {
        rect.y1 - chip_h
    } else {
        rect.y1
    };
    let chip = Rect::new(rect.x1, chip_y, rect.x1 + chip_w, chip_y + chip_h);
    canvas.fill_rect(chip, color);
    canvas.draw_text(
        chip.x1 + pad,
        chip.y1 + pad,
        label,
        LABEL_TEXT_COLOR,
        options.text_scale,
    );
}

fn draw_banner<C: Canvas + ?Sized>(canvas: &mut C, label: &str, options: &DrawOptions) {
    let (width, _) = canvas.dimensions();
    let pad = options.label_padding as f32 * 2.0;
    let banner_w = text_width(label, options.text_scale) as f32 + pad * 2.0;
    let banner_h = text_height(options.text_scale) as f32 + pad * 2.0;
    let x = ((width as f32 - banner_w) / 2.0).max(0.0);
    let banner = Rect::new(x, BANNER_MARGIN, x + banner_w, BANNER_MARGIN + banner_h);

    canvas.fill_rect(banner, BANNER_BACKGROUND);
    canvas.draw_text(
        banner.x1 + pad,
        banner.y1 + pad,
        label,
        LABEL_TEXT_COLOR,
        options.text_scale,
    );
}

/// Copy `frame` and draw `result` on the copy. Coordinates are scaled when
/// the result was computed against a different resolution.
pub fn annotate_frame(frame: &Frame, result: &DetectionResult, options: &DrawOptions) -> RgbaImage {
    let mut surface: RgbaImage = frame.image.as_ref().clone();
    let display = RgbaImage::dimensions(&surface);
    let scale = result
        .source_size
        .map(|source| Scale::between(display, source))
        .unwrap_or_default();
    render_detections(&mut surface, result, scale, options);
    surface
}
