//! Annotation rendering: `(surface, result, scale, options) -> pixels`.
//!
//! Nothing in here knows about sessions, timers or the network.

mod annotate;
mod canvas;
mod color;
mod font;

pub use annotate::{annotate_frame, render_detections, DrawOptions, RenderSummary, Scale};
pub use canvas::{Canvas, Rect};
pub use color::{golden_angle_hue, hsl_to_rgb, instance_color};
pub use font::{text_height, text_width};
