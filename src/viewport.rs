//! Zoom, pan and prompt-drawing state for the image view.
//!
//! Display coordinates are pixels on the host's surface; source coordinates
//! are pixels of the frame the model sees. The view draws the frame scaled
//! to the surface, then zoomed about the surface centre, then panned.

use serde::Serialize;

use crate::models::Prompt;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 5.0;
pub const ZOOM_STEP: f32 = 0.25;
const UNIT_ZOOM: f32 = 1.0;
/// Boxes narrower or shorter than this (in display pixels) are treated as clicks.
const MIN_BOX_EXTENT: f32 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportState {
    pub zoom_level: f32,
    pub pan_offset: Point,
    pub is_panning: bool,
    #[serde(skip)]
    pan_anchor: Option<Point>,
    #[serde(skip)]
    box_drag: Option<(Point, Point)>,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom_level: UNIT_ZOOM,
            pan_offset: Point::ORIGIN,
            is_panning: false,
            pan_anchor: None,
            box_drag: None,
        }
    }
}

impl ViewportState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoom_level > UNIT_ZOOM
    }

    /// Clamp to `[MIN_ZOOM, MAX_ZOOM]`. Returning to unit zoom recentres.
    pub fn set_zoom(&mut self, zoom: f32) {
        if !zoom.is_finite() {
            return;
        }
        self.zoom_level = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if (self.zoom_level - UNIT_ZOOM).abs() < f32::EPSILON {
            self.zoom_level = UNIT_ZOOM;
            self.pan_offset = Point::ORIGIN;
        }
        if !self.is_zoomed() {
            self.end_pan();
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom_level + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom_level - ZOOM_STEP);
    }

    /// Scroll up (negative delta) zooms in.
    pub fn wheel(&mut self, delta_y: f32) {
        if delta_y < 0.0 {
            self.zoom_in();
        } else if delta_y > 0.0 {
            self.zoom_out();
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Panning only starts while zoomed in.
    pub fn start_pan(&mut self, at: Point) -> bool {
        if !self.is_zoomed() {
            return false;
        }
        self.is_panning = true;
        self.pan_anchor = Some(Point::new(at.x - self.pan_offset.x, at.y - self.pan_offset.y));
        true
    }

    pub fn pan_to(&mut self, at: Point) {
        if let (true, Some(anchor)) = (self.is_panning, self.pan_anchor) {
            self.pan_offset = Point::new(at.x - anchor.x, at.y - anchor.y);
        }
    }

    pub fn end_pan(&mut self) {
        self.is_panning = false;
        self.pan_anchor = None;
    }

    /// Map a display point to source pixels, undoing pan, zoom and the
    /// display/source scale.
    pub fn display_to_source(&self, at: Point, display: (u32, u32), source: (u32, u32)) -> Point {
        let centre = Point::new(display.0 as f32 / 2.0, display.1 as f32 / 2.0);
        let unzoomed = Point::new(
            (at.x - self.pan_offset.x - centre.x) / self.zoom_level + centre.x,
            (at.y - self.pan_offset.y - centre.y) / self.zoom_level + centre.y,
        );
        let scale_x = if display.0 == 0 { 1.0 } else { source.0 as f32 / display.0 as f32 };
        let scale_y = if display.1 == 0 { 1.0 } else { source.1 as f32 / display.1 as f32 };
        Point::new(
            (unzoomed.x * scale_x).clamp(0.0, source.0 as f32),
            (unzoomed.y * scale_y).clamp(0.0, source.1 as f32),
        )
    }

    pub fn begin_box(&mut self, at: Point) {
        self.box_drag = Some((at, at));
    }

    pub fn drag_box(&mut self, at: Point) {
        if let Some((start, _)) = self.box_drag {
            self.box_drag = Some((start, at));
        }
    }

    /// Box being drawn, in display pixels, normalised so `x1 <= x2`.
    pub fn pending_box(&self) -> Option<[f32; 4]> {
        self.box_drag.map(|(a, b)| [a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y)])
    }

    /// Finish the drag and convert it to a source-space box prompt. A drag
    /// too small to be intentional yields `None`.
    pub fn finish_box(&mut self, display: (u32, u32), source: (u32, u32)) -> Option<Prompt> {
        let [x1, y1, x2, y2] = self.pending_box()?;
        self.box_drag = None;
        if x2 - x1 < MIN_BOX_EXTENT || y2 - y1 < MIN_BOX_EXTENT {
            return None;
        }
        let top_left = self.display_to_source(Point::new(x1, y1), display, source);
        let bottom_right = self.display_to_source(Point::new(x2, y2), display, source);
        Some(Prompt::Box {
            x1: top_left.x,
            y1: top_left.y,
            x2: bottom_right.x,
            y2: bottom_right.y,
        })
    }

    pub fn cancel_box(&mut self) {
        self.box_drag = None;
    }

    pub fn point_prompt(
        &self,
        at: Point,
        positive: bool,
        display: (u32, u32),
        source: (u32, u32),
    ) -> Prompt {
        let p = self.display_to_source(at, display, source);
        Prompt::Point {
            x: p.x,
            y: p.y,
            positive,
        }
    }
}
