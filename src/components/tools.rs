//! The drawing tools and the coordinator that dispatches pointer gestures
//! to whichever tool is active.
//!
//! Every tool follows the same contract: `pointer_began` / `pointer_moved` /
//! `pointer_ended` (cancel is treated identically to end).  Freehand tools
//! rasterize straight into the canvas as the pointer moves; shape tools only
//! update the preview overlay during the drag and commit on end.  Switching
//! tools discards any in-flight gesture state — an abandoned drag commits
//! nothing.

use std::time::Duration;

use egui::{Color32, Pos2};
use rand::Rng;

use crate::canvas::{color32, CanvasEvent, PaintCanvas, Preview, BACKGROUND};
use crate::ops::shapes::ShapePath;
use crate::ops::strokes::CapStyle;

/// Cadence at which the host must call [`ToolManager::airbrush_tick`] while
/// the Airbrush is armed, on the same thread as the gesture events.
pub const SPRAY_INTERVAL: Duration = Duration::from_millis(33);

// ============================================================================
// TOOL SELECTION & SETTINGS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Pencil,
    Brush,
    Airbrush,
    Line,
    Rectangle,
    Ellipse,
    Eraser,
    Fill,
    ColorPicker,
    Text,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pencil => "Pencil",
            Tool::Brush => "Brush",
            Tool::Airbrush => "Airbrush",
            Tool::Line => "Line",
            Tool::Rectangle => "Rect",
            Tool::Ellipse => "Ellipse",
            Tool::Eraser => "Eraser",
            Tool::Fill => "Fill",
            Tool::ColorPicker => "Picker",
            Tool::Text => "Text",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[
            Tool::Pencil,
            Tool::Brush,
            Tool::Airbrush,
            Tool::Line,
            Tool::Rectangle,
            Tool::Ellipse,
            Tool::Eraser,
            Tool::Fill,
            Tool::ColorPicker,
            Tool::Text,
        ]
    }
}

/// Stroke width presets, in logical points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StrokeSize {
    #[default]
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl StrokeSize {
    pub fn line_width(self) -> f32 {
        match self {
            StrokeSize::Small => 1.0,
            StrokeSize::Medium => 3.0,
            StrokeSize::Large => 5.0,
            StrokeSize::ExtraLarge => 8.0,
        }
    }

    pub fn all() -> &'static [StrokeSize] {
        &[
            StrokeSize::Small,
            StrokeSize::Medium,
            StrokeSize::Large,
            StrokeSize::ExtraLarge,
        ]
    }
}

/// Shared tool settings.  Mutated only through explicit setters (UI or the
/// ColorPicker); read by the active tool at event time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolSettings {
    pub primary_color: Color32,
    pub secondary_color: Color32,
    pub stroke_size: StrokeSize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            primary_color: Color32::BLACK,
            secondary_color: Color32::WHITE,
            stroke_size: StrokeSize::Small,
        }
    }
}

/// Per-preset Airbrush parameters: scatter radius, dot diameter and dots per
/// tick, all in logical points.
struct SprayPreset {
    radius: f32,
    dot_diameter: f32,
    count: usize,
}

fn spray_preset(size: StrokeSize) -> SprayPreset {
    match size {
        StrokeSize::Small => SprayPreset { radius: 6.0, dot_diameter: 1.0, count: 10 },
        StrokeSize::Medium => SprayPreset { radius: 10.0, dot_diameter: 1.5, count: 18 },
        StrokeSize::Large => SprayPreset { radius: 14.0, dot_diameter: 2.0, count: 26 },
        StrokeSize::ExtraLarge => SprayPreset { radius: 18.0, dot_diameter: 2.5, count: 34 },
    }
}

// ============================================================================
// TOOL MANAGER
// ============================================================================

/// Owns the shared settings, the active tool and its transient gesture
/// state.  Single-threaded: all calls arrive from the UI event loop.
pub struct ToolManager {
    settings: ToolSettings,
    active: Tool,
    /// Last stroke point of an in-flight freehand gesture.
    last_point: Option<Pos2>,
    /// Drag start of an in-flight shape gesture.
    shape_start: Option<Pos2>,
    /// Last known pointer position while the Airbrush is armed.
    spray_center: Option<Pos2>,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self {
            settings: ToolSettings::default(),
            active: Tool::default(),
            last_point: None,
            shape_start: None,
            spray_center: None,
        }
    }

    pub fn active_tool(&self) -> Tool {
        self.active
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn set_primary_color(&mut self, color: Color32) {
        self.settings.primary_color = color;
    }

    pub fn set_secondary_color(&mut self, color: Color32) {
        self.settings.secondary_color = color;
    }

    pub fn set_stroke_size(&mut self, size: StrokeSize) {
        self.settings.stroke_size = size;
    }

    /// Switch tools.  Discards any in-flight gesture state of the previous
    /// tool (an in-progress drag is abandoned, not committed) and clears the
    /// preview overlay.
    pub fn set_active_tool(&mut self, tool: Tool, canvas: &mut PaintCanvas) {
        self.active = tool;
        self.reset_gesture(canvas);
    }

    fn reset_gesture(&mut self, canvas: &mut PaintCanvas) {
        self.last_point = None;
        self.shape_start = None;
        self.spray_center = None;
        canvas.clear_preview();
    }

    /// True while the Airbrush wants periodic [`Self::airbrush_tick`] calls.
    pub fn spray_armed(&self) -> bool {
        self.spray_center.is_some()
    }

    // ---- gesture events ---------------------------------------------------

    pub fn pointer_began(&mut self, point: Pos2, canvas: &mut PaintCanvas) {
        match self.active {
            // A tap must leave a visible mark, so freehand tools draw a
            // zero-length dot immediately.
            Tool::Pencil | Tool::Brush | Tool::Eraser => {
                self.last_point = Some(point);
                let (color, width, cap) = self.freehand_style();
                canvas.draw_segment(point, point, color, width, cap);
            }
            Tool::Airbrush => {
                self.spray_center = Some(point);
            }
            Tool::Line | Tool::Rectangle | Tool::Ellipse => {
                self.shape_start = Some(point);
                canvas.set_preview(self.shape_preview(point, point));
            }
            Tool::Fill => {
                canvas.flood_fill(point, self.settings.primary_color);
            }
            Tool::ColorPicker => {
                if let Some(px) = canvas.sample(point) {
                    let picked = color32(px);
                    self.settings.primary_color = picked;
                    canvas.push_event(CanvasEvent::ColorPicked(picked));
                }
            }
            Tool::Text => {
                canvas.push_event(CanvasEvent::TextRequested(point));
            }
        }
    }

    pub fn pointer_moved(&mut self, point: Pos2, canvas: &mut PaintCanvas) {
        match self.active {
            Tool::Pencil | Tool::Brush | Tool::Eraser => {
                let Some(last) = self.last_point else {
                    self.last_point = Some(point);
                    return;
                };
                let (color, width, cap) = self.freehand_style();
                canvas.draw_segment(last, point, color, width, cap);
                self.last_point = Some(point);
            }
            Tool::Airbrush => {
                // Drawing happens on timer ticks only; just track the pointer.
                if self.spray_center.is_some() {
                    self.spray_center = Some(point);
                }
            }
            Tool::Line | Tool::Rectangle | Tool::Ellipse => {
                let Some(start) = self.shape_start else {
                    return;
                };
                canvas.set_preview(self.shape_preview(start, point));
            }
            Tool::Fill | Tool::ColorPicker | Tool::Text => {}
        }
    }

    pub fn pointer_ended(&mut self, point: Pos2, canvas: &mut PaintCanvas) {
        match self.active {
            Tool::Pencil | Tool::Brush | Tool::Eraser => {
                if let Some(last) = self.last_point.take() {
                    let (color, width, cap) = self.freehand_style();
                    canvas.draw_segment(last, point, color, width, cap);
                }
            }
            Tool::Airbrush => {
                self.spray_center = None;
            }
            Tool::Line | Tool::Rectangle | Tool::Ellipse => {
                if let Some(start) = self.shape_start.take() {
                    // Clear-then-commit is the atomic swap from preview to
                    // committed pixels; both happen within this one call.
                    let preview = self.shape_preview(start, point);
                    canvas.clear_preview();
                    canvas.draw_path(&preview.path, preview.color, preview.width, preview.cap);
                }
            }
            Tool::Fill | Tool::ColorPicker | Tool::Text => {}
        }
    }

    /// Treated identically to `pointer_ended`: no partial-stroke artifacts,
    /// no dangling spray state.
    pub fn pointer_cancelled(&mut self, point: Pos2, canvas: &mut PaintCanvas) {
        self.pointer_ended(point, canvas);
    }

    /// One Airbrush burst.  The host calls this every [`SPRAY_INTERVAL`]
    /// while [`Self::spray_armed`], from the event thread.
    pub fn airbrush_tick(&mut self, canvas: &mut PaintCanvas) {
        let Some(center) = self.spray_center else {
            return;
        };
        let preset = spray_preset(self.settings.stroke_size);
        let mut rng = rand::thread_rng();
        let mut points = Vec::with_capacity(preset.count);
        for _ in 0..preset.count {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            // sqrt of a uniform sample gives uniform *area* density inside
            // the disc instead of clustering toward the center.
            let distance = rng.gen_range(0.0f32..=1.0).sqrt() * preset.radius;
            points.push(Pos2::new(
                center.x + angle.cos() * distance,
                center.y + angle.sin() * distance,
            ));
        }
        canvas.draw_dots(&points, self.settings.primary_color, preset.dot_diameter);
    }

    // ---- helpers ----------------------------------------------------------

    /// Color, width and cap for the current freehand tool.  The Pencil is a
    /// hairline regardless of the configured stroke size; the Eraser paints
    /// the canvas background.
    fn freehand_style(&self) -> (Color32, f32, CapStyle) {
        let width = self.settings.stroke_size.line_width();
        match self.active {
            Tool::Pencil => (self.settings.primary_color, 1.0, CapStyle::Flat),
            Tool::Brush => (self.settings.primary_color, width, CapStyle::Round),
            Tool::Eraser => (color32(BACKGROUND), width, CapStyle::Flat),
            _ => (self.settings.primary_color, width, CapStyle::Round),
        }
    }

    fn shape_preview(&self, start: Pos2, current: Pos2) -> Preview {
        let path = match self.active {
            Tool::Line => ShapePath::Segment { from: start, to: current },
            Tool::Rectangle => ShapePath::Rect { a: start, b: current },
            _ => ShapePath::Ellipse { a: start, b: current },
        };
        Preview {
            path,
            color: self.settings.primary_color,
            width: self.settings.stroke_size.line_width(),
            cap: CapStyle::Flat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::rgba;
    use egui::{pos2, vec2};
    use image::Rgba;

    fn canvas() -> PaintCanvas {
        PaintCanvas::new(vec2(100.0, 100.0), 1.0).expect("canvas")
    }

    fn non_background_count(canvas: &PaintCanvas) -> usize {
        let img = canvas.export_image();
        img.pixels().filter(|p| **p != BACKGROUND).count()
    }

    #[test]
    fn pencil_is_always_one_pixel_wide() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        tools.set_stroke_size(StrokeSize::ExtraLarge);

        tools.pointer_began(pos2(10.0, 50.0), &mut canvas);
        tools.pointer_moved(pos2(60.0, 50.0), &mut canvas);
        tools.pointer_ended(pos2(60.0, 50.0), &mut canvas);

        // The horizontal stroke must not bleed more than one pixel above or
        // below its row (integer-coordinate stamps can touch two rows).
        let img = canvas.export_image();
        for y in 0..100u32 {
            let row_marked = (0..100u32).any(|x| img.get_pixel(x, y) != &BACKGROUND);
            assert_eq!(row_marked, (49..=50).contains(&y), "unexpected mark state in row {}", y);
        }
    }

    #[test]
    fn brush_width_follows_stroke_size() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        tools.set_active_tool(Tool::Brush, &mut canvas);
        tools.set_stroke_size(StrokeSize::ExtraLarge);

        tools.pointer_began(pos2(20.0, 50.5), &mut canvas);
        tools.pointer_moved(pos2(80.0, 50.5), &mut canvas);
        tools.pointer_ended(pos2(80.0, 50.5), &mut canvas);

        // An 8-wide round-cap stroke along y=50.5 must reach rows 47 and 53
        // (tangent pixels may add one more row either side, never two).
        let img = canvas.export_image();
        let marked_rows: Vec<u32> = (0..100u32)
            .filter(|&y| (0..100u32).any(|x| img.get_pixel(x, y) != &BACKGROUND))
            .collect();
        assert!(marked_rows.contains(&47) && marked_rows.contains(&53), "rows: {:?}", marked_rows);
        assert!(!marked_rows.contains(&45) && !marked_rows.contains(&56), "rows: {:?}", marked_rows);
    }

    #[test]
    fn eraser_paints_background_color() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        canvas.flood_fill(pos2(50.0, 50.0), Color32::BLACK);

        tools.set_active_tool(Tool::Eraser, &mut canvas);
        tools.set_stroke_size(StrokeSize::Large);
        tools.pointer_began(pos2(50.0, 50.0), &mut canvas);
        tools.pointer_ended(pos2(50.0, 50.0), &mut canvas);

        assert_eq!(canvas.sample(pos2(50.0, 50.0)), Some(BACKGROUND));
    }

    #[test]
    fn tap_with_brush_leaves_a_mark() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        tools.set_active_tool(Tool::Brush, &mut canvas);
        tools.pointer_began(pos2(30.0, 30.0), &mut canvas);
        tools.pointer_ended(pos2(30.0, 30.0), &mut canvas);
        assert!(non_background_count(&canvas) > 0);
    }

    #[test]
    fn shape_drag_previews_without_committing() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        tools.set_active_tool(Tool::Rectangle, &mut canvas);

        tools.pointer_began(pos2(10.0, 10.0), &mut canvas);
        tools.pointer_moved(pos2(70.0, 40.0), &mut canvas);

        assert!(canvas.preview().is_some());
        assert_eq!(non_background_count(&canvas), 0, "drag must not touch the buffer");

        tools.pointer_ended(pos2(70.0, 40.0), &mut canvas);
        assert!(canvas.preview().is_none(), "preview must clear on commit");
        assert!(non_background_count(&canvas) > 0, "commit must rasterize");
    }

    #[test]
    fn switching_tools_abandons_in_flight_shape() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        tools.set_active_tool(Tool::Line, &mut canvas);

        tools.pointer_began(pos2(10.0, 10.0), &mut canvas);
        tools.pointer_moved(pos2(90.0, 90.0), &mut canvas);
        tools.set_active_tool(Tool::Brush, &mut canvas);

        assert!(canvas.preview().is_none(), "switch must drop the preview");
        assert_eq!(non_background_count(&canvas), 0, "abandoned drag must not commit");

        // A later end event from the stale gesture must also be inert.
        tools.pointer_ended(pos2(90.0, 90.0), &mut canvas);
        assert_eq!(non_background_count(&canvas), 0);
    }

    #[test]
    fn switching_tools_disarms_airbrush() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        tools.set_active_tool(Tool::Airbrush, &mut canvas);
        tools.pointer_began(pos2(50.0, 50.0), &mut canvas);
        assert!(tools.spray_armed());

        tools.set_active_tool(Tool::Pencil, &mut canvas);
        assert!(!tools.spray_armed());
        tools.airbrush_tick(&mut canvas);
        assert_eq!(non_background_count(&canvas), 0);
    }

    #[test]
    fn airbrush_sprays_only_while_armed() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        tools.set_active_tool(Tool::Airbrush, &mut canvas);
        tools.set_stroke_size(StrokeSize::Medium);

        tools.pointer_began(pos2(50.0, 50.0), &mut canvas);
        assert_eq!(non_background_count(&canvas), 0, "begin alone must not draw");
        for _ in 0..5 {
            tools.airbrush_tick(&mut canvas);
        }
        let sprayed = non_background_count(&canvas);
        assert!(sprayed > 0);

        // All spray lands inside the preset radius (plus dot radius slack).
        let img = canvas.export_image();
        let limit = 10.0 + 1.5;
        for y in 0..100u32 {
            for x in 0..100u32 {
                if img.get_pixel(x, y) != &BACKGROUND {
                    let dx = x as f32 + 0.5 - 50.0;
                    let dy = y as f32 + 0.5 - 50.0;
                    assert!(
                        (dx * dx + dy * dy).sqrt() <= limit + 1.0,
                        "stray dot at ({}, {})",
                        x,
                        y
                    );
                }
            }
        }

        tools.pointer_ended(pos2(50.0, 50.0), &mut canvas);
        tools.airbrush_tick(&mut canvas);
        tools.airbrush_tick(&mut canvas);
        assert_eq!(non_background_count(&canvas), sprayed, "spray after end");
    }

    #[test]
    fn color_picker_sets_primary_and_notifies() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        let red = Color32::from_rgb(255, 0, 0);
        canvas.flood_fill(pos2(50.0, 50.0), red);
        canvas.take_events();

        tools.set_active_tool(Tool::ColorPicker, &mut canvas);
        tools.pointer_began(pos2(50.0, 50.0), &mut canvas);

        assert_eq!(tools.settings().primary_color, red);
        assert_eq!(canvas.take_events(), vec![CanvasEvent::ColorPicked(red)]);
    }

    #[test]
    fn color_picker_outside_bounds_is_a_no_op() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        tools.set_active_tool(Tool::ColorPicker, &mut canvas);
        tools.pointer_began(pos2(-5.0, 50.0), &mut canvas);
        assert_eq!(tools.settings().primary_color, Color32::BLACK);
        assert!(canvas.take_events().is_empty());
    }

    #[test]
    fn text_tool_requests_text_and_draws_nothing() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        tools.set_active_tool(Tool::Text, &mut canvas);
        tools.pointer_began(pos2(12.0, 34.0), &mut canvas);
        tools.pointer_ended(pos2(12.0, 34.0), &mut canvas);

        assert_eq!(
            canvas.take_events(),
            vec![CanvasEvent::TextRequested(pos2(12.0, 34.0))]
        );
        assert_eq!(non_background_count(&canvas), 0);
    }

    #[test]
    fn fill_tool_fills_on_begin_only() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        tools.set_active_tool(Tool::Fill, &mut canvas);
        tools.set_primary_color(Color32::from_rgb(0, 128, 255));

        tools.pointer_began(pos2(1.0, 1.0), &mut canvas);
        let rev = canvas.revision();
        tools.pointer_moved(pos2(50.0, 50.0), &mut canvas);
        tools.pointer_ended(pos2(50.0, 50.0), &mut canvas);

        assert_eq!(canvas.revision(), rev, "move/end must not refill");
        assert_eq!(
            canvas.sample(pos2(99.0, 99.0)),
            Some(Rgba([0, 128, 255, 255]))
        );
    }

    #[test]
    fn cancel_behaves_like_end() {
        let mut canvas = canvas();
        let mut tools = ToolManager::new();
        tools.set_active_tool(Tool::Airbrush, &mut canvas);
        tools.pointer_began(pos2(50.0, 50.0), &mut canvas);
        tools.pointer_cancelled(pos2(50.0, 50.0), &mut canvas);
        assert!(!tools.spray_armed(), "cancel must stop the spray");

        tools.set_active_tool(Tool::Line, &mut canvas);
        tools.pointer_began(pos2(10.0, 10.0), &mut canvas);
        tools.pointer_cancelled(pos2(40.0, 10.0), &mut canvas);
        assert!(canvas.preview().is_none());
        // Cancel commits like end does — same contract, no special casing.
        assert_eq!(canvas.sample(pos2(25.0, 10.0)), Some(rgba(Color32::BLACK)));
    }
}
