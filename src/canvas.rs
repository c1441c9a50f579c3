//! The committed drawing: an exclusively-owned RGBA8 pixel buffer plus the
//! uncommitted preview overlay shown during shape drags.
//!
//! Coordinates come in two flavors.  **Logical points** are what pointer
//! events and tools speak; **device pixels** are buffer coordinates (logical
//! × display scale).  Row 0 is the top row.  All logical→buffer conversion
//! funnels through [`PaintCanvas::buffer_coords`] so `sample`, flood fill and
//! the rasterizers can never disagree about the mapping.

use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Vec2};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::ops::shapes::{self, ShapePath};
use crate::ops::strokes::{self, CapStyle};
use crate::ops::{fill, text};

/// Canvas background. The Eraser paints with this.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Guard against absurd allocations (and `u32` arithmetic overflow).
const MAX_EDGE_PX: u32 = 16_384;

// ============================================================================
// ERRORS
// ============================================================================

/// Failure to (re)create the backing buffer.  Fatal to painting — without a
/// backing store there is nothing to draw into — and therefore distinct from
/// the benign no-op cases (out-of-bounds taps etc.), which never error.
#[derive(Debug)]
pub enum CanvasError {
    InvalidSize {
        logical: Vec2,
        scale: f32,
    },
}

impl std::fmt::Display for CanvasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanvasError::InvalidSize { logical, scale } => write!(
                f,
                "Cannot allocate a {}x{} canvas at scale {}",
                logical.x, logical.y, scale
            ),
        }
    }
}

impl std::error::Error for CanvasError {}

// ============================================================================
// OUTBOUND EVENTS
// ============================================================================

/// Notifications from the canvas/tool core to the surrounding UI, drained
/// once per frame via [`PaintCanvas::take_events`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CanvasEvent {
    /// The ColorPicker sampled this color (it is already the new primary).
    ColorPicked(Color32),
    /// The Text tool wants a string for this logical point.  The UI prompts
    /// the user and later calls [`PaintCanvas::stamp_text`] itself; empty or
    /// whitespace-only input must be suppressed by the UI.
    TextRequested(Pos2),
}

// ============================================================================
// SURFACE — the raw pixel buffer
// ============================================================================

/// Contiguous RGBA8 buffer, stride = `width * 4`, row 0 at the top.
/// Always fully initialized; bounds-checked writes.
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    /// A surface filled with the opaque-white background.
    pub fn new(width: u32, height: u32) -> Self {
        // All-0xFF bytes == BACKGROUND, so one fill initializes everything.
        let data = vec![255u8; width as usize * height as usize * 4];
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, row-major from the top row.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Read the pixel at (x, y).  Caller guarantees bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        let o = self.offset(x, y);
        Rgba([self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]])
    }

    /// Write the pixel at (x, y); silently ignores out-of-bounds writes.
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        if x >= self.width || y >= self.height {
            return;
        }
        let o = self.offset(x, y);
        self.data[o..o + 4].copy_from_slice(&color.0);
    }
}

// ============================================================================
// PREVIEW OVERLAY
// ============================================================================

/// The single uncommitted shape shown during a shape-tool drag.  Replaced
/// wholesale on every move; cleared atomically with the commit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Preview {
    pub path: ShapePath,
    pub color: Color32,
    /// Stroke width in logical points.
    pub width: f32,
    pub cap: CapStyle,
}

// ============================================================================
// PAINT CANVAS
// ============================================================================

/// The canvas core: pixel surface + preview overlay + outbound event queue.
///
/// Every mutating operation is synchronous and bumps [`Self::revision`]
/// exactly once — that counter is the "needs redraw" signal the display
/// layer watches to re-upload the texture.
pub struct PaintCanvas {
    logical_size: Vec2,
    scale: f32,
    surface: Surface,
    preview: Option<Preview>,
    events: Vec<CanvasEvent>,
    revision: u64,
}

impl PaintCanvas {
    pub fn new(logical_size: Vec2, scale: f32) -> Result<Self, CanvasError> {
        let surface = Self::allocate(logical_size, scale)?;
        Ok(Self {
            logical_size,
            scale,
            surface,
            preview: None,
            events: Vec::new(),
            revision: 0,
        })
    }

    fn allocate(logical_size: Vec2, scale: f32) -> Result<Surface, CanvasError> {
        if !(logical_size.x.is_finite() && logical_size.y.is_finite() && scale.is_finite())
            || logical_size.x < 1.0
            || logical_size.y < 1.0
            || scale <= 0.0
        {
            return Err(CanvasError::InvalidSize { logical: logical_size, scale });
        }
        let width = (logical_size.x * scale) as u32;
        let height = (logical_size.y * scale) as u32;
        if width == 0 || height == 0 || width > MAX_EDGE_PX || height > MAX_EDGE_PX {
            return Err(CanvasError::InvalidSize { logical: logical_size, scale });
        }
        Ok(Surface::new(width, height))
    }

    /// Recreate the backing buffer for a new display size/scale, losing the
    /// drawing.  A no-op when the requested size and scale already match.
    /// The surrounding UI only calls this between gestures.
    pub fn resize(&mut self, logical_size: Vec2, scale: f32) -> Result<(), CanvasError> {
        if logical_size == self.logical_size && scale == self.scale {
            return Ok(());
        }
        self.surface = Self::allocate(logical_size, scale)?;
        self.logical_size = logical_size;
        self.scale = scale;
        self.preview = None;
        self.revision += 1;
        Ok(())
    }

    pub fn logical_size(&self) -> Vec2 {
        self.logical_size
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pixel_width(&self) -> u32 {
        self.surface.width()
    }

    pub fn pixel_height(&self) -> u32 {
        self.surface.height()
    }

    /// Monotonic buffer generation — bumped once per mutating operation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The one logical→buffer conversion: scale multiply + bounds check.
    /// Returns `None` for points outside the buffer.
    pub fn buffer_coords(&self, point: Pos2) -> Option<(u32, u32)> {
        let x = (point.x * self.scale).floor();
        let y = (point.y * self.scale).floor();
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.surface.width() || y >= self.surface.height() {
            return None;
        }
        Some((x, y))
    }

    // ---- reading ----------------------------------------------------------

    /// The stored color under a logical point, or `None` out of bounds.
    pub fn sample(&self, point: Pos2) -> Option<Rgba<u8>> {
        let (x, y) = self.buffer_coords(point)?;
        Some(self.surface.pixel(x, y))
    }

    /// Immutable snapshot of the committed drawing (the preview overlay is
    /// not part of it), independent of further mutation.
    pub fn export_image(&self) -> RgbaImage {
        RgbaImage::from_raw(
            self.surface.width(),
            self.surface.height(),
            self.surface.data().to_vec(),
        )
        .unwrap_or_else(|| RgbaImage::new(self.surface.width(), self.surface.height()))
    }

    /// Convert the buffer for texture upload.  Row-parallel: the buffer can
    /// reach tens of megabytes at retina scales.
    pub fn to_color_image(&self) -> ColorImage {
        let w = self.surface.width() as usize;
        let h = self.surface.height() as usize;
        let src = self.surface.data();
        let mut pixels = vec![Color32::TRANSPARENT; w * h];
        pixels
            .par_chunks_mut(w)
            .zip(src.par_chunks(w * 4))
            .for_each(|(row, src_row)| {
                for (dst, rgba) in row.iter_mut().zip(src_row.chunks_exact(4)) {
                    *dst = Color32::from_rgba_unmultiplied(rgba[0], rgba[1], rgba[2], rgba[3]);
                }
            });
        ColorImage { size: [w, h], pixels }
    }

    // ---- drawing ----------------------------------------------------------

    /// Rasterize a stroked segment between two logical points.
    pub fn draw_segment(&mut self, from: Pos2, to: Pos2, color: Color32, width: f32, cap: CapStyle) {
        let s = self.scale;
        strokes::draw_segment(
            &mut self.surface,
            Pos2::new(from.x * s, from.y * s),
            Pos2::new(to.x * s, to.y * s),
            rgba(color),
            width * s,
            cap,
        );
        self.revision += 1;
    }

    /// Stroke a shape outline (shape-tool commit).
    pub fn draw_path(&mut self, path: &ShapePath, color: Color32, width: f32, cap: CapStyle) {
        shapes::draw_path(
            &mut self.surface,
            path,
            self.scale,
            rgba(color),
            width * self.scale,
            cap,
        );
        self.revision += 1;
    }

    /// Filled discs at each logical point (Airbrush).
    pub fn draw_dots(&mut self, points: &[Pos2], color: Color32, diameter: f32) {
        if points.is_empty() {
            return;
        }
        let s = self.scale;
        let scaled: Vec<Pos2> = points.iter().map(|p| Pos2::new(p.x * s, p.y * s)).collect();
        strokes::draw_dots(&mut self.surface, &scaled, rgba(color), diameter * s);
        self.revision += 1;
    }

    /// Rasterize text with its top-left corner at a logical point.
    pub fn stamp_text(
        &mut self,
        content: &str,
        origin: Pos2,
        color: Color32,
        font: &ab_glyph::FontArc,
        size: f32,
    ) {
        let s = self.scale;
        text::stamp_text(
            &mut self.surface,
            content,
            origin.x * s,
            origin.y * s,
            rgba(color),
            font,
            size * s,
        );
        self.revision += 1;
    }

    /// Flood fill from a logical seed point.  Out-of-bounds seeds are a
    /// defined no-op (no redraw signal either); a completed fill — including
    /// the fill-color-equals-target no-op — signals exactly once.
    pub fn flood_fill(&mut self, point: Pos2, color: Color32) {
        let Some((x, y)) = self.buffer_coords(point) else {
            return;
        };
        fill::flood_fill(&mut self.surface, x, y, rgba(color));
        self.revision += 1;
    }

    // ---- preview overlay --------------------------------------------------

    pub fn set_preview(&mut self, preview: Preview) {
        self.preview = Some(preview);
    }

    pub fn clear_preview(&mut self) {
        self.preview = None;
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    // ---- outbound events --------------------------------------------------

    pub(crate) fn push_event(&mut self, event: CanvasEvent) {
        self.events.push(event);
    }

    /// Drain pending notifications, oldest first.
    pub fn take_events(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Settings colors (`Color32`) and buffer pixels (`Rgba<u8>`) are both 8-bit,
/// so this conversion is byte-exact — no quantization happens past the
/// color-picker edge.
pub fn rgba(color: Color32) -> Rgba<u8> {
    let [r, g, b, a] = color.to_array();
    Rgba([r, g, b, a])
}

/// Buffer pixel → settings color (ColorPicker direction). Inverse of [`rgba`].
pub fn color32(px: Rgba<u8>) -> Color32 {
    Color32::from_rgba_unmultiplied(px[0], px[1], px[2], px[3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    fn canvas_1x(w: f32, h: f32) -> PaintCanvas {
        PaintCanvas::new(vec2(w, h), 1.0).expect("canvas")
    }

    #[test]
    fn new_canvas_is_opaque_white() {
        let canvas = canvas_1x(20.0, 10.0);
        assert_eq!(canvas.pixel_width(), 20);
        assert_eq!(canvas.pixel_height(), 10);
        for y in 0..10 {
            for x in 0..20 {
                assert_eq!(canvas.sample(pos2(x as f32 + 0.5, y as f32 + 0.5)), Some(BACKGROUND));
            }
        }
    }

    #[test]
    fn resize_with_same_size_is_a_no_op() {
        let mut canvas = canvas_1x(50.0, 50.0);
        canvas.draw_segment(pos2(5.0, 5.0), pos2(5.0, 5.0), Color32::BLACK, 1.0, CapStyle::Flat);
        let rev = canvas.revision();
        canvas.resize(vec2(50.0, 50.0), 1.0).expect("resize");
        assert_eq!(canvas.revision(), rev, "matching resize must not signal");
        assert_eq!(canvas.sample(pos2(5.5, 5.5)), Some(rgba(Color32::BLACK)));
    }

    #[test]
    fn resize_resets_to_background() {
        let mut canvas = canvas_1x(50.0, 50.0);
        canvas.flood_fill(pos2(10.0, 10.0), Color32::RED);
        canvas.resize(vec2(40.0, 60.0), 1.0).expect("resize");
        for y in (0..60).step_by(7) {
            for x in (0..40).step_by(7) {
                assert_eq!(
                    canvas.sample(pos2(x as f32 + 0.5, y as f32 + 0.5)),
                    Some(BACKGROUND),
                    "stale pixel survived the resize at ({}, {})",
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn resize_rejects_degenerate_sizes() {
        let mut canvas = canvas_1x(50.0, 50.0);
        assert!(canvas.resize(vec2(0.0, 50.0), 1.0).is_err());
        assert!(canvas.resize(vec2(50.0, 50.0), 0.0).is_err());
        assert!(canvas.resize(vec2(1e9, 1e9), 2.0).is_err());
        // Canvas still usable after a rejected resize.
        assert!(canvas.sample(pos2(25.0, 25.0)).is_some());
    }

    #[test]
    fn buffer_coords_applies_scale() {
        let canvas = PaintCanvas::new(vec2(100.0, 100.0), 2.0).expect("canvas");
        assert_eq!(canvas.pixel_width(), 200);
        assert_eq!(canvas.buffer_coords(pos2(10.25, 3.75)), Some((20, 7)));
        assert_eq!(canvas.buffer_coords(pos2(-0.1, 5.0)), None);
        assert_eq!(canvas.buffer_coords(pos2(100.0, 5.0)), None);
    }

    #[test]
    fn sample_after_dot_round_trips() {
        // The spec'd round-trip: draw a 1-diameter dot at P, sample P.
        let mut canvas = PaintCanvas::new(vec2(60.0, 60.0), 2.0).expect("canvas");
        let color = Color32::from_rgb(13, 77, 200);
        for p in [pos2(10.5, 10.5), pos2(0.5, 0.5), pos2(59.2, 59.2), pos2(30.0, 7.3)] {
            canvas.draw_dots(&[p], color, 1.0);
            assert_eq!(canvas.sample(p), Some(rgba(color)), "round-trip failed at {:?}", p);
        }
    }

    #[test]
    fn sample_out_of_bounds_is_none() {
        let canvas = canvas_1x(30.0, 30.0);
        assert_eq!(canvas.sample(pos2(-1.0, 10.0)), None);
        assert_eq!(canvas.sample(pos2(10.0, 31.0)), None);
    }

    #[test]
    fn flood_fill_signals_exactly_once() {
        let mut canvas = canvas_1x(40.0, 40.0);
        let rev = canvas.revision();
        canvas.flood_fill(pos2(20.0, 20.0), Color32::RED);
        assert_eq!(canvas.revision(), rev + 1);

        // Idempotent second fill: buffer unchanged, still a single signal.
        let snapshot = canvas.export_image();
        canvas.flood_fill(pos2(20.0, 20.0), Color32::RED);
        assert_eq!(canvas.revision(), rev + 2);
        assert_eq!(canvas.export_image().as_raw(), snapshot.as_raw());

        // Out-of-bounds seed: defined no-op, no signal.
        canvas.flood_fill(pos2(-5.0, 20.0), Color32::GREEN);
        assert_eq!(canvas.revision(), rev + 2);
    }

    #[test]
    fn export_is_independent_of_later_mutation() {
        let mut canvas = canvas_1x(20.0, 20.0);
        let before = canvas.export_image();
        canvas.flood_fill(pos2(10.0, 10.0), Color32::BLACK);
        assert_eq!(before.get_pixel(10, 10), &BACKGROUND);
        assert_eq!(canvas.sample(pos2(10.0, 10.0)), Some(rgba(Color32::BLACK)));
    }

    #[test]
    fn color_conversion_round_trips_exactly() {
        for c in [
            Color32::from_rgb(0, 0, 0),
            Color32::from_rgb(255, 255, 255),
            Color32::from_rgb(128, 64, 3),
            Color32::from_rgba_unmultiplied(10, 20, 30, 255),
        ] {
            assert_eq!(color32(rgba(c)), c);
        }
    }
}
