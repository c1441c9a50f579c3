//! Stroke rasterization — stamps discs or squares along a segment.
//!
//! All coordinates here are device-pixel coordinates; the canvas converts
//! from logical points (and applies the display scale) before calling in.

use egui::Pos2;
use image::Rgba;

use crate::canvas::Surface;

/// Endpoint treatment of a stroked segment.
///
/// `Round` stamps discs (circular segment ends, used for continuous freehand
/// strokes); `Flat` stamps axis-aligned squares (butt-like ends for single
/// discrete segments and shape outlines).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapStyle {
    Round,
    Flat,
}

/// Step length between stamps, in device pixels.  Half a pixel keeps
/// near-diagonal hairlines gap-free.
const STAMP_STEP: f32 = 0.5;

/// Rasterize a stroked line segment.  Zero-length segments (distance below
/// a tenth of a pixel) collapse to a single stamp so a tap leaves a mark.
pub fn draw_segment(
    surface: &mut Surface,
    from: Pos2,
    to: Pos2,
    color: Rgba<u8>,
    width_px: f32,
    cap: CapStyle,
) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance < 0.1 {
        stamp(surface, from.x, from.y, width_px, color, cap);
        return;
    }

    let steps = (distance / STAMP_STEP).ceil() as usize;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        stamp(surface, from.x + dx * t, from.y + dy * t, width_px, color, cap);
    }
}

/// Rasterize filled discs at each point (Airbrush dots).  A dot always marks
/// at least the pixel under its center, even at sub-pixel diameters.
pub fn draw_dots(surface: &mut Surface, points: &[Pos2], color: Rgba<u8>, diameter_px: f32) {
    for p in points {
        stamp(surface, p.x, p.y, diameter_px, color, CapStyle::Round);
    }
}

/// One brush stamp: a filled disc (`Round`) or axis-aligned square (`Flat`)
/// of the given diameter/side centered at (cx, cy).
fn stamp(surface: &mut Surface, cx: f32, cy: f32, diameter_px: f32, color: Rgba<u8>, cap: CapStyle) {
    let size = diameter_px.max(1.0);
    let half = size * 0.5;

    let (w, h) = (surface.width(), surface.height());
    if cx + half < 0.0 || cy + half < 0.0 || cx - half >= w as f32 || cy - half >= h as f32 {
        return;
    }

    let min_x = (cx - half).floor().max(0.0) as u32;
    let max_x = ((cx + half).ceil() as u32).min(w.saturating_sub(1));
    let min_y = (cy - half).floor().max(0.0) as u32;
    let max_y = ((cy + half).ceil() as u32).min(h.saturating_sub(1));

    let radius_sq = half * half;
    let mut filled_any = false;

    for py in min_y..=max_y {
        for px in min_x..=max_x {
            // Pixel centers sit at +0.5
            let fx = px as f32 + 0.5 - cx;
            let fy = py as f32 + 0.5 - cy;
            let inside = match cap {
                CapStyle::Round => fx * fx + fy * fy <= radius_sq,
                CapStyle::Flat => fx.abs() <= half && fy.abs() <= half,
            };
            if inside {
                surface.put_pixel(px, py, color);
                filled_any = true;
            }
        }
    }

    // A stamp centered between pixel centers can miss them all at small
    // diameters; fall back to the pixel under the stamp center.
    if !filled_any {
        let px = cx.floor().clamp(0.0, (w - 1) as f32) as u32;
        let py = cy.floor().clamp(0.0, (h - 1) as f32) as u32;
        surface.put_pixel(px, py, color);
    }
}
