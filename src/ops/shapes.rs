//! Shape paths — the geometry shared by the preview overlay and the commit
//! rasterizer for the Line, Rectangle and Ellipse tools.

use egui::{pos2, Pos2, Rect};
use image::Rgba;

use crate::canvas::Surface;
use crate::ops::strokes::{self, CapStyle};

/// Maximum distance between consecutive outline samples of a curved path,
/// in logical points.
const OUTLINE_STEP: f32 = 2.0;

/// An uncommitted shape outline, in logical canvas coordinates.
///
/// Rectangle and ellipse bounds are derived from the two drag corners with
/// min/max, so drags in any of the four directions produce the same shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapePath {
    /// Straight segment from drag start to the current point.
    Segment { from: Pos2, to: Pos2 },
    /// Axis-aligned rectangle spanned by the two drag corners.
    Rect { a: Pos2, b: Pos2 },
    /// Ellipse inscribed in the bounding rectangle of the two drag corners.
    Ellipse { a: Pos2, b: Pos2 },
}

impl ShapePath {
    /// The polyline approximating this shape, in logical coordinates.
    /// Closed shapes repeat their first point at the end.
    pub fn outline(&self) -> Vec<Pos2> {
        match *self {
            ShapePath::Segment { from, to } => vec![from, to],
            ShapePath::Rect { a, b } => {
                let r = Rect::from_two_pos(a, b);
                vec![
                    r.left_top(),
                    r.right_top(),
                    r.right_bottom(),
                    r.left_bottom(),
                    r.left_top(),
                ]
            }
            ShapePath::Ellipse { a, b } => {
                let r = Rect::from_two_pos(a, b);
                let (cx, cy) = (r.center().x, r.center().y);
                let (rx, ry) = (r.width() * 0.5, r.height() * 0.5);
                if rx < f32::EPSILON && ry < f32::EPSILON {
                    return vec![r.center(), r.center()];
                }
                // Sample density follows the (approximate) perimeter so big
                // ellipses stay smooth and tiny ones stay cheap.
                let perimeter =
                    std::f32::consts::TAU * ((rx * rx + ry * ry) * 0.5).sqrt().max(1.0);
                let n = ((perimeter / OUTLINE_STEP).ceil() as usize).clamp(16, 720);
                let mut points = Vec::with_capacity(n + 1);
                for i in 0..=n {
                    let t = i as f32 / n as f32 * std::f32::consts::TAU;
                    points.push(pos2(cx + rx * t.cos(), cy + ry * t.sin()));
                }
                points
            }
        }
    }
}

/// Stroke a shape outline into the surface.  `scale` converts the path's
/// logical coordinates to device pixels; `width_px` is already in pixels.
pub fn draw_path(
    surface: &mut Surface,
    path: &ShapePath,
    scale: f32,
    color: Rgba<u8>,
    width_px: f32,
    cap: CapStyle,
) {
    let outline = path.outline();
    if outline.len() < 2 {
        return;
    }
    for pair in outline.windows(2) {
        let from = pos2(pair[0].x * scale, pair[0].y * scale);
        let to = pos2(pair[1].x * scale, pair[1].y * scale);
        strokes::draw_segment(surface, from, to, color, width_px, cap);
    }
}
