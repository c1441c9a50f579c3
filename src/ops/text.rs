//! Text stamping — lays out a string with ab_glyph and rasterizes the glyph
//! coverage straight into the surface.
//!
//! The origin is the **top-left corner** of the first text line; the first
//! baseline sits one ascent below it.  Multiline input is supported via
//! `'\n'`.

use ab_glyph::{point, Font, FontArc, ScaleFont};
use image::Rgba;

use crate::canvas::Surface;

/// Errors from system font lookup for the Text tool.
#[derive(Debug)]
pub enum FontError {
    /// No matching sans-serif font installed.
    NotFound(String),
    /// A font was found but its data could not be loaded or parsed.
    Unreadable(String),
}

impl std::fmt::Display for FontError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontError::NotFound(e) => write!(f, "No usable system font: {}", e),
            FontError::Unreadable(e) => write!(f, "Failed to load system font: {}", e),
        }
    }
}

impl std::error::Error for FontError {}

/// Locate and load the default sans-serif system font.
/// No font assets are bundled, so the Text tool depends on this succeeding.
pub fn load_system_font() -> Result<FontArc, FontError> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::Properties;
    use font_kit::source::SystemSource;

    let handle = SystemSource::new()
        .select_best_match(&[FamilyName::SansSerif], &Properties::new())
        .map_err(|e| FontError::NotFound(e.to_string()))?;
    let font = handle
        .load()
        .map_err(|e| FontError::Unreadable(e.to_string()))?;
    let data = font
        .copy_font_data()
        .ok_or_else(|| FontError::Unreadable("font exposes no data".into()))?;
    FontArc::try_from_vec(data.as_ref().clone())
        .map_err(|e| FontError::Unreadable(e.to_string()))
}

/// Rasterize `text` into the surface with its top-left corner at
/// (origin_x, origin_y), both in device pixels.  `size_px` is the font size
/// in device pixels.  Glyph coverage is alpha-blended over the existing
/// pixels; the canvas stays opaque.
pub fn stamp_text(
    surface: &mut Surface,
    text: &str,
    origin_x: f32,
    origin_y: f32,
    color: Rgba<u8>,
    font: &FontArc,
    size_px: f32,
) {
    let scaled = font.as_scaled(size_px);
    let ascent = scaled.ascent();
    let line_height = scaled.height() + scaled.line_gap();

    for (line_idx, line) in text.split('\n').enumerate() {
        let baseline_y = origin_y + ascent + line_idx as f32 * line_height;
        let mut cursor_x = origin_x;
        let mut last_glyph = None;

        for ch in line.chars() {
            let glyph_id = font.glyph_id(ch);
            if let Some(prev) = last_glyph {
                cursor_x += scaled.kern(prev, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(size_px, point(cursor_x, baseline_y));
            cursor_x += scaled.h_advance(glyph_id);
            last_glyph = Some(glyph_id);

            let Some(outlined) = font.outline_glyph(glyph) else {
                continue; // whitespace or glyph with no outline
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = bounds.min.x + gx as f32;
                let y = bounds.min.y + gy as f32;
                if x < 0.0 || y < 0.0 {
                    return;
                }
                let (x, y) = (x as u32, y as u32);
                if x >= surface.width() || y >= surface.height() {
                    return;
                }
                blend_pixel(surface, x, y, color, coverage.clamp(0.0, 1.0));
            });
        }
    }
}

/// Mix `color` over the existing pixel by `coverage` (0..=1).
fn blend_pixel(surface: &mut Surface, x: u32, y: u32, color: Rgba<u8>, coverage: f32) {
    if coverage <= 0.0 {
        return;
    }
    let dst = surface.pixel(x, y);
    let mix = |s: u8, d: u8| -> u8 { (s as f32 * coverage + d as f32 * (1.0 - coverage)).round() as u8 };
    surface.put_pixel(
        x,
        y,
        Rgba([
            mix(color[0], dst[0]),
            mix(color[1], dst[1]),
            mix(color[2], dst[2]),
            dst[3].max(mix(color[3], dst[3])),
        ]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn full_coverage_replaces_pixel_exactly() {
        let mut surface = Surface::new(4, 4);
        blend_pixel(&mut surface, 1, 1, BLACK, 1.0);
        assert_eq!(surface.pixel(1, 1), BLACK);
    }

    #[test]
    fn zero_coverage_leaves_pixel_unchanged() {
        let mut surface = Surface::new(4, 4);
        blend_pixel(&mut surface, 1, 1, BLACK, 0.0);
        assert_eq!(surface.pixel(1, 1), WHITE);
    }

    #[test]
    fn stamping_marks_pixels_near_origin() {
        // Needs an installed system font; skip quietly on bare machines.
        let Ok(font) = load_system_font() else {
            return;
        };
        let mut surface = Surface::new(128, 64);
        stamp_text(&mut surface, "Hi", 4.0, 4.0, BLACK, &font, 32.0);

        let marked = (0..64u32)
            .flat_map(|y| (0..128u32).map(move |x| (x, y)))
            .any(|(x, y)| surface.pixel(x, y) != WHITE);
        assert!(marked, "no glyph coverage reached the surface");
    }

    #[test]
    fn stamping_near_edges_is_clipped_not_panicking() {
        let Ok(font) = load_system_font() else {
            return;
        };
        let mut surface = Surface::new(16, 16);
        stamp_text(&mut surface, "Wide text\nsecond line", -10.0, -10.0, BLACK, &font, 40.0);
        stamp_text(&mut surface, "x", 15.0, 15.0, BLACK, &font, 40.0);
    }
}
