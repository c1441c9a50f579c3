//! Flood fill — iterative, 4-connected, byte-exact.
//!
//! The fill is deliberately stack-based (a `Vec` of packed pixel indices)
//! rather than recursive, so call-stack depth stays bounded at any surface
//! size.  A pixel is recolored only while it still byte-equals the seed's
//! original color, which also serves as the visited check: once recolored it
//! can never match again (the fill color differing from the target color is
//! checked up front).

use image::Rgba;

use crate::canvas::Surface;

/// Fill the 4-connected region of pixels matching the color at
/// (seed_x, seed_y) with `fill`.  Filling a region with its own color is a
/// no-op.  The caller is responsible for bounds-checking the seed.
pub fn flood_fill(surface: &mut Surface, seed_x: u32, seed_y: u32, fill: Rgba<u8>) {
    let (w, h) = (surface.width(), surface.height());
    debug_assert!(seed_x < w && seed_y < h);

    let target = surface.pixel(seed_x, seed_y);
    if target == fill {
        return;
    }

    // Packed flat indices (y * w + x) keep the stack compact.
    let mut stack: Vec<u32> = Vec::with_capacity(4096);
    stack.push(seed_y * w + seed_x);

    while let Some(idx) = stack.pop() {
        let x = idx % w;
        let y = idx / w;
        if surface.pixel(x, y) != target {
            continue;
        }
        surface.put_pixel(x, y, fill);

        // 4-connected neighbors; out-of-bounds neighbors are never pushed.
        if x > 0 {
            stack.push(idx - 1);
        }
        if x + 1 < w {
            stack.push(idx + 1);
        }
        if y > 0 {
            stack.push(idx - w);
        }
        if y + 1 < h {
            stack.push(idx + w);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn fill_with_own_color_changes_nothing() {
        let mut surface = Surface::new(8, 8);
        let before: Vec<u8> = surface.data().to_vec();
        flood_fill(&mut surface, 3, 3, WHITE);
        assert_eq!(surface.data(), &before[..]);
    }

    #[test]
    fn fill_is_confined_by_boundary_pixels() {
        let mut surface = Surface::new(16, 16);
        // Enclose a 6..=9 square with a black one-pixel frame.
        for i in 5..=10u32 {
            surface.put_pixel(i, 5, BLACK);
            surface.put_pixel(i, 10, BLACK);
            surface.put_pixel(5, i, BLACK);
            surface.put_pixel(10, i, BLACK);
        }
        flood_fill(&mut surface, 7, 7, RED);

        for y in 0..16u32 {
            for x in 0..16u32 {
                let px = surface.pixel(x, y);
                let on_frame =
                    (5..=10).contains(&x) && (5..=10).contains(&y) && (x == 5 || x == 10 || y == 5 || y == 10);
                let inside = (6..=9).contains(&x) && (6..=9).contains(&y);
                if on_frame {
                    assert_eq!(px, BLACK, "boundary at ({}, {}) changed", x, y);
                } else if inside {
                    assert_eq!(px, RED, "interior at ({}, {}) not filled", x, y);
                } else {
                    assert_eq!(px, WHITE, "exterior at ({}, {}) changed", x, y);
                }
            }
        }
    }

    #[test]
    fn fill_does_not_cross_diagonal_gaps() {
        let mut surface = Surface::new(4, 4);
        // A diagonal wall of black pixels: 4-connectivity must not leak
        // through the diagonal touch points.
        surface.put_pixel(0, 1, BLACK);
        surface.put_pixel(1, 0, BLACK);
        flood_fill(&mut surface, 0, 0, RED);
        assert_eq!(surface.pixel(0, 0), RED);
        assert_eq!(surface.pixel(1, 1), WHITE);
        assert_eq!(surface.pixel(3, 3), WHITE);
    }

    #[test]
    fn fill_covers_whole_blank_surface() {
        let mut surface = Surface::new(32, 32);
        flood_fill(&mut surface, 0, 0, RED);
        for y in 0..32u32 {
            for x in 0..32u32 {
                assert_eq!(surface.pixel(x, y), RED);
            }
        }
    }
}
