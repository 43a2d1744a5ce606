//! Rasterization primitives on single-channel masks and RGB overlays.
//!
//! Shapes are clipped to the buffer, so callers may pass positions that
//! lie partially (or fully) outside the image.

use ndarray::{Array2, Array3, ArrayView2, Zip};

use crate::filters::core::{blend_pixel, MASK_ON};
use crate::selection::contour::{Contour, Point};

// ============================================================================
// Disks and lines
// ============================================================================

/// Set every pixel within `radius` of `center` (Euclidean, inclusive).
pub fn fill_disk(mask: &mut Array2<u8>, center: Point, radius: u32, value: u8) {
    let (height, width) = mask.dim();
    let r = radius as i64;
    let (cx, cy) = (center.x as i64, center.y as i64);

    let r_sq = r.saturating_mul(r);

    let y0 = (cy - r).max(0);
    let y1 = (cy + r).min(height as i64 - 1);
    let x0 = (cx - r).max(0);
    let x1 = (cx + r).min(width as i64 - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= r_sq {
                mask[[y as usize, x as usize]] = value;
            }
        }
    }
}

/// A fresh mask of the given (height, width) holding one disk.
pub fn disk_mask(dims: (usize, usize), center: Point, radius: u32) -> Array2<u8> {
    let mut mask = Array2::<u8>::zeros(dims);
    fill_disk(&mut mask, center, radius, MASK_ON);
    mask
}

/// Bresenham line from `a` to `b`, both ends included.
pub fn line_points(a: Point, b: Point) -> Vec<Point> {
    let dx = (b.x - a.x).abs();
    let dy = -(b.y - a.y).abs();
    let sx = if a.x < b.x { 1 } else { -1 };
    let sy = if a.y < b.y { 1 } else { -1 };

    let mut points = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    let (mut x, mut y) = (a.x, a.y);
    let mut err = dx + dy;
    loop {
        points.push(Point::new(x, y));
        if x == b.x && y == b.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    points
}

/// Draw a line `thickness` pixels wide with round caps.
pub fn draw_thick_line(mask: &mut Array2<u8>, a: Point, b: Point, thickness: u32, value: u8) {
    let radius = thickness / 2;
    for p in line_points(a, b) {
        fill_disk(mask, p, radius, value);
    }
}

/// Draw consecutive segments through `points`, closing the loop if asked.
pub fn draw_polyline(mask: &mut Array2<u8>, points: &[Point], closed: bool, thickness: u32, value: u8) {
    match points {
        [] => {}
        [single] => fill_disk(mask, *single, thickness / 2, value),
        _ => {
            for pair in points.windows(2) {
                draw_thick_line(mask, pair[0], pair[1], thickness, value);
            }
            if closed {
                draw_thick_line(mask, points[points.len() - 1], points[0], thickness, value);
            }
        }
    }
}

// ============================================================================
// Polygon fill
// ============================================================================

/// Fill the interior of a contour, outline included.
///
/// Scanlines run through pixel centres; an edge covers the rows in
/// `[min_y, max_y)` so shared vertices are not counted twice.
pub fn fill_contour(mask: &mut Array2<u8>, contour: &Contour, value: u8) {
    let points = contour.points();
    let (height, width) = mask.dim();
    let Some((lo, hi)) = contour.bounding_box() else {
        return;
    };

    if points.len() >= 3 {
        let y_start = lo.y.max(0);
        let y_end = hi.y.min(height as i32 - 1);
        let mut crossings: Vec<f64> = Vec::new();

        for y in y_start..=y_end {
            crossings.clear();
            let yf = y as f64;
            for i in 0..points.len() {
                let a = points[i];
                let b = points[(i + 1) % points.len()];
                let (top, bottom) = if a.y <= b.y { (a, b) } else { (b, a) };
                if top.y == bottom.y || y < top.y || y >= bottom.y {
                    continue;
                }
                let t = (yf - top.y as f64) / (bottom.y - top.y) as f64;
                crossings.push(top.x as f64 + t * (bottom.x - top.x) as f64);
            }
            crossings.sort_by(|a, b| a.total_cmp(b));

            for span in crossings.chunks_exact(2) {
                let x0 = (span[0].ceil() as i64).max(0);
                let x1 = (span[1].floor() as i64).min(width as i64 - 1);
                for x in x0..=x1 {
                    mask[[y as usize, x as usize]] = value;
                }
            }
        }
    }

    draw_polyline(mask, points, true, 1, value);
}

// ============================================================================
// Colour compositing
// ============================================================================

/// Alpha-blend `color` into `image` wherever `mask` is set.
pub fn blend_masked(image: &mut Array3<u8>, mask: ArrayView2<u8>, color: [u8; 3], opacity: f32) {
    for ((y, x), &m) in mask.indexed_iter() {
        if m == 0 {
            continue;
        }
        let mut px = [image[[y, x, 0]], image[[y, x, 1]], image[[y, x, 2]]];
        blend_pixel(&mut px, color, opacity);
        for c in 0..3 {
            image[[y, x, c]] = px[c];
        }
    }
}

/// Paint `color` opaquely wherever `mask` is set.
pub fn paint_masked(image: &mut Array3<u8>, mask: ArrayView2<u8>, color: [u8; 3]) {
    Zip::indexed(mask).for_each(|(y, x), &m| {
        if m > 0 {
            for c in 0..3 {
                image[[y, x, c]] = color[c];
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::core::mask_count;

    #[test]
    fn test_disk_is_round() {
        let mask = disk_mask((21, 21), Point::new(10, 10), 5);
        assert_eq!(mask[[10, 15]], 255);
        assert_eq!(mask[[5, 10]], 255);
        assert_eq!(mask[[6, 6]], 0);
        assert_eq!(mask[[10, 16]], 0);
    }

    #[test]
    fn test_huge_radius_covers_buffer() {
        let mut mask = Array2::<u8>::zeros((6, 8));
        fill_disk(&mut mask, Point::new(3, 2), u32::MAX, MASK_ON);
        assert!(mask.iter().all(|&v| v == MASK_ON));
    }

    #[test]
    fn test_disk_clips_at_border() {
        let mask = disk_mask((10, 10), Point::new(0, 0), 3);
        assert_eq!(mask[[0, 0]], 255);
        assert_eq!(mask[[0, 3]], 255);
        assert!(mask_count(mask.view()) < 29);
    }

    #[test]
    fn test_disk_fully_outside_is_empty() {
        let mask = disk_mask((10, 10), Point::new(-50, 40), 3);
        assert_eq!(mask_count(mask.view()), 0);
    }

    #[test]
    fn test_line_points_endpoints() {
        let pts = line_points(Point::new(1, 1), Point::new(6, 3));
        assert_eq!(pts.first(), Some(&Point::new(1, 1)));
        assert_eq!(pts.last(), Some(&Point::new(6, 3)));
        assert_eq!(pts.len(), 6);
    }

    #[test]
    fn test_thick_line_has_no_gaps() {
        let mut mask = Array2::<u8>::zeros((20, 40));
        draw_thick_line(&mut mask, Point::new(5, 10), Point::new(35, 10), 6, 255);
        for x in 5..=35 {
            for y in 7..=13 {
                assert_eq!(mask[[y, x]], 255, "({x}, {y})");
            }
        }
        assert_eq!(mask[[10, 2]], 255);
        assert_eq!(mask[[5, 20]], 0);
    }

    #[test]
    fn test_fill_contour_rectangle() {
        let contour = Contour::new(vec![
            Point::new(2, 2),
            Point::new(7, 2),
            Point::new(7, 5),
            Point::new(2, 5),
        ]);
        let mut mask = Array2::<u8>::zeros((10, 10));
        fill_contour(&mut mask, &contour, 255);

        assert_eq!(mask_count(mask.view()), 6 * 4);
        assert_eq!(mask[[5, 7]], 255);
        assert_eq!(mask[[6, 7]], 0);
    }

    #[test]
    fn test_fill_contour_triangle_interior() {
        let contour = Contour::new(vec![Point::new(0, 0), Point::new(10, 10), Point::new(0, 10)]);
        let mut mask = Array2::<u8>::zeros((12, 12));
        fill_contour(&mut mask, &contour, 255);
        assert_eq!(mask[[8, 2]], 255);
        assert_eq!(mask[[2, 8]], 0);
    }

    #[test]
    fn test_blend_masked_only_touches_mask() {
        let mut image = Array3::<u8>::from_elem((2, 2, 3), 100);
        let mut mask = Array2::<u8>::zeros((2, 2));
        mask[[0, 1]] = 255;

        blend_masked(&mut image, mask.view(), [200, 0, 100], 0.5);

        assert_eq!([image[[0, 1, 0]], image[[0, 1, 1]], image[[0, 1, 2]]], [150, 50, 100]);
        assert_eq!(image[[0, 0, 0]], 100);
    }
}
