//! Contour extraction from binary masks.
//!
//! Traces the outer boundary of every 8-connected foreground component that
//! is not enclosed by another component, using Moore neighbourhood tracing.
//! Straight runs are compressed to their end points.
//!
//! Contours carry no identity: two contours are the same object exactly when
//! their point sequences are equal.

use std::collections::VecDeque;

use ndarray::{Array2, ArrayView2};

use crate::error::{EngineError, Result};

/// An integer pixel position (x to the right, y down).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A closed polyline around one connected region.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Contour {
    points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Enclosed area (shoelace formula over the vertices).
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
            })
            .sum();
        twice.abs() as f64 / 2.0
    }

    /// Inclusive bounds `(min, max)`.
    pub fn bounding_box(&self) -> Option<(Point, Point)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }

    /// True when `p` lies inside the polygon or on its outline.
    pub fn contains_or_touches(&self, p: Point) -> bool {
        let n = self.points.len();
        if n == 0 {
            return false;
        }
        if n == 1 {
            return self.points[0] == p;
        }

        for i in 0..n {
            if on_segment(self.points[i], self.points[(i + 1) % n], p) {
                return true;
            }
        }
        if n < 3 {
            return false;
        }

        // Ray casting
        let (px, py) = (p.x as f64, p.y as f64);
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (self.points[i].x as f64, self.points[i].y as f64);
            let (xj, yj) = (self.points[j].x as f64, self.points[j].y as f64);
            if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let cross = (b.x - a.x) as i64 * (p.y - a.y) as i64 - (b.y - a.y) as i64 * (p.x - a.x) as i64;
    cross == 0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

/// Moore neighbourhood directions (8-connected, clockwise from right) as (dx, dy)
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),   // 0: right
    (1, 1),   // 1: down-right
    (0, 1),   // 2: down
    (-1, 1),  // 3: down-left
    (-1, 0),  // 4: left
    (-1, -1), // 5: up-left
    (0, -1),  // 6: up
    (1, -1),  // 7: up-right
];

fn direction_index(dx: i32, dy: i32) -> Option<usize> {
    DIRECTIONS.iter().position(|&d| d == (dx, dy))
}

/// Extract the external contours of a binary mask.
///
/// Components nested inside the hole of another component are skipped.
/// Contours come out in raster order of their top-left pixel; that order is
/// stable for a given mask and is what tie-breaking in selection relies on.
///
/// # Errors
/// [`EngineError::DetectionFailed`] if tracing does not close within its step
/// bound.
pub fn find_external_contours(mask: ArrayView2<u8>) -> Result<Vec<Contour>> {
    let (height, width) = mask.dim();
    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }

    let fg = |x: i32, y: i32| -> bool {
        x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height && mask[[y as usize, x as usize]] > 0
    };

    let outside = outer_background(mask);
    let touches_outside = |x: usize, y: usize| -> bool {
        if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
            return true;
        }
        outside[[y - 1, x]] || outside[[y + 1, x]] || outside[[y, x - 1]] || outside[[y, x + 1]]
    };

    let mut labelled = Array2::<bool>::from_elem((height, width), false);
    let mut contours = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if mask[[y, x]] == 0 || labelled[[y, x]] {
                continue;
            }

            // Flood the component, checking whether it borders the outer background
            let mut external = false;
            let mut size = 0usize;
            let mut stack = vec![(x, y)];
            labelled[[y, x]] = true;
            while let Some((cx, cy)) = stack.pop() {
                size += 1;
                external |= touches_outside(cx, cy);
                for &(dx, dy) in DIRECTIONS.iter() {
                    let nx = cx as i32 + dx;
                    let ny = cy as i32 + dy;
                    if fg(nx, ny) && !labelled[[ny as usize, nx as usize]] {
                        labelled[[ny as usize, nx as usize]] = true;
                        stack.push((nx as usize, ny as usize));
                    }
                }
            }

            if external {
                let raw = trace_boundary(&fg, Point::new(x as i32, y as i32), 8 * size + 16)?;
                contours.push(Contour::new(compress_chain(raw)));
            }
        }
    }

    Ok(contours)
}

/// Background pixels 4-connected to the image frame.
fn outer_background(mask: ArrayView2<u8>) -> Array2<bool> {
    let (height, width) = mask.dim();
    let mut outside = Array2::<bool>::from_elem((height, width), false);
    let mut queue = VecDeque::new();

    let mut seed = |x: usize, y: usize, outside: &mut Array2<bool>, queue: &mut VecDeque<(usize, usize)>| {
        if mask[[y, x]] == 0 && !outside[[y, x]] {
            outside[[y, x]] = true;
            queue.push_back((x, y));
        }
    };
    for x in 0..width {
        seed(x, 0, &mut outside, &mut queue);
        seed(x, height - 1, &mut outside, &mut queue);
    }
    for y in 0..height {
        seed(0, y, &mut outside, &mut queue);
        seed(width - 1, y, &mut outside, &mut queue);
    }

    while let Some((x, y)) = queue.pop_front() {
        let neighbours = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbours {
            if nx < width && ny < height && mask[[ny, nx]] == 0 && !outside[[ny, nx]] {
                outside[[ny, nx]] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    outside
}

/// Trace one outer boundary clockwise, starting at the component's top-left pixel.
fn trace_boundary(fg: &impl Fn(i32, i32) -> bool, start: Point, max_steps: usize) -> Result<Vec<Point>> {
    let mut contour = vec![start];
    let mut p = start;
    // The pixel left of the top-left pixel is always background
    let mut back = 4usize;
    let mut first_move: Option<Point> = None;

    for _ in 0..max_steps {
        // Search clockwise from the backtrack direction for the next boundary pixel
        let mut found = None;
        for i in 1..=8 {
            let dir = (back + i) % 8;
            let (dx, dy) = DIRECTIONS[dir];
            if fg(p.x + dx, p.y + dy) {
                found = Some((Point::new(p.x + dx, p.y + dy), (back + i - 1) % 8));
                break;
            }
        }

        let Some((next, checked_dir)) = found else {
            // Isolated pixel
            return Ok(contour);
        };

        if p == start {
            match first_move {
                None => first_move = Some(next),
                Some(first) if first == next => {
                    contour.pop();
                    return Ok(contour);
                }
                Some(_) => {}
            }
        }

        // New backtrack: the last background cell examined, seen from `next`
        let (cdx, cdy) = DIRECTIONS[checked_dir];
        let checked = Point::new(p.x + cdx, p.y + cdy);
        back = direction_index(checked.x - next.x, checked.y - next.y).ok_or_else(|| {
            EngineError::DetectionFailed(format!("non-adjacent backtrack at {next:?}"))
        })?;

        p = next;
        contour.push(p);
    }

    Err(EngineError::DetectionFailed(format!(
        "contour starting at ({}, {}) did not close within {max_steps} steps",
        start.x, start.y
    )))
}

/// Drop vertices lying inside straight runs of the chain.
fn compress_chain(points: Vec<Point>) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points;
    }

    let step = |a: Point, b: Point| ((b.x - a.x).signum(), (b.y - a.y).signum());
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect()
}

/// Flatten contours: [num_contours, len1, x1, y1, x2, y2, ..., len2, ...]
pub fn contours_to_flat(contours: &[Contour]) -> Vec<i32> {
    let mut result = Vec::new();
    result.push(contours.len() as i32);

    for contour in contours {
        result.push(contour.len() as i32);
        for p in contour.points() {
            result.push(p.x);
            result.push(p.y);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_mask(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> Array2<u8> {
        let mut mask = Array2::<u8>::zeros((h, w));
        for y in y0..y1 {
            for x in x0..x1 {
                mask[[y, x]] = 255;
            }
        }
        mask
    }

    #[test]
    fn test_empty_mask() {
        let mask = Array2::<u8>::zeros((10, 10));
        assert!(find_external_contours(mask.view()).unwrap().is_empty());
    }

    #[test]
    fn test_single_pixel() {
        let mut mask = Array2::<u8>::zeros((5, 5));
        mask[[2, 2]] = 255;
        let contours = find_external_contours(mask.view()).unwrap();
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points(), &[Point::new(2, 2)]);
        assert_eq!(contours[0].area(), 0.0);
    }

    #[test]
    fn test_rectangle_compresses_to_corners() {
        let mask = rect_mask(10, 10, 3, 2, 7, 5);
        let contours = find_external_contours(mask.view()).unwrap();

        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].points(),
            &[
                Point::new(3, 2),
                Point::new(6, 2),
                Point::new(6, 4),
                Point::new(3, 4)
            ]
        );
        assert_eq!(contours[0].area(), 6.0);
    }

    #[test]
    fn test_horizontal_line() {
        let mut mask = Array2::<u8>::zeros((5, 10));
        for x in 2..8 {
            mask[[2, x]] = 255;
        }
        let contours = find_external_contours(mask.view()).unwrap();
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points(), &[Point::new(2, 2), Point::new(7, 2)]);
    }

    #[test]
    fn test_nested_component_is_skipped() {
        // Ring with a dot inside its hole
        let mut mask = rect_mask(12, 12, 1, 1, 11, 11);
        for y in 2..10 {
            for x in 2..10 {
                mask[[y, x]] = 0;
            }
        }
        mask[[5, 5]] = 255;

        let contours = find_external_contours(mask.view()).unwrap();

        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points()[0], Point::new(1, 1));
    }

    #[test]
    fn test_raster_order_of_components() {
        let mut mask = rect_mask(20, 10, 12, 1, 15, 4);
        for y in 5..8 {
            for x in 1..4 {
                mask[[y, x]] = 255;
            }
        }
        let contours = find_external_contours(mask.view()).unwrap();
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0].points()[0], Point::new(12, 1));
        assert_eq!(contours[1].points()[0], Point::new(1, 5));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let mask = rect_mask(16, 16, 2, 3, 9, 12);
        let a = find_external_contours(mask.view()).unwrap();
        let b = find_external_contours(mask.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_contains_or_touches() {
        let contour = Contour::new(vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ]);
        assert!(contour.contains_or_touches(Point::new(5, 5)));
        assert!(contour.contains_or_touches(Point::new(10, 4)));
        assert!(contour.contains_or_touches(Point::new(0, 0)));
        assert!(!contour.contains_or_touches(Point::new(11, 5)));
        assert!(!contour.contains_or_touches(Point::new(-1, -1)));
    }

    #[test]
    fn test_bounding_box() {
        let contour = Contour::new(vec![Point::new(3, 9), Point::new(7, 2), Point::new(5, 5)]);
        assert_eq!(
            contour.bounding_box(),
            Some((Point::new(3, 2), Point::new(7, 9)))
        );
    }

    #[test]
    fn test_flat_layout() {
        let contours = vec![Contour::new(vec![Point::new(1, 2), Point::new(3, 4)])];
        assert_eq!(contours_to_flat(&contours), vec![1, 2, 1, 2, 3, 4]);
    }
}
