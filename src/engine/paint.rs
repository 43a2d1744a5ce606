//! Brush strokes: pointer motion to painted areas with translucent feedback.
//!
//! Two masks are kept. The stroke mask collects what the brush touched since
//! the last flush; the painted-areas mask accumulates everything painted
//! since the last commit. Only pixels in the stroke mask but not yet in
//! painted areas are blended, so going over the same spot again never
//! darkens it further.

use log::debug;
use ndarray::{Array2, Array3};

use crate::config::EngineConfig;
use crate::filters::core::{blend_pixel, mask_any, MASK_ON};
use crate::render::raster::{draw_thick_line, fill_disk};
use crate::selection::contour::Point;

#[derive(Clone, Debug)]
pub struct PaintAccumulator {
    radius: u32,
    highlight: [u8; 3],
    opacity: f32,
    paint_mask: Array2<u8>,
    painted_areas: Array2<u8>,
    last: Option<Point>,
}

impl PaintAccumulator {
    /// Empty accumulator for an image of (height, width).
    pub fn new(dims: (usize, usize), config: &EngineConfig) -> Self {
        Self {
            radius: config.brush_radius,
            highlight: config.highlight_color,
            opacity: config.blend_opacity,
            paint_mask: Array2::zeros(dims),
            painted_areas: Array2::zeros(dims),
            last: None,
        }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: u32) {
        self.radius = radius;
    }

    /// Pixels painted since the last commit.
    pub fn painted_areas(&self) -> &Array2<u8> {
        &self.painted_areas
    }

    /// Pixels touched since the last flush; empty between increments.
    pub fn paint_mask(&self) -> &Array2<u8> {
        &self.paint_mask
    }

    pub fn has_paint(&self) -> bool {
        mask_any(self.painted_areas.view())
    }

    pub fn is_stroking(&self) -> bool {
        self.last.is_some()
    }

    /// Start a stroke with a disk at `p`.
    ///
    /// # Returns
    /// Number of pixels newly blended into `overlay`
    pub fn begin_stroke(&mut self, p: Point, overlay: &mut Array3<u8>) -> usize {
        fill_disk(&mut self.paint_mask, p, self.radius, MASK_ON);
        self.last = Some(p);
        self.flush(overlay)
    }

    /// Extend the stroke to `p` with a segment `2 * radius` wide.
    ///
    /// Without a stroke in progress this behaves like [`Self::begin_stroke`].
    pub fn move_to(&mut self, p: Point, overlay: &mut Array3<u8>) -> usize {
        match self.last {
            Some(prev) => draw_thick_line(&mut self.paint_mask, prev, p, self.radius.saturating_mul(2), MASK_ON),
            None => fill_disk(&mut self.paint_mask, p, self.radius, MASK_ON),
        }
        self.last = Some(p);
        self.flush(overlay)
    }

    /// Finish the stroke.
    ///
    /// # Returns
    /// Whether anything has been painted since the last commit
    pub fn end_stroke(&mut self) -> bool {
        self.last = None;
        self.has_paint()
    }

    /// Blend the not-yet-painted part of the stroke mask into `overlay`,
    /// record it as painted and clear the stroke mask.
    pub fn flush(&mut self, overlay: &mut Array3<u8>) -> usize {
        let mut fresh = 0usize;
        for ((y, x), m) in self.paint_mask.indexed_iter_mut() {
            if *m == 0 {
                continue;
            }
            *m = 0;
            if self.painted_areas[[y, x]] > 0 {
                continue;
            }

            let mut px = [overlay[[y, x, 0]], overlay[[y, x, 1]], overlay[[y, x, 2]]];
            blend_pixel(&mut px, self.highlight, self.opacity);
            for c in 0..3 {
                overlay[[y, x, c]] = px[c];
            }
            self.painted_areas[[y, x]] = MASK_ON;
            fresh += 1;
        }

        if fresh > 0 {
            debug!("blended {fresh} newly painted pixel(s)");
        }
        fresh
    }

    /// Forget all paint (after a commit).
    pub fn reset(&mut self) {
        self.paint_mask.fill(0);
        self.painted_areas.fill(0);
        self.last = None;
    }

    /// Replace the painted areas (history restore).
    pub(crate) fn restore(&mut self, painted_areas: Array2<u8>) {
        self.paint_mask.fill(0);
        self.painted_areas = painted_areas;
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::core::mask_count;

    fn setup() -> (PaintAccumulator, Array3<u8>) {
        let config = EngineConfig {
            brush_radius: 4,
            ..EngineConfig::default()
        };
        (
            PaintAccumulator::new((40, 40), &config),
            Array3::from_elem((40, 40, 3), 201),
        )
    }

    #[test]
    fn test_stroke_start_blends_disk() {
        let (mut paint, mut overlay) = setup();
        let fresh = paint.begin_stroke(Point::new(10, 10), &mut overlay);

        assert_eq!(fresh, mask_count(paint.painted_areas().view()));
        // 201 * 0.7 + [255, 0, 255] * 0.3
        assert_eq!(
            [overlay[[10, 10, 0]], overlay[[10, 10, 1]], overlay[[10, 10, 2]]],
            [217, 141, 217]
        );
        assert_eq!(overlay[[30, 30, 0]], 201);
        assert!(!mask_any(paint.paint_mask().view()));
    }

    #[test]
    fn test_no_double_blend() {
        let (mut paint, mut overlay) = setup();
        paint.begin_stroke(Point::new(10, 10), &mut overlay);
        let after_first = overlay.clone();

        let fresh = paint.move_to(Point::new(10, 10), &mut overlay);
        paint.end_stroke();
        paint.begin_stroke(Point::new(10, 10), &mut overlay);

        assert_eq!(fresh, 0);
        assert_eq!(overlay, after_first);
    }

    #[test]
    fn test_fast_motion_leaves_no_gap() {
        let (mut paint, mut overlay) = setup();
        paint.begin_stroke(Point::new(5, 20), &mut overlay);
        paint.move_to(Point::new(35, 20), &mut overlay);

        for x in 5..=35 {
            assert_eq!(paint.painted_areas()[[20, x]], 255, "x = {x}");
        }
    }

    #[test]
    fn test_end_stroke_reports_paint() {
        let (mut paint, mut overlay) = setup();
        assert!(!paint.end_stroke());
        paint.begin_stroke(Point::new(3, 3), &mut overlay);
        assert!(paint.end_stroke());
        assert!(!paint.is_stroking());
    }

    #[test]
    fn test_painted_areas_cover_stroke_mask() {
        let (mut paint, mut overlay) = setup();
        paint.begin_stroke(Point::new(10, 10), &mut overlay);
        paint.move_to(Point::new(20, 15), &mut overlay);
        for (m, p) in paint.paint_mask().iter().zip(paint.painted_areas().iter()) {
            assert!(*m == 0 || *p > 0);
        }
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut paint, mut overlay) = setup();
        paint.begin_stroke(Point::new(10, 10), &mut overlay);
        paint.reset();
        assert!(!paint.has_paint());
        assert!(!paint.is_stroking());
    }
}
