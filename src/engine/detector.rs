//! Region edge detection: raw pixels to a solid edge mask plus contours.
//!
//! Stages, in order:
//! 1. Bilateral smoothing
//! 2. Gaussian blur
//! 3. Canny edges
//! 4. Cross dilation, `gap_filling_level` passes
//! 5. External contour extraction
//! 6. Contours filled back into a solid mask

use log::debug;
use ndarray::{s, Array2, ArrayView2, ArrayView3};

use crate::config::{validate_gap_level, EngineConfig};
use crate::error::Result;
use crate::filters::blur::gaussian_blur_rgb;
use crate::filters::core::{check_dims, mask_bounds, mask_intersect, mask_or_assign, MASK_ON};
use crate::filters::edge::canny;
use crate::filters::morphology::dilate_cross;
use crate::filters::noise::bilateral_rgb;
use crate::render::raster::fill_contour;
use crate::selection::contour::{find_external_contours, Contour, Point};

/// Output of one detection pass.
#[derive(Clone, Debug)]
pub struct Detection {
    /// Solid edge mask (0 / 255), same size as the input image.
    pub mask: Array2<u8>,
    /// External contours of `mask`, in image coordinates.
    pub contours: Vec<Contour>,
}

/// Stateless detection pipeline with fixed filter parameters.
#[derive(Clone, Debug)]
pub struct RegionEdgeDetector {
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    pub gaussian_kernel_size: u32,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for RegionEdgeDetector {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl RegionEdgeDetector {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            bilateral_diameter: config.bilateral_diameter,
            bilateral_sigma_color: config.bilateral_sigma_color,
            bilateral_sigma_space: config.bilateral_sigma_space,
            gaussian_kernel_size: config.gaussian_kernel_size,
            canny_low: config.canny_low,
            canny_high: config.canny_high,
        }
    }

    /// Detect edges over the whole image.
    ///
    /// # Arguments
    /// * `image` - RGB image (height, width, 3)
    /// * `level` - Gap-filling level (dilation passes), at least 1
    /// * `existing` - Mask to union the result into
    ///
    /// # Errors
    /// `InvalidParameter` for an out-of-range level, `MalformedMask` if
    /// `existing` has other dimensions, `DetectionFailed` if contour tracing
    /// gives up.
    pub fn detect(&self, image: ArrayView3<u8>, level: u32, existing: Option<ArrayView2<u8>>) -> Result<Detection> {
        validate_gap_level(level)?;
        let (height, width, _) = image.dim();
        if let Some(existing) = existing {
            check_dims((height, width), existing.dim())?;
        }

        let (mask, contours) = self.run(image, level, None)?;
        debug!(
            "detected {} contour(s) in {}x{} image at level {}",
            contours.len(),
            width,
            height,
            level
        );

        merge_existing(mask, contours, existing)
    }

    /// Detect edges only where `restrict` is set.
    ///
    /// Filtering runs on the bounding box of `restrict` plus a margin wide
    /// enough for the filter apertures, and Canny output outside `restrict`
    /// is discarded before gap filling. An empty `restrict` yields an empty
    /// detection (unioned with `existing`).
    pub fn detect_masked(
        &self,
        image: ArrayView3<u8>,
        level: u32,
        restrict: ArrayView2<u8>,
        existing: Option<ArrayView2<u8>>,
    ) -> Result<Detection> {
        validate_gap_level(level)?;
        let (height, width, _) = image.dim();
        check_dims((height, width), restrict.dim())?;
        if let Some(existing) = existing {
            check_dims((height, width), existing.dim())?;
        }

        let Some((y0, x0, y1, x1)) = mask_bounds(restrict) else {
            debug!("restricted detection over an empty region");
            return merge_existing(Array2::zeros((height, width)), Vec::new(), existing);
        };

        let margin = self.margin() + level as usize;
        let (cy0, cx0) = (y0.saturating_sub(margin), x0.saturating_sub(margin));
        let (cy1, cx1) = ((y1 + margin).min(height), (x1 + margin).min(width));

        let crop = image.slice(s![cy0..cy1, cx0..cx1, ..]);
        let crop_restrict = restrict.slice(s![cy0..cy1, cx0..cx1]);
        let (crop_mask, crop_contours) = self.run(crop, level, Some(crop_restrict))?;

        let mut mask = Array2::<u8>::zeros((height, width));
        mask.slice_mut(s![cy0..cy1, cx0..cx1]).assign(&crop_mask);

        let (ox, oy) = (cx0 as i32, cy0 as i32);
        let contours = crop_contours
            .into_iter()
            .map(|c| Contour::new(c.points().iter().map(|p| Point::new(p.x + ox, p.y + oy)).collect()))
            .collect::<Vec<_>>();

        debug!(
            "restricted detection over {}x{} crop at ({}, {}): {} contour(s)",
            cx1 - cx0,
            cy1 - cy0,
            cx0,
            cy0,
            contours.len()
        );

        merge_existing(mask, contours, existing)
    }

    /// Pixels a border artefact of the filter stages can reach.
    fn margin(&self) -> usize {
        (self.bilateral_diameter / 2 + self.gaussian_kernel_size / 2 + 1) as usize
    }

    fn run(
        &self,
        image: ArrayView3<u8>,
        level: u32,
        restrict: Option<ArrayView2<u8>>,
    ) -> Result<(Array2<u8>, Vec<Contour>)> {
        let smoothed = bilateral_rgb(
            image,
            self.bilateral_diameter,
            self.bilateral_sigma_color,
            self.bilateral_sigma_space,
        );
        let blurred = gaussian_blur_rgb(smoothed.view(), self.gaussian_kernel_size);
        let mut edges = canny(blurred.view(), self.canny_low, self.canny_high);
        if let Some(restrict) = restrict {
            edges = mask_intersect(edges.view(), restrict);
        }

        let dilated = dilate_cross(edges.view(), level);
        let contours = find_external_contours(dilated.view())?;

        let mut solid = Array2::<u8>::zeros(dilated.dim());
        for contour in &contours {
            fill_contour(&mut solid, contour, MASK_ON);
        }

        Ok((solid, contours))
    }
}

/// Union with an existing mask; contours then describe the union.
fn merge_existing(
    mut mask: Array2<u8>,
    contours: Vec<Contour>,
    existing: Option<ArrayView2<u8>>,
) -> Result<Detection> {
    match existing {
        None => Ok(Detection { mask, contours }),
        Some(existing) => {
            mask_or_assign(mask.view_mut(), existing);
            let contours = find_external_contours(mask.view())?;
            Ok(Detection { mask, contours })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_GAP_FILLING_LEVEL;
    use crate::error::EngineError;
    use crate::filters::core::{mask_any, mask_count};
    use ndarray::Array3;

    /// White canvas with a dark filled rectangle.
    fn rect_image(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> Array3<u8> {
        let mut img = Array3::<u8>::from_elem((h, w, 3), 255);
        for y in y0..y1 {
            for x in x0..x1 {
                for c in 0..3 {
                    img[[y, x, c]] = 20;
                }
            }
        }
        img
    }

    #[test]
    fn test_blank_image_has_no_edges() {
        let img = Array3::<u8>::from_elem((40, 40, 3), 255);
        let detection = RegionEdgeDetector::default().detect(img.view(), 3, None).unwrap();
        assert!(!mask_any(detection.mask.view()));
        assert!(detection.contours.is_empty());
    }

    #[test]
    fn test_rectangle_becomes_one_solid_region() {
        let img = rect_image(60, 60, 15, 15, 45, 45);
        let detection = RegionEdgeDetector::default().detect(img.view(), 2, None).unwrap();

        assert_eq!(detection.contours.len(), 1);
        // Filled: the rectangle centre is inside the solid mask
        assert_eq!(detection.mask[[30, 30]], 255);
        assert_eq!(detection.mask[[2, 2]], 0);
    }

    #[test]
    fn test_existing_mask_is_unioned() {
        let img = Array3::<u8>::from_elem((30, 30, 3), 255);
        let mut existing = Array2::<u8>::zeros((30, 30));
        existing[[5, 5]] = 255;

        let detection = RegionEdgeDetector::default()
            .detect(img.view(), 1, Some(existing.view()))
            .unwrap();

        assert_eq!(detection.mask[[5, 5]], 255);
        assert_eq!(detection.contours.len(), 1);
    }

    #[test]
    fn test_level_zero_is_rejected() {
        let img = Array3::<u8>::zeros((10, 10, 3));
        let err = RegionEdgeDetector::default().detect(img.view(), 0, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));

        let err = RegionEdgeDetector::default()
            .detect(img.view(), MAX_GAP_FILLING_LEVEL + 1, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
    }

    #[test]
    fn test_mismatched_existing_is_malformed() {
        let img = Array3::<u8>::zeros((10, 10, 3));
        let existing = Array2::<u8>::zeros((10, 11));
        let err = RegionEdgeDetector::default()
            .detect(img.view(), 1, Some(existing.view()))
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedMask { .. }));
    }

    #[test]
    fn test_restricted_detection_ignores_unpainted_structure() {
        // Two rectangles; only the left one is painted over
        let mut img = rect_image(100, 50, 10, 10, 30, 40);
        for y in 10..40 {
            for x in 60..80 {
                for c in 0..3 {
                    img[[y, x, c]] = 20;
                }
            }
        }
        let mut restrict = Array2::<u8>::zeros((50, 100));
        for y in 0..50 {
            for x in 0..45 {
                restrict[[y, x]] = 255;
            }
        }

        let detection = RegionEdgeDetector::default()
            .detect_masked(img.view(), 2, restrict.view(), None)
            .unwrap();

        assert_eq!(detection.mask[[25, 20]], 255);
        assert_eq!(detection.mask[[25, 70]], 0);
        assert_eq!(detection.contours.len(), 1);
        let (lo, _) = detection.contours[0].bounding_box().unwrap();
        assert!(lo.x >= 5 && lo.y >= 5);
    }

    #[test]
    fn test_restricted_detection_over_empty_region() {
        let img = rect_image(40, 40, 10, 10, 30, 30);
        let restrict = Array2::<u8>::zeros((40, 40));
        let detection = RegionEdgeDetector::default()
            .detect_masked(img.view(), 3, restrict.view(), None)
            .unwrap();
        assert_eq!(mask_count(detection.mask.view()), 0);
    }
}
