//! Gap-filling merge of a disk-shaped neighbourhood into the global edge mask.
//!
//! Add mode re-dilates the edges already under the disk and thins them back
//! to a skeleton before OR-ing the result in, so repeated application closes
//! small breaks without thickening the stored mask. Remove mode erases the
//! whole disk.

use log::debug;
use ndarray::{s, Array2};

use crate::config::validate_gap_level;
use crate::error::Result;
use crate::filters::core::{mask_and_not_assign, mask_any, mask_intersect, mask_or_assign};
use crate::filters::morphology::{dilate_cross, skeletonize};
use crate::render::raster::disk_mask;
use crate::selection::contour::Point;

/// Pixels the working disk is shrunk by relative to the displayed cursor.
pub const CURSOR_INSET: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// OR the re-thinned neighbourhood into the mask (primary button).
    Add,
    /// Clear everything under the disk (secondary button).
    Remove,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The mask was updated.
    Applied,
    /// No edge pixels under the disk; nothing changed.
    EmptyRegion,
    /// Contours could not be recomputed for the merged mask; the session
    /// kept its previous state.
    DetectionFailed,
}

/// A computed merge step, not yet written to the mask.
///
/// Committing the same plan again leaves the mask unchanged: both the union
/// and the erase are idempotent.
#[derive(Clone, Debug)]
pub struct MergePlan {
    mode: MergeMode,
    origin: (usize, usize),
    patch: Array2<u8>,
}

impl MergePlan {
    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    /// Write the step into `edge_mask` (the mask it was planned against).
    pub fn commit(&self, edge_mask: &mut Array2<u8>) {
        let (y0, x0) = self.origin;
        let (h, w) = self.patch.dim();
        let target = edge_mask.slice_mut(s![y0..y0 + h, x0..x0 + w]);
        match self.mode {
            MergeMode::Add => mask_or_assign(target, self.patch.view()),
            MergeMode::Remove => mask_and_not_assign(target, self.patch.view()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GapFillMerger;

impl GapFillMerger {
    /// Radius of the working disk for a displayed cursor radius.
    pub fn working_radius(cursor_radius: u32) -> u32 {
        cursor_radius.saturating_sub(CURSOR_INSET)
    }

    /// Compute one merge step at `center` without touching the mask.
    ///
    /// # Returns
    /// `None` when no edge pixel lies under the working disk
    ///
    /// # Errors
    /// `InvalidParameter` for a level outside `1..=MAX_GAP_FILLING_LEVEL`.
    pub fn plan(
        &self,
        edge_mask: &Array2<u8>,
        center: Point,
        cursor_radius: u32,
        level: u32,
        mode: MergeMode,
    ) -> Result<Option<MergePlan>> {
        validate_gap_level(level)?;

        let radius = Self::working_radius(cursor_radius);
        let (height, width) = edge_mask.dim();

        // Dilation cannot spread further than `level` pixels past the disk
        let reach = match mode {
            MergeMode::Add => radius as i64 + level as i64 + 1,
            MergeMode::Remove => radius as i64,
        };
        let clip = |v: i64, hi: usize| v.clamp(0, hi as i64) as usize;
        let y0 = clip(center.y as i64 - reach, height);
        let y1 = clip(center.y as i64 + reach + 1, height);
        let x0 = clip(center.x as i64 - reach, width);
        let x1 = clip(center.x as i64 + reach + 1, width);

        let local = Point::new(center.x - x0 as i32, center.y - y0 as i32);
        let disk = disk_mask((y1 - y0, x1 - x0), local, radius);
        let region = mask_intersect(edge_mask.slice(s![y0..y1, x0..x1]), disk.view());
        if !mask_any(region.view()) {
            return Ok(None);
        }

        let patch = match mode {
            MergeMode::Remove => disk,
            MergeMode::Add => skeletonize(dilate_cross(region.view(), level).view()),
        };

        Ok(Some(MergePlan {
            mode,
            origin: (y0, x0),
            patch,
        }))
    }

    /// Plan and commit one merge step.
    ///
    /// # Arguments
    /// * `edge_mask` - Global edge mask, modified in place
    /// * `center` - Pointer position in image coordinates
    /// * `cursor_radius` - Displayed cursor radius
    /// * `level` - Dilation passes, at least 1
    /// * `mode` - Add or remove
    ///
    /// # Errors
    /// `InvalidParameter` for an out-of-range level; the mask is untouched.
    pub fn apply(
        &self,
        edge_mask: &mut Array2<u8>,
        center: Point,
        cursor_radius: u32,
        level: u32,
        mode: MergeMode,
    ) -> Result<MergeOutcome> {
        match self.plan(edge_mask, center, cursor_radius, level, mode)? {
            None => Ok(MergeOutcome::EmptyRegion),
            Some(plan) => {
                plan.commit(edge_mask);
                debug!(
                    "{:?} merge r={} level={} at ({}, {})",
                    mode,
                    Self::working_radius(cursor_radius),
                    level,
                    center.x,
                    center.y
                );
                Ok(MergeOutcome::Applied)
            }
        }
    }
}
