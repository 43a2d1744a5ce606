//! Contour overlay: outlines and translucent fills over the base image.

use ndarray::{Array2, Array3, ArrayView3};

use super::raster::{blend_masked, draw_polyline, fill_contour, paint_masked};
use crate::config::EngineConfig;
use crate::filters::core::MASK_ON;
use crate::selection::contour::Contour;
use crate::selection::picking::SelectionSet;

/// Renders the contour set onto a copy of the base image.
///
/// Unselected contours come first so selected outlines and fills end up on
/// top where they overlap.
#[derive(Clone, Debug)]
pub struct ContourOverlayCompositor {
    pub contour_color: [u8; 3],
    pub selected_color: [u8; 3],
    pub fill_opacity: f32,
    pub selected_fill_opacity: f32,
    pub min_fill_area: f64,
    pub outline_thickness: u32,
}

impl Default for ContourOverlayCompositor {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ContourOverlayCompositor {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            contour_color: config.contour_color,
            selected_color: config.selected_color,
            fill_opacity: config.fill_opacity,
            selected_fill_opacity: config.selected_fill_opacity,
            min_fill_area: config.min_fill_area,
            outline_thickness: config.outline_thickness,
        }
    }

    /// Render `contours` over `base`, highlighting members of `selection`.
    ///
    /// # Arguments
    /// * `base` - RGB image (height, width, 3)
    /// * `contours` - Current extraction
    /// * `selection` - Selected contours; membership by point sequence
    ///
    /// # Returns
    /// New RGB buffer; `base` is not modified
    pub fn compose(&self, base: ArrayView3<u8>, contours: &[Contour], selection: &SelectionSet) -> Array3<u8> {
        let mut out = base.to_owned();
        let (height, width, _) = base.dim();

        let (selected, unselected): (Vec<&Contour>, Vec<&Contour>) =
            contours.iter().partition(|c| selection.contains(c));

        for (group, color, opacity) in [
            (&unselected, self.contour_color, self.fill_opacity),
            (&selected, self.selected_color, self.selected_fill_opacity),
        ] {
            let mut fill = Array2::<u8>::zeros((height, width));
            let mut outline = Array2::<u8>::zeros((height, width));

            for contour in group.iter() {
                if contour.area() > self.min_fill_area {
                    fill_contour(&mut fill, contour, MASK_ON);
                }
                draw_polyline(&mut outline, contour.points(), true, self.outline_thickness, MASK_ON);
            }

            blend_masked(&mut out, fill.view(), color, opacity);
            paint_masked(&mut out, outline.view(), color);
        }

        out
    }
}
