//! Transparent cutouts of selected contours.
//!
//! The cutout has the base image's dimensions, alpha 255 inside the union of
//! the selected contours and 0 elsewhere. Colour is copied from the base
//! image inside the union and zero outside, so a premultiplying consumer
//! sees the same pixels as a straight-alpha one.
//!
//! Handing the buffer to the OS clipboard is up to the host through
//! [`ClipboardSink`].

use ndarray::{s, Array2, Array3, ArrayView3};

use super::picking::SelectionSet;
use crate::filters::core::{mask_bounds, MASK_ON};
use crate::render::raster::fill_contour;

/// Destination for exported cutouts (clipboard, file, ...).
pub trait ClipboardSink {
    type Error;

    /// Receive an RGBA image of shape (height, width, 4).
    fn put_rgba(&mut self, image: ArrayView3<u8>) -> Result<(), Self::Error>;
}

/// An RGBA cutout together with the bounds of its opaque area.
#[derive(Clone, Debug)]
pub struct Cutout {
    rgba: Array3<u8>,
    bounds: Option<(usize, usize, usize, usize)>,
}

impl Cutout {
    /// Build the cutout of `selection` from an RGB `base`.
    pub fn from_selection(base: ArrayView3<u8>, selection: &SelectionSet) -> Self {
        let (height, width, _) = base.dim();

        let mut alpha = Array2::<u8>::zeros((height, width));
        for contour in selection.iter() {
            fill_contour(&mut alpha, contour, MASK_ON);
        }

        let mut rgba = Array3::<u8>::zeros((height, width, 4));
        for ((y, x), &a) in alpha.indexed_iter() {
            if a == 0 {
                continue;
            }
            for c in 0..3 {
                rgba[[y, x, c]] = base[[y, x, c]];
            }
            rgba[[y, x, 3]] = a;
        }

        let bounds = mask_bounds(alpha.view());
        Self { rgba, bounds }
    }

    /// Full-size RGBA buffer.
    pub fn rgba(&self) -> ArrayView3<u8> {
        self.rgba.view()
    }

    pub fn into_rgba(self) -> Array3<u8> {
        self.rgba
    }

    /// `(y0, x0, y1, x1)` of the opaque area, ends exclusive; `None` when empty.
    pub fn bounds(&self) -> Option<(usize, usize, usize, usize)> {
        self.bounds
    }

    /// The opaque area only, or `None` for an empty selection.
    pub fn cropped(&self) -> Option<Array3<u8>> {
        let (y0, x0, y1, x1) = self.bounds?;
        Some(self.rgba.slice(s![y0..y1, x0..x1, ..]).to_owned())
    }
}

/// RGBA cutout of the selected contours, same size as `base`.
pub fn export_cutout(base: ArrayView3<u8>, selection: &SelectionSet) -> Array3<u8> {
    Cutout::from_selection(base, selection).into_rgba()
}
