//! Contour extraction, selection and export.
//!
//! - **Contour extraction**: external outlines of a binary edge mask
//! - **Picking**: hit-testing and the selection set
//! - **Export**: alpha-masked cutouts of the selection

pub mod contour;
pub mod picking;
pub mod export;

pub use contour::{find_external_contours, Contour, Point};
pub use export::{export_cutout, ClipboardSink, Cutout};
pub use picking::{SelectionEngine, SelectionSet};
