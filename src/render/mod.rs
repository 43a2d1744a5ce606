//! Drawing: rasterization primitives and the contour overlay.
//!
//! Everything here writes into buffers owned by the caller or returns new
//! ones; the base image is never modified.

pub mod raster;
pub mod overlay;

pub use overlay::ContourOverlayCompositor;
