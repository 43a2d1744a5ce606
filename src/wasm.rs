//! WebAssembly exports for the edge engine.
//!
//! These functions are exposed to JavaScript via wasm-bindgen.
//!
//! ## Buffer Layout
//!
//! - Images arrive as flat RGBA bytes (canvas `ImageData` layout); alpha is
//!   ignored on input.
//! - Masks are flat bytes, one per pixel, 0 or 255.
//! - Contours are flattened as `[count, len1, x, y, x, y, ..., len2, ...]`.

use ndarray::{s, Array2, Array3};
use wasm_bindgen::prelude::*;

use crate::engine::detector::RegionEdgeDetector;
use crate::filters::morphology::{dilate_cross, skeletonize};
use crate::selection::contour::{contours_to_flat, find_external_contours, Point};
use crate::selection::export::export_cutout;
use crate::selection::picking::{SelectionEngine, SelectionSet};

fn rgb_from_rgba(data: &[u8], width: usize, height: usize) -> Result<Array3<u8>, JsValue> {
    let rgba = Array3::from_shape_vec((height, width, 4), data.to_vec())
        .map_err(|e| JsValue::from_str(&format!("invalid image dimensions: {e}")))?;
    Ok(rgba.slice(s![.., .., 0..3]).to_owned())
}

fn mask_from(data: &[u8], width: usize, height: usize) -> Result<Array2<u8>, JsValue> {
    Array2::from_shape_vec((height, width), data.to_vec())
        .map_err(|e| JsValue::from_str(&format!("invalid mask dimensions: {e}")))
}

// ============================================================================
// Detection
// ============================================================================

/// Detect edges in an RGBA image.
///
/// # Arguments
/// * `data` - Flat RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `gap_filling_level` - Dilation passes, 1..=32
///
/// # Returns
/// Flat solid edge mask (length = width * height)
#[wasm_bindgen]
pub fn find_edges_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    gap_filling_level: u32,
) -> Result<Vec<u8>, JsValue> {
    let image = rgb_from_rgba(data, width, height)?;
    let detection = RegionEdgeDetector::default()
        .detect(image.view(), gap_filling_level, None)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(detection.mask.into_raw_vec_and_offset().0)
}

/// External contours of a mask, flattened.
#[wasm_bindgen]
pub fn contours_wasm(mask: &[u8], width: usize, height: usize) -> Result<Vec<i32>, JsValue> {
    let mask = mask_from(mask, width, height)?;
    let contours = find_external_contours(mask.view()).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(contours_to_flat(&contours))
}

// ============================================================================
// Morphology
// ============================================================================

/// Dilate a mask with a 3x3 cross, `iterations` times.
#[wasm_bindgen]
pub fn dilate_cross_wasm(mask: &[u8], width: usize, height: usize, iterations: u32) -> Result<Vec<u8>, JsValue> {
    let mask = mask_from(mask, width, height)?;
    Ok(dilate_cross(mask.view(), iterations).into_raw_vec_and_offset().0)
}

/// Thin a mask to a one-pixel-wide skeleton.
#[wasm_bindgen]
pub fn skeletonize_wasm(mask: &[u8], width: usize, height: usize) -> Result<Vec<u8>, JsValue> {
    let mask = mask_from(mask, width, height)?;
    Ok(skeletonize(mask.view()).into_raw_vec_and_offset().0)
}

// ============================================================================
// Export
// ============================================================================

/// Cut out the contours of `edge_mask` under the given click points.
///
/// # Arguments
/// * `data` - Flat RGBA bytes of the base image
/// * `edge_mask` - Flat edge mask of the same size
/// * `clicks` - Flat `[x, y, x, y, ...]` primary clicks
///
/// # Returns
/// Flat RGBA cutout, alpha 255 inside the picked contours
#[wasm_bindgen]
pub fn export_cutout_wasm(
    data: &[u8],
    edge_mask: &[u8],
    width: usize,
    height: usize,
    clicks: &[i32],
) -> Result<Vec<u8>, JsValue> {
    let image = rgb_from_rgba(data, width, height)?;
    let mask = mask_from(edge_mask, width, height)?;
    let contours = find_external_contours(mask.view()).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let mut selection = SelectionSet::new();
    for click in clicks.chunks_exact(2) {
        SelectionEngine::primary_click(&contours, &mut selection, Point::new(click[0], click[1]));
    }

    Ok(export_cutout(image.view(), &selection).into_raw_vec_and_offset().0)
}
