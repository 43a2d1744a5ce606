//! Image filters used by the edge-detection pipeline.
//!
//! ## Supported Formats
//!
//! | Format | Shape | Type | Description |
//! |--------|-------|------|-------------|
//! | RGB8 | (H, W, 3) | u8 | Base images, 0-255 |
//! | Mask8 | (H, W) | u8 | Binary masks, 0 or 255 (any non-zero reads as set) |
//!
//! ## Pipeline Stages
//!
//! - **Noise**: bilateral smoothing, keeps boundaries sharp
//! - **Blur**: fixed-aperture Gaussian
//! - **Edge detection**: Sobel gradients, Canny with hysteresis
//! - **Morphology**: cross dilation, skeleton thinning
//!
//! `core` holds the shared kernel, blending and mask helpers.

pub mod core;
pub mod noise;
pub mod blur;
pub mod edge;
pub mod morphology;
