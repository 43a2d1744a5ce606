//! Gaussian blur for RGB images.
//!
//! Fixed-aperture separable blur used as the light denoise step before
//! thresholding gradients. Borders replicate the edge pixel; rows are
//! processed in parallel.

use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

use super::core::gaussian_kernel_1d_sized;

/// Apply a Gaussian blur with a fixed odd kernel size.
///
/// Sigma is derived from the size (size 5 gives sigma 1.1).
///
/// # Arguments
/// * `input` - Image (height, width, channels) as u8
/// * `kernel_size` - Odd aperture; 1 returns a copy
///
/// # Returns
/// Blurred image with same dimensions
pub fn gaussian_blur_rgb(input: ArrayView3<u8>, kernel_size: u32) -> Array3<u8> {
    let (height, width, channels) = input.dim();

    if kernel_size <= 1 || height == 0 || width == 0 {
        return input.to_owned();
    }

    let kernel = gaussian_kernel_1d_sized(kernel_size as usize, 0.0);
    let half = kernel.len() / 2;

    // Horizontal pass, rows in parallel, f32 for precision
    let temp_rows: Vec<Vec<f32>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = vec![0.0f32; width * channels];
            for x in 0..width {
                for c in 0..channels {
                    let mut sum = 0.0f32;
                    for (ki, &kv) in kernel.iter().enumerate() {
                        let sx = (x as isize + ki as isize - half as isize)
                            .clamp(0, width as isize - 1) as usize;
                        sum += input[[y, sx, c]] as f32 * kv;
                    }
                    row[x * channels + c] = sum;
                }
            }
            row
        })
        .collect();

    // Vertical pass
    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = vec![0u8; width * channels];
            for x in 0..width {
                for c in 0..channels {
                    let mut sum = 0.0f32;
                    for (ki, &kv) in kernel.iter().enumerate() {
                        let sy = (y as isize + ki as isize - half as isize)
                            .clamp(0, height as isize - 1) as usize;
                        sum += temp_rows[sy][x * channels + c] * kv;
                    }
                    row[x * channels + c] = sum.round().clamp(0.0, 255.0) as u8;
                }
            }
            row
        })
        .collect();

    let mut output = Array3::<u8>::zeros((height, width, channels));
    for (y, row) in rows.into_iter().enumerate() {
        for x in 0..width {
            for c in 0..channels {
                output[[y, x, c]] = row[x * channels + c];
            }
        }
    }
    output
}
