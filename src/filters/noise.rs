//! Noise reduction: edge-preserving bilateral smoothing.
//!
//! Each output pixel is a weighted mean of its circular neighbourhood where
//! the weight falls off with both spatial distance and colour difference, so
//! flat areas are smoothed while strong boundaries stay sharp.
//!
//! Input is RGB (height, width, 3) u8; rows are processed in parallel.

use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

/// Apply a bilateral filter - u8 RGB version.
///
/// # Arguments
/// * `input` - RGB image (height, width, 3)
/// * `diameter` - Neighbourhood diameter in pixels (odd; 9 is a good default)
/// * `sigma_color` - Colour similarity falloff (L1 distance over the three channels)
/// * `sigma_space` - Spatial falloff in pixels
///
/// # Returns
/// Smoothed image with the same shape
pub fn bilateral_rgb(
    input: ArrayView3<u8>,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    if height == 0 || width == 0 {
        return input.to_owned();
    }

    let radius = (diameter.max(1) / 2) as isize;

    // Neighbourhood offsets inside the disk, with their spatial weights
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let mut offsets: Vec<(isize, isize, f32)> = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r_sq = (dx * dx + dy * dy) as f32;
            if r_sq.sqrt() > radius as f32 {
                continue;
            }
            offsets.push((dy, dx, (r_sq * space_coeff).exp()));
        }
    }

    // Colour weights indexed by L1 distance
    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let max_dist = 255 * channels;
    let color_weights: Vec<f32> = (0..=max_dist)
        .map(|d| ((d * d) as f32 * color_coeff).exp())
        .collect();

    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = vec![0u8; width * channels];
            let mut sum = vec![0.0f32; channels];

            for x in 0..width {
                sum.iter_mut().for_each(|s| *s = 0.0);
                let mut weight_sum = 0.0f32;

                for &(dy, dx, space_weight) in &offsets {
                    let sy = (y as isize + dy).clamp(0, height as isize - 1) as usize;
                    let sx = (x as isize + dx).clamp(0, width as isize - 1) as usize;

                    let dist: usize = (0..channels)
                        .map(|c| (input[[sy, sx, c]] as i32 - input[[y, x, c]] as i32).unsigned_abs() as usize)
                        .sum();
                    let weight = space_weight * color_weights[dist];

                    for (c, s) in sum.iter_mut().enumerate() {
                        *s += input[[sy, sx, c]] as f32 * weight;
                    }
                    weight_sum += weight;
                }

                for c in 0..channels {
                    row[x * channels + c] = if weight_sum > 0.0 {
                        (sum[c] / weight_sum).round().clamp(0.0, 255.0) as u8
                    } else {
                        input[[y, x, c]]
                    };
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
