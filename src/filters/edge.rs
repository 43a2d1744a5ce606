//! Edge detection: Sobel gradients and Canny binary edges.
//!
//! ## Supported Formats
//!
//! Accepts images with 1 or 3 channels (height, width, channels). For colour
//! input every channel is differentiated and, per pixel, the channel with the
//! strongest response wins, so boundaries between equally bright colours are
//! still found.
//!
//! Output of [`canny`] is a binary mask (0 or 255) of shape (height, width).

use std::collections::VecDeque;

use ndarray::{Array2, ArrayView3};

use super::core::MASK_ON;

// tan(22.5°) and tan(67.5°) for direction quantisation
const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_6;

// ============================================================================
// Sobel Gradients
// ============================================================================

/// Compute horizontal and vertical Sobel derivatives.
///
/// Borders replicate the edge pixel. Values are raw 3x3 Sobel responses
/// (range ±1020 for u8 input).
///
/// # Returns
/// `(gx, gy)` arrays of shape (height, width)
pub fn sobel_gradients(input: ArrayView3<u8>) -> (Array2<f32>, Array2<f32>) {
    let (height, width, channels) = input.dim();
    let mut gx_out = Array2::<f32>::zeros((height, width));
    let mut gy_out = Array2::<f32>::zeros((height, width));

    // Sobel kernels
    let kernel_h: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
    let kernel_v: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

    let color_channels = channels.min(3);

    for y in 0..height {
        for x in 0..width {
            let mut best = (0i32, 0i32);
            let mut best_mag = -1i32;

            for c in 0..color_channels {
                let mut gx = 0i32;
                let mut gy = 0i32;

                for ky in 0..3 {
                    let py = (y as isize + ky as isize - 1).clamp(0, height as isize - 1) as usize;
                    for kx in 0..3 {
                        let px = (x as isize + kx as isize - 1).clamp(0, width as isize - 1) as usize;
                        let v = input[[py, px, c]] as i32;
                        gx += v * kernel_h[ky][kx];
                        gy += v * kernel_v[ky][kx];
                    }
                }

                let mag = gx.abs() + gy.abs();
                if mag > best_mag {
                    best_mag = mag;
                    best = (gx, gy);
                }
            }

            gx_out[[y, x]] = best.0 as f32;
            gy_out[[y, x]] = best.1 as f32;
        }
    }

    (gx_out, gy_out)
}

// ============================================================================
// Canny
// ============================================================================

/// Canny edge detection with hysteresis.
///
/// A pixel is an edge when its L1 gradient magnitude is a local maximum
/// across the gradient direction and either exceeds `high`, or exceeds
/// `low` while 8-connected (through other such pixels) to one that exceeds
/// `high`.
///
/// # Arguments
/// * `input` - Image with 1 or 3 channels
/// * `low` - Lower hysteresis threshold
/// * `high` - Upper hysteresis threshold
///
/// # Returns
/// Binary edge mask (0 / 255)
pub fn canny(input: ArrayView3<u8>, low: f32, high: f32) -> Array2<u8> {
    let (height, width, _) = input.dim();
    let mut edges = Array2::<u8>::zeros((height, width));
    if height == 0 || width == 0 {
        return edges;
    }

    let (gx, gy) = sobel_gradients(input);
    let magnitude = Array2::from_shape_fn((height, width), |(y, x)| gx[[y, x]].abs() + gy[[y, x]].abs());

    let mag_at = |y: isize, x: isize| -> f32 {
        if y < 0 || x < 0 || y >= height as isize || x >= width as isize {
            0.0
        } else {
            magnitude[[y as usize, x as usize]]
        }
    };

    // 0 = suppressed, 1 = weak candidate, 2 = strong
    let mut class = Array2::<u8>::zeros((height, width));
    let mut queue = VecDeque::new();

    for y in 0..height {
        for x in 0..width {
            let m = magnitude[[y, x]];
            if m <= low {
                continue;
            }

            let ax = gx[[y, x]].abs();
            let ay = gy[[y, x]].abs();
            let (yi, xi) = (y as isize, x as isize);

            let (a, b) = if ay <= ax * TAN_22_5 {
                (mag_at(yi, xi - 1), mag_at(yi, xi + 1))
            } else if ay > ax * TAN_67_5 {
                (mag_at(yi - 1, xi), mag_at(yi + 1, xi))
            } else if (gx[[y, x]] > 0.0) == (gy[[y, x]] > 0.0) {
                (mag_at(yi - 1, xi - 1), mag_at(yi + 1, xi + 1))
            } else {
                (mag_at(yi - 1, xi + 1), mag_at(yi + 1, xi - 1))
            };

            if !(m > a && m >= b) {
                continue;
            }

            if m > high {
                class[[y, x]] = 2;
                queue.push_back((y, x));
            } else {
                class[[y, x]] = 1;
            }
        }
    }

    // Hysteresis: grow strong pixels through weak candidates
    while let Some((y, x)) = queue.pop_front() {
        edges[[y, x]] = MASK_ON;
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                if dy == 0 && dx == 0 {
                    continue;
                }
                let ny = y as isize + dy;
                let nx = x as isize + dx;
                if ny < 0 || nx < 0 || ny >= height as isize || nx >= width as isize {
                    continue;
                }
                let (ny, nx) = (ny as usize, nx as usize);
                if class[[ny, nx]] == 1 {
                    class[[ny, nx]] = 2;
                    queue.push_back((ny, nx));
                }
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn vertical_step(width: usize, height: usize, split: usize, lo: u8, hi: u8) -> Array3<u8> {
        let mut img = Array3::<u8>::zeros((height, width, 3));
        for y in 0..height {
            for x in 0..width {
                let v = if x < split { lo } else { hi };
                for c in 0..3 {
                    img[[y, x, c]] = v;
                }
            }
        }
        img
    }

    #[test]
    fn test_sobel_detects_vertical_edge() {
        let img = vertical_step(5, 5, 2, 0, 255);
        let (gx, gy) = sobel_gradients(img.view());
        assert!(gx[[2, 2]] > 0.0);
        assert_eq!(gy[[2, 2]], 0.0);
    }

    #[test]
    fn test_sobel_uses_strongest_channel() {
        // Red and green halves of equal brightness
        let mut img = Array3::<u8>::zeros((5, 5, 3));
        for y in 0..5 {
            for x in 0..5 {
                if x < 2 {
                    img[[y, x, 0]] = 200;
                } else {
                    img[[y, x, 1]] = 200;
                }
            }
        }
        let (gx, _) = sobel_gradients(img.view());
        assert!(gx[[2, 2]].abs() >= 800.0);
    }

    #[test]
    fn test_canny_flat_is_empty() {
        let img = Array3::<u8>::from_elem((20, 20, 3), 255);
        let edges = canny(img.view(), 30.0, 100.0);
        assert!(edges.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_canny_step_gives_thin_line() {
        let img = vertical_step(12, 10, 6, 20, 220);
        let edges = canny(img.view(), 30.0, 100.0);

        for y in 0..10 {
            let row: usize = (0..12).filter(|&x| edges[[y, x]] > 0).count();
            assert_eq!(row, 1, "row {y} should hold exactly one edge pixel");
        }
    }

    #[test]
    fn test_canny_drops_weak_unconnected_edges() {
        // Step of 10 gives L1 magnitude 40: above low, below high
        let img = vertical_step(12, 10, 6, 100, 110);
        let edges = canny(img.view(), 30.0, 100.0);
        assert!(edges.iter().all(|&v| v == 0));
    }
}
