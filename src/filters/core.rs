//! Core utilities shared by the filters and the editing engine:
//! - Gaussian kernel generation
//! - Binary mask algebra (union, erase, intersection)
//! - Colour blending
//! - Dimension checks

use ndarray::{Array2, ArrayView2, ArrayViewMut2, Zip};

use crate::error::{EngineError, Result};

/// Value stored in a binary mask for "set".
pub const MASK_ON: u8 = 255;

/// Generate a normalized 1D Gaussian kernel of a fixed (odd) size.
///
/// A non-positive `sigma` is derived from the size the way fixed-aperture
/// blurs usually do: `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel_1d_sized(size: usize, sigma: f32) -> Vec<f32> {
    let size = size.max(1) | 1;
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let half = size / 2;

    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - half as f32;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    // Normalize
    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    kernel
}

/// Blend `src` over `dst` with a constant opacity, rounding like a weighted add.
#[inline]
pub fn blend_pixel(dst: &mut [u8; 3], src: [u8; 3], opacity: f32) {
    let keep = 1.0 - opacity;
    for c in 0..3 {
        let v = src[c] as f32 * opacity + dst[c] as f32 * keep;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
}

/// `dst |= src` for binary masks.
pub fn mask_or_assign(dst: ArrayViewMut2<u8>, src: ArrayView2<u8>) {
    Zip::from(dst).and(src).for_each(|d, &s| {
        if s > 0 {
            *d = MASK_ON;
        }
    });
}

/// `dst &= !erase` for binary masks.
pub fn mask_and_not_assign(dst: ArrayViewMut2<u8>, erase: ArrayView2<u8>) {
    Zip::from(dst).and(erase).for_each(|d, &e| {
        if e > 0 {
            *d = 0;
        }
    });
}

/// `a & b` for binary masks.
pub fn mask_intersect(a: ArrayView2<u8>, b: ArrayView2<u8>) -> Array2<u8> {
    Zip::from(a)
        .and(b)
        .map_collect(|&x, &y| if x > 0 && y > 0 { MASK_ON } else { 0 })
}

/// True if any pixel of the mask is set.
pub fn mask_any(mask: ArrayView2<u8>) -> bool {
    mask.iter().any(|&v| v > 0)
}

/// Number of set pixels.
pub fn mask_count(mask: ArrayView2<u8>) -> usize {
    mask.iter().filter(|&&v| v > 0).count()
}

/// Tight bounding box `(y0, x0, y1, x1)` (exclusive ends) of the set pixels.
pub fn mask_bounds(mask: ArrayView2<u8>) -> Option<(usize, usize, usize, usize)> {
    let mut bounds: Option<(usize, usize, usize, usize)> = None;
    for ((y, x), &v) in mask.indexed_iter() {
        if v == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (y, x, y + 1, x + 1),
            Some((y0, x0, y1, x1)) => (y0.min(y), x0.min(x), y1.max(y + 1), x1.max(x + 1)),
        });
    }
    bounds
}

/// Fail with [`EngineError::MalformedMask`] unless `found` matches `expected`.
pub fn check_dims(expected: (usize, usize), found: (usize, usize)) -> Result<()> {
    if expected != found {
        return Err(EngineError::MalformedMask { expected, found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sized_kernel_is_symmetric() {
        let kernel = gaussian_kernel_1d_sized(5, 0.0);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(kernel.len(), 5);
        assert!((kernel[0] - kernel[4]).abs() < 1e-6);
        assert!(kernel[2] > kernel[1]);
    }

    #[test]
    fn test_blend_pixel_weights() {
        let mut px = [100, 100, 100];
        blend_pixel(&mut px, [200, 0, 100], 0.5);
        assert_eq!(px, [150, 50, 100]);
    }

    #[test]
    fn test_mask_algebra() {
        let mut a = Array2::<u8>::zeros((2, 2));
        let mut b = Array2::<u8>::zeros((2, 2));
        a[[0, 0]] = 255;
        b[[0, 1]] = 255;
        b[[0, 0]] = 255;

        assert_eq!(mask_count(mask_intersect(a.view(), b.view()).view()), 1);

        mask_or_assign(a.view_mut(), b.view());
        assert_eq!(mask_count(a.view()), 2);

        mask_and_not_assign(a.view_mut(), b.view());
        assert!(!mask_any(a.view()));
    }

    #[test]
    fn test_mask_bounds() {
        let mut m = Array2::<u8>::zeros((6, 6));
        assert_eq!(mask_bounds(m.view()), None);
        m[[1, 2]] = 255;
        m[[4, 3]] = 255;
        assert_eq!(mask_bounds(m.view()), Some((1, 2, 5, 4)));
    }

    #[test]
    fn test_check_dims() {
        assert!(check_dims((3, 4), (3, 4)).is_ok());
        assert!(matches!(
            check_dims((3, 4), (4, 3)),
            Err(EngineError::MalformedMask { .. })
        ));
    }
}
