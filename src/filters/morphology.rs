//! Binary morphology: cross dilation and skeleton thinning.
//!
//! Both operate on single-channel masks (height, width) where any non-zero
//! value is foreground; outputs use 0 / 255. Pixels outside the image count
//! as background.

use ndarray::{Array2, ArrayView2};

use super::core::MASK_ON;

// Ring order P2..P9: N, NE, E, SE, S, SW, W, NW
const RING: [(isize, isize); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

// ============================================================================
// Dilate
// ============================================================================

/// Dilate a binary mask with a 3x3 cross structuring element.
///
/// Each iteration grows foreground by one pixel along the four axis
/// directions, so a gap of `2 * iterations` pixels between two fragments on
/// the same row closes.
///
/// # Arguments
/// * `mask` - Binary mask
/// * `iterations` - Number of dilation passes; 0 returns a normalized copy
pub fn dilate_cross(mask: ArrayView2<u8>, iterations: u32) -> Array2<u8> {
    let (height, width) = mask.dim();
    let mut current = mask.mapv(|v| if v > 0 { MASK_ON } else { 0 });

    for _ in 0..iterations {
        let mut next = current.clone();
        for y in 0..height {
            for x in 0..width {
                if current[[y, x]] > 0 {
                    continue;
                }
                let hit = (y > 0 && current[[y - 1, x]] > 0)
                    || (y + 1 < height && current[[y + 1, x]] > 0)
                    || (x > 0 && current[[y, x - 1]] > 0)
                    || (x + 1 < width && current[[y, x + 1]] > 0);
                if hit {
                    next[[y, x]] = MASK_ON;
                }
            }
        }
        current = next;
    }

    current
}

// ============================================================================
// Skeletonize
// ============================================================================

/// Thin a binary mask to a one-pixel-wide centerline.
///
/// Two alternating sub-iterations mark boundary pixels (south-east side
/// first, then north-west) against a snapshot of the mask. Marked pixels are
/// then removed one by one, each re-checked against the current mask so a
/// pixel only goes while its foreground neighbours still form a single run
/// around it. The 8-connected components of the input therefore survive with
/// the same count, and end points (one neighbour) are never removed.
pub fn skeletonize(mask: ArrayView2<u8>) -> Array2<u8> {
    let (height, width) = mask.dim();
    let mut img = mask.mapv(|v| if v > 0 { MASK_ON } else { 0 });

    loop {
        let mut changed = false;

        for pass in 0..2 {
            let mut marked = Vec::new();
            for y in 0..height {
                for x in 0..width {
                    if img[[y, x]] == 0 {
                        continue;
                    }
                    let p = ring(&img, y, x);
                    if !is_simple(&p) {
                        continue;
                    }

                    // p[0]=N, p[2]=E, p[4]=S, p[6]=W
                    let removable = if pass == 0 {
                        !(p[0] && p[2] && p[4]) && !(p[2] && p[4] && p[6])
                    } else {
                        !(p[0] && p[2] && p[6]) && !(p[0] && p[4] && p[6])
                    };
                    if removable {
                        marked.push((y, x));
                    }
                }
            }

            for (y, x) in marked {
                if is_simple(&ring(&img, y, x)) {
                    img[[y, x]] = 0;
                    changed = true;
                }
            }
        }

        if !changed {
            break;
        }
    }

    img
}

/// Foreground flags of the eight neighbours in ring order.
fn ring(img: &Array2<u8>, y: usize, x: usize) -> [bool; 8] {
    let (height, width) = img.dim();
    let mut p = [false; 8];
    for (i, &(dy, dx)) in RING.iter().enumerate() {
        let ny = y as isize + dy;
        let nx = x as isize + dx;
        p[i] = ny >= 0
            && nx >= 0
            && (ny as usize) < height
            && (nx as usize) < width
            && img[[ny as usize, nx as usize]] > 0;
    }
    p
}

/// 2..=6 neighbours forming exactly one run around the pixel.
fn is_simple(p: &[bool; 8]) -> bool {
    let neighbours = p.iter().filter(|&&v| v).count();
    if !(2..=6).contains(&neighbours) {
        return false;
    }
    let transitions = (0..8).filter(|&i| !p[i] && p[(i + 1) % 8]).count();
    transitions == 1
}
