//! RGB preview of the two input channels and a cell-outline overlay.

use ndarray::{Array2, Array3};

const UPPER_PERCENTILE: f64 = 99.8;

/// Linear-interpolated percentile of the non-zero values, `None` if all zero.
fn nonzero_percentile(channel: &Array2<u8>, pct: f64) -> Option<f64> {
    let mut values: Vec<u8> = channel.iter().copied().filter(|&v| v > 0).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let pos = pct / 100.0 * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(f64::from(values[lo]) * (1.0 - frac) + f64::from(values[hi]) * frac)
}

fn stretch(channel: &Array2<u8>) -> Array2<u8> {
    match nonzero_percentile(channel, UPPER_PERCENTILE) {
        Some(upper) if upper > 0.0 => {
            channel.mapv(|v| ((f64::from(v) / upper).clamp(0.0, 1.0) * 255.0) as u8)
        }
        _ => channel.clone(),
    }
}

/// Internal channel in green, boundary channel in blue.
pub fn rgb_image(internal: &Array2<u8>, boundary: &Array2<u8>) -> Array3<u8> {
    let (h, w) = internal.dim();
    let green = stretch(internal);
    let blue = stretch(boundary);
    let mut rgb = Array3::<u8>::zeros((h, w, 3));
    for ((y, x), &g) in green.indexed_iter() {
        rgb[[y, x, 1]] = g;
        rgb[[y, x, 2]] = blue[[y, x]];
    }
    rgb
}

/// Labelled pixels with a 4-neighbour carrying a different label.
pub fn inner_boundaries(mask: &Array2<u32>) -> Array2<bool> {
    let (h, w) = mask.dim();
    Array2::from_shape_fn((h, w), |(y, x)| {
        let label = mask[[y, x]];
        if label == 0 {
            return false;
        }
        let differs = |ny: usize, nx: usize| mask[[ny, nx]] != label;
        (y > 0 && differs(y - 1, x))
            || (y + 1 < h && differs(y + 1, x))
            || (x > 0 && differs(y, x - 1))
            || (x + 1 < w && differs(y, x + 1))
    })
}

/// Copy of `rgb` with cell outlines painted white.
pub fn outline_overlay(rgb: &Array3<u8>, mask: &Array2<u32>) -> Array3<u8> {
    let mut out = rgb.clone();
    for ((y, x), &edge) in inner_boundaries(mask).indexed_iter() {
        if edge {
            for c in 0..3 {
                out[[y, x, c]] = 255;
            }
        }
    }
    out
}
