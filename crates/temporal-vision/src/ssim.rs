//! Windowed structural similarity between normalized intensity buffers.

use image::{GrayImage, Luma};
use ndarray::Array2;

use crate::types::{ChangeError, ChangeResult};

/// Side length of the local comparison window.
pub const SSIM_WINDOW: usize = 7;

/// Stabilizing constants from the standard SSIM formulation (L = 255).
const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Scalar similarity score plus the per-pixel dissimilarity map.
#[derive(Debug, Clone)]
pub struct SimilarityResult {
    /// Mean windowed similarity over the full frame, in `[0, 1]`.
    /// Exactly `1.0` iff the two buffers are pixel-identical.
    pub score: f64,
    /// Per-pixel dissimilarity (`1 - local similarity`) rescaled to `0..=255`,
    /// same dimensions as the normalized inputs.
    pub dissimilarity: GrayImage,
}

/// Compute the windowed structural similarity of two equal-dimension
/// intensity buffers.
///
/// Deterministic: summation order is fixed, so identical inputs and window
/// size give bit-reproducible output. Windows are truncated at the frame
/// border so the map covers every pixel.
pub fn structural_similarity(
    before: &GrayImage,
    after: &GrayImage,
) -> ChangeResult<SimilarityResult> {
    let (w, h) = before.dimensions();
    debug_assert_eq!(
        before.dimensions(),
        after.dimensions(),
        "normalizer must reconcile dimensions before scoring"
    );
    if before.dimensions() != after.dimensions() {
        return Err(ChangeError::DimensionMismatch {
            width_a: w,
            height_a: h,
            width_b: after.width(),
            height_b: after.height(),
        });
    }
    if w == 0 || h == 0 {
        return Ok(SimilarityResult {
            score: 1.0,
            dissimilarity: GrayImage::new(w, h),
        });
    }

    let a = to_f64(before);
    let b = to_f64(after);

    let radius = SSIM_WINDOW / 2;
    let width = w as usize;
    let height = h as usize;

    let mut local = Array2::<f64>::zeros((height, width));
    let mut sum = 0.0;
    for y in 0..height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius).min(height - 1);
        for x in 0..width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(width - 1);
            let s = window_similarity(&a, &b, x0, x1, y0, y1).clamp(0.0, 1.0);
            local[[y, x]] = s;
            sum += s;
        }
    }
    let score = sum / (width as f64 * height as f64);

    let mut dissimilarity = GrayImage::new(w, h);
    for y in 0..height {
        for x in 0..width {
            let d = ((1.0 - local[[y, x]]) * 255.0).round() as u8;
            dissimilarity.put_pixel(x as u32, y as u32, Luma([d]));
        }
    }

    Ok(SimilarityResult {
        score,
        dissimilarity,
    })
}

fn to_f64(img: &GrayImage) -> Array2<f64> {
    let (w, h) = img.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
        f64::from(img.get_pixel(x as u32, y as u32).0[0])
    })
}

/// SSIM of one window: local means, variances, and covariance combined with
/// the stabilizing constants. Bounded in `[-1, 1]` before the caller clamps.
fn window_similarity(
    a: &Array2<f64>,
    b: &Array2<f64>,
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
) -> f64 {
    let n = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;

    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    for y in y0..=y1 {
        for x in x0..=x1 {
            sum_a += a[[y, x]];
            sum_b += b[[y, x]];
        }
    }
    let mean_a = sum_a / n;
    let mean_b = sum_b / n;

    let mut var_a = 0.0;
    let mut var_b = 0.0;
    let mut cov = 0.0;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let da = a[[y, x]] - mean_a;
            let db = b[[y, x]] - mean_b;
            var_a += da * da;
            var_b += db * db;
            cov += da * db;
        }
    }
    var_a /= n;
    var_b /= n;
    cov /= n;

    ((2.0 * mean_a * mean_b + C1) * (2.0 * cov + C2))
        / ((mean_a * mean_a + mean_b * mean_b + C1) * (var_a + var_b + C2))
}
