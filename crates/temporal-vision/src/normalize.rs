//! Intensity conversion and dimension reconciliation for image pairs.

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::types::SceneImage;

/// Convert both images to single-channel intensity and reconcile dimensions.
///
/// When the dimensions differ, both sides are brought to the element-wise
/// minimum of the pair's (width, height) with area-weighted linear filtering,
/// so neither image is ever upsampled beyond its native resolution. A buffer
/// already at the target dimensions is passed through untouched.
pub fn normalize_pair(before: &SceneImage, after: &SceneImage) -> (GrayImage, GrayImage) {
    let gray_before = before.as_dynamic().to_luma8();
    let gray_after = after.as_dynamic().to_luma8();

    if gray_before.dimensions() == gray_after.dimensions() {
        return (gray_before, gray_after);
    }

    let target_w = gray_before.width().min(gray_after.width());
    let target_h = gray_before.height().min(gray_after.height());
    tracing::debug!("reconciling image dimensions to {target_w}x{target_h}");

    (
        fit(gray_before, target_w, target_h),
        fit(gray_after, target_w, target_h),
    )
}

fn fit(gray: GrayImage, width: u32, height: u32) -> GrayImage {
    if gray.dimensions() == (width, height) {
        gray
    } else {
        imageops::resize(&gray, width, height, FilterType::Triangle)
    }
}
