//! Pixel-level visual-equivalence check.
//!
//! Both files are decoded to 8-bit RGBA. Two pixels match when all four
//! channels are equal, or when both are fully transparent: a pixel with
//! alpha 0 has no visible color, so optimizers are free to rewrite its RGB.
//!
//! The result is advisory. A mismatch flags the optimized file for manual
//! review; it never blocks the optimization.

use super::ImagingError;
use image::RgbaImage;
use std::path::Path;
use tracing::{debug, info};

/// Compare two images on disk. Decode failure on either side is an error,
/// never a silent `false`.
pub fn visually_equal(a: &Path, b: &Path) -> Result<bool, ImagingError> {
    let left = decode_rgba(a)?;
    let right = decode_rgba(b)?;
    let equal = pixels_equal(&left, &right);
    if !equal {
        info!(
            left = %a.display(),
            right = %b.display(),
            "images are not pixel-identical, manual comparison required"
        );
    }
    Ok(equal)
}

/// Compare two decoded buffers. Differing dimensions are never equal.
pub fn pixels_equal(left: &RgbaImage, right: &RgbaImage) -> bool {
    if left.dimensions() != right.dimensions() {
        debug!(
            left = ?left.dimensions(),
            right = ?right.dimensions(),
            "dimensions differ"
        );
        return false;
    }
    left.pixels().zip(right.pixels()).enumerate().all(|(i, (p, q))| {
        if p == q || (p[3] == 0 && q[3] == 0) {
            return true;
        }
        debug!(index = i, "pixel differs");
        false
    })
}

pub(super) fn decode_rgba(path: &Path) -> Result<RgbaImage, ImagingError> {
    let img = image::open(path).map_err(|source| ImagingError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgba8())
}
