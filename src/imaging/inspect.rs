//! Probes the GIF pipeline runs before deciding on format conversion, and
//! the in-process PNG re-encode it tries before falling back to `convert`.

use super::ImagingError;
use super::compare::decode_rgba;
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// True if any pixel is not fully opaque.
pub fn has_alpha_transparency(path: &Path) -> Result<bool, ImagingError> {
    let img = decode_rgba(path)?;
    let found = img.pixels().any(|p| p[3] != u8::MAX);
    debug!(file = %path.display(), alpha = found, "alpha transparency check");
    Ok(found)
}

/// True if the GIF holds more than one frame.
pub fn is_animated_gif(path: &Path) -> Result<bool, ImagingError> {
    let decode_err = |source| ImagingError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path)?);
    let decoder = GifDecoder::new(reader).map_err(decode_err)?;
    let mut frames = 0;
    for frame in decoder.into_frames().take(2) {
        frame.map_err(decode_err)?;
        frames += 1;
    }
    Ok(frames > 1)
}

/// Decode `source` and write it as a PNG to `target`.
pub fn reencode_png(source: &Path, target: &Path) -> Result<(), ImagingError> {
    let img = image::open(source).map_err(|source_err| ImagingError::Decode {
        path: source.to_path_buf(),
        source: source_err,
    })?;
    img.save_with_format(target, ImageFormat::Png)
        .map_err(|source| ImagingError::Encode {
            path: target.to_path_buf(),
            source,
        })
}
