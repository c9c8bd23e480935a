//! Shared test utilities for the shrinkray test suite.
//!
//! Fixtures are real, decodable images built with the `image` crate. A
//! fixture can carry a tail of [`PAD`] bytes after the format trailer:
//! decoders ignore it, and the mock compressors in
//! [`crate::tools::runner::tests::MockRunner`] "optimize" a file by
//! stripping it. That gives tests a file that shrinks under the pipeline
//! without losing a single pixel.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let png = tmp.path().join("a.png");
//! write_png(&png, &checkerboard(8, 8), 256);
//! assert_eq!(strip_padding(&std::fs::read(&png).unwrap()).len() + 256,
//!            std::fs::metadata(&png).unwrap().len() as usize);
//! ```

use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, ImageFormat, Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Filler byte appended after a fixture's trailer. None of the three
/// formats ends on this byte, so stripping it never eats real data.
pub const PAD: u8 = 0xAB;

// =========================================================================
// Padding
// =========================================================================

/// Drop every trailing [`PAD`] byte.
pub fn strip_padding(bytes: &[u8]) -> Vec<u8> {
    let end = bytes
        .iter()
        .rposition(|b| *b != PAD)
        .map_or(0, |last| last + 1);
    bytes[..end].to_vec()
}

fn append_padding(path: &Path, padding: usize) {
    if padding == 0 {
        return;
    }
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(&vec![PAD; padding]).unwrap();
}

// =========================================================================
// Pixel buffers
// =========================================================================

/// Opaque two-color checkerboard.
pub fn checkerboard(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([20, 40, 200, 255])
        } else {
            Rgba([240, 230, 10, 255])
        }
    })
}

/// Checkerboard with its top-left pixel fully transparent.
pub fn with_transparent_corner(width: u32, height: u32) -> RgbaImage {
    let mut img = checkerboard(width, height);
    img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
    img
}

// =========================================================================
// Fixture writers
// =========================================================================

pub fn write_png(path: &Path, img: &RgbaImage, padding: usize) {
    img.save_with_format(path, ImageFormat::Png).unwrap();
    append_padding(path, padding);
}

pub fn write_gif(path: &Path, img: &RgbaImage, padding: usize) {
    img.save_with_format(path, ImageFormat::Gif).unwrap();
    append_padding(path, padding);
}

/// Baseline JPEG of an opaque checkerboard. Alpha is dropped.
pub fn write_jpeg(path: &Path, width: u32, height: u32, padding: usize) {
    let rgb = image::DynamicImage::ImageRgba8(checkerboard(width, height)).to_rgb8();
    rgb.save_with_format(path, ImageFormat::Jpeg).unwrap();
    append_padding(path, padding);
}

/// GIF with `frames` distinct frames.
pub fn write_animated_gif(path: &Path, frames: u32) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = GifEncoder::new(file);
    for i in 0..frames {
        let mut img = checkerboard(4, 4);
        img.put_pixel(i % 4, 0, Rgba([255, 0, 0, 255]));
        let frame = Frame::from_parts(img, 0, 0, Delay::from_numer_denom_ms(100, 1));
        encoder.encode_frame(frame).unwrap();
    }
}

// =========================================================================
// Assertions
// =========================================================================

/// SHA-256 of a file's bytes.
pub fn sha256(path: &Path) -> [u8; 32] {
    Sha256::digest(std::fs::read(path).unwrap()).into()
}

/// Size of a file in bytes. Panics if it does not exist.
pub fn size_of(path: &Path) -> u64 {
    std::fs::metadata(path)
        .unwrap_or_else(|e| panic!("{} should exist: {e}", path.display()))
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn strip_padding_only_touches_the_tail() {
        assert_eq!(strip_padding(&[1, PAD, 2, PAD, PAD]), vec![1, PAD, 2]);
        assert_eq!(strip_padding(&[PAD, PAD]), Vec::<u8>::new());
        assert_eq!(strip_padding(&[]), Vec::<u8>::new());
        assert_eq!(strip_padding(&[7]), vec![7]);
    }

    #[test]
    fn padded_fixtures_still_decode() {
        let tmp = TempDir::new().unwrap();
        let png = tmp.path().join("a.png");
        let gif = tmp.path().join("a.gif");
        let jpg = tmp.path().join("a.jpg");
        write_png(&png, &checkerboard(4, 4), 64);
        write_gif(&gif, &checkerboard(4, 4), 64);
        write_jpeg(&jpg, 8, 8, 64);

        for path in [&png, &gif, &jpg] {
            let bytes = std::fs::read(path).unwrap();
            assert_eq!(bytes.len() - strip_padding(&bytes).len(), 64);
            image::open(path).unwrap();
        }
    }
}
