//! In-process pixel work: everything that reads images rather than shelling out.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Visual equivalence** | [`visually_equal`]: decode both to RGBA8, compare pixel by pixel |
//! | **Alpha probe** | [`has_alpha_transparency`]: any pixel with alpha below 255 |
//! | **Animation probe** | [`is_animated_gif`]: `GifDecoder` frame count |
//! | **PNG re-encode** | [`reencode_png`]: `image::open` + PNG encoder |
//!
//! Decoding uses the `image` crate with only the GIF, JPEG and PNG decoders
//! compiled in.

mod compare;
mod inspect;

pub use compare::{pixels_equal, visually_equal};
pub use inspect::{has_alpha_transparency, is_animated_gif, reencode_png};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
