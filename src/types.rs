//! Shared types passed between the batch coordinator, the pipelines and the CLI.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Image container, decided purely by file extension (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl ImageKind {
    /// Kinds that can be submitted for optimization. WebP is output-only.
    pub const OPTIMIZABLE: [ImageKind; 3] = [ImageKind::Png, ImageKind::Jpeg, ImageKind::Gif];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical extension used when a pipeline writes this kind.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }

    pub fn is_optimizable(self) -> bool {
        Self::OPTIMIZABLE.contains(&self)
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

/// Whether and how lossless format retargeting (GIF → PNG) is attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionPolicy {
    /// Never change the file type.
    None,
    /// Convert whenever the image is not animated.
    #[default]
    All,
    /// Convert only images that render identically in IE6, i.e. without
    /// alpha transparency.
    Ie6Safe,
}

impl ConversionPolicy {
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }
}

impl FromStr for ConversionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "none" => Ok(Self::None),
            "all" => Ok(Self::All),
            "ie6-safe" | "ie6safe" => Ok(Self::Ie6Safe),
            other => Err(format!(
                "unknown conversion policy '{other}' (expected none, all or ie6-safe)"
            )),
        }
    }
}

impl fmt::Display for ConversionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::All => "all",
            Self::Ie6Safe => "ie6-safe",
        })
    }
}

/// Output of a work item that found a strictly smaller file.
///
/// Absence of a result means no improvement was found; it is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizationResult {
    pub original_file: PathBuf,
    pub original_size: u64,
    /// Final location under the results directory.
    pub optimized_file: PathBuf,
    pub optimized_size: u64,
    pub file_type_changed: bool,
    /// Only WebP outputs are browser specific.
    pub is_browser_specific: bool,
    /// The validator could not confirm the output is pixel-identical.
    /// Advisory only: the file still needs a human look.
    pub failed_automated_test: bool,
}

impl OptimizationResult {
    pub fn savings(&self) -> u64 {
        self.original_size.saturating_sub(self.optimized_size)
    }
}
