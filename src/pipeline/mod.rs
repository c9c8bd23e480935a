//! Per-format optimization chains.
//!
//! Every chain is a list of [`Tool`](crate::tools::Tool)s handed to the generic stage driver
//! ([`driver::run_chain`]), which runs one tool at a time and keeps its
//! output only when it is no larger than what came in. The PNG chain is
//! seven stages with a deliberate second pass; JPEG is two; GIF runs
//! `gifsicle` and may then race two speculative PNG conversions; the WebP
//! goal is a single browser-specific conversion.
//!
//! ```text
//! source ──copy──▶ scratch/source.<ext>
//!                     │
//!                     ▼
//!           ┌─────────────────────┐
//!           │  format chain       │   png / jpeg / gif / webp
//!           └─────────────────────┘
//!                     │
//!                     ▼
//!        size < original? ──no──▶ None
//!                     │ yes
//!                     ▼
//!     same type? ──▶ visual-equivalence check
//!                     │
//!                     ▼
//!               Some(Candidate)
//! ```
//!
//! Nothing here touches the source file after the initial copy. The scratch
//! directory belongs to one work item; the caller deletes it afterwards.

mod driver;
mod gif;
mod jpeg;
mod png;
mod webp;

pub use driver::{StageContext, run_chain};
pub use jpeg::JPEG_CHAIN;
pub use png::PNG_CHAIN;

use crate::imaging::{self, ImagingError};
use crate::tools::{CancelToken, ToolError, Toolchain};
use crate::types::{ConversionPolicy, ImageKind};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("Validation failed: {0}")]
    Imaging(#[from] ImagingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} images cannot be optimized")]
    Unsupported(ImageKind),
}

impl PipelineError {
    /// A missing tool. The whole batch must stop.
    pub fn is_setup(&self) -> bool {
        matches!(self, PipelineError::Tool(e) if e.is_setup())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Tool(ToolError::Cancelled { .. }))
    }
}

/// What a work item is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    /// Lossless optimization in the source format (GIF may turn into PNG).
    Optimize,
    /// A browser-specific WebP alternative.
    WebP,
}

/// One unit of pipeline execution: a source file and what to make of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub source: PathBuf,
    pub kind: ImageKind,
    pub policy: ConversionPolicy,
    pub goal: Goal,
}

impl WorkItem {
    /// `None` when the extension is not an optimizable image type.
    pub fn new(source: impl Into<PathBuf>, policy: ConversionPolicy, goal: Goal) -> Option<Self> {
        let source = source.into();
        let kind = ImageKind::from_path(&source).filter(|k| k.is_optimizable())?;
        Some(Self {
            source,
            kind,
            policy,
            goal,
        })
    }

    /// Run the chain for this item inside `scratch_dir`.
    ///
    /// `Ok(None)` means no strictly smaller file was found. Errors are
    /// per-item unless [`PipelineError::is_setup`] says otherwise.
    pub fn execute(
        &self,
        toolchain: &Toolchain,
        cancel: &CancelToken,
        scratch_dir: &Path,
    ) -> Result<Option<Candidate>, PipelineError> {
        let original_size = fs::metadata(&self.source)?.len();
        // Never the source's own name: stage files share this directory.
        let working = scratch_dir.join(format!("source.{}", self.kind.extension()));
        fs::copy(&self.source, &working)?;

        let ctx = StageContext::new(toolchain, cancel, scratch_dir);
        let produced = match (self.goal, self.kind) {
            (Goal::WebP, kind) => match webp::convert(&ctx, &working, kind)? {
                Some(file) => Produced::converted(file, ImageKind::WebP),
                None => return Ok(None),
            },
            (Goal::Optimize, ImageKind::Png) => {
                Produced::same(run_chain(&ctx, &PNG_CHAIN, &working)?, ImageKind::Png)
            }
            (Goal::Optimize, ImageKind::Jpeg) => {
                Produced::same(run_chain(&ctx, JPEG_CHAIN, &working)?, ImageKind::Jpeg)
            }
            (Goal::Optimize, ImageKind::Gif) => gif::optimize(&ctx, &working, self.policy)?,
            (Goal::Optimize, kind @ ImageKind::WebP) => {
                return Err(PipelineError::Unsupported(kind));
            }
        };

        let optimized_size = fs::metadata(&produced.file)?.len();
        if optimized_size >= original_size {
            debug!(
                file = %self.source.display(),
                original_size,
                optimized_size,
                "no improvement"
            );
            return Ok(None);
        }

        let failed_automated_test = if produced.type_changed {
            false
        } else {
            !imaging::visually_equal(&self.source, &produced.file)?
        };

        Ok(Some(Candidate {
            file: produced.file,
            kind: produced.kind,
            original_size,
            optimized_size,
            file_type_changed: produced.type_changed,
            is_browser_specific: self.goal == Goal::WebP,
            failed_automated_test,
        }))
    }
}

/// A strictly smaller file still sitting in the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub file: PathBuf,
    pub kind: ImageKind,
    pub original_size: u64,
    pub optimized_size: u64,
    pub file_type_changed: bool,
    pub is_browser_specific: bool,
    pub failed_automated_test: bool,
}

/// Output of a chain before the final size gate.
#[derive(Debug)]
struct Produced {
    file: PathBuf,
    kind: ImageKind,
    type_changed: bool,
}

impl Produced {
    fn same(file: PathBuf, kind: ImageKind) -> Self {
        Self {
            file,
            kind,
            type_changed: false,
        }
    }

    fn converted(file: PathBuf, kind: ImageKind) -> Self {
        Self {
            file,
            kind,
            type_changed: true,
        }
    }
}
