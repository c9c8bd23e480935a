//! The generic "run stage, keep if smaller" driver.
//!
//! A stage is a [`Tool`]. In-place tools get a private copy of the current
//! file; separate-output tools write a fresh candidate. The candidate
//! replaces the current file when it exists, is non-empty, and is no larger.
//!
//! | Stage outcome | Driver reaction |
//! |---|---|
//! | success / no improvement | size gate, keep or discard candidate |
//! | `NotFound` | abort the item (setup error) |
//! | `Cancelled` | abort the item |
//! | failed / timed out | log, skip stage, keep prior output |

use super::PipelineError;
use crate::tools::{CancelToken, ExitKind, OutputMode, Tool, ToolError, Toolchain};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Per-item state shared by every stage: the tools, the batch cancel token
/// and the scratch directory candidates are written into.
pub struct StageContext<'a> {
    pub toolchain: &'a Toolchain,
    pub cancel: &'a CancelToken,
    scratch_dir: &'a Path,
    counter: Cell<u32>,
}

impl<'a> StageContext<'a> {
    pub fn new(toolchain: &'a Toolchain, cancel: &'a CancelToken, scratch_dir: &'a Path) -> Self {
        Self {
            toolchain,
            cancel,
            scratch_dir,
            counter: Cell::new(0),
        }
    }

    /// A path in the scratch directory no other stage of this item uses.
    pub fn next_path(&self, extension: &str) -> PathBuf {
        let n = self.counter.get() + 1;
        self.counter.set(n);
        self.scratch_dir.join(format!("stage{n:02}.{extension}"))
    }

    pub fn check_cancelled(&self, tool: Tool) -> Result<(), ToolError> {
        if self.cancel.is_cancelled() {
            return Err(ToolError::Cancelled { tool });
        }
        Ok(())
    }
}

/// Run `stages` in order starting from `input`, returning the smallest
/// file seen. `input` itself is never modified.
pub fn run_chain(
    ctx: &StageContext<'_>,
    stages: &[Tool],
    input: &Path,
) -> Result<PathBuf, PipelineError> {
    let mut current = input.to_path_buf();
    for &tool in stages {
        ctx.check_cancelled(tool)?;
        if let Some(kept) = run_stage(ctx, tool, &current)? {
            current = kept;
        }
    }
    Ok(current)
}

fn run_stage(
    ctx: &StageContext<'_>,
    tool: Tool,
    current: &Path,
) -> Result<Option<PathBuf>, PipelineError> {
    let extension = current
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("img");
    let candidate = ctx.next_path(extension);
    let source = match tool.output_mode() {
        OutputMode::InPlace => {
            fs::copy(current, &candidate)?;
            candidate.as_path()
        }
        OutputMode::Separate => current,
    };

    match ctx.toolchain.run(tool, source, &candidate, ctx.cancel) {
        Ok(kind) => keep_if_smaller(tool, kind, current, candidate),
        Err(e @ (ToolError::NotFound { .. } | ToolError::Cancelled { .. })) => Err(e.into()),
        Err(e) => {
            warn!(stage = %tool, file = %current.display(), error = %e, "stage failed, keeping previous output");
            Ok(None)
        }
    }
}

fn keep_if_smaller(
    tool: Tool,
    kind: ExitKind,
    current: &Path,
    candidate: PathBuf,
) -> Result<Option<PathBuf>, PipelineError> {
    let produced = match fs::metadata(&candidate) {
        Ok(meta) if meta.len() > 0 => meta.len(),
        _ => {
            if kind == ExitKind::Success {
                warn!(stage = %tool, file = %current.display(), "stage reported success but wrote no output");
            }
            return Ok(None);
        }
    };
    let before = fs::metadata(current)?.len();
    if produced <= before {
        debug!(stage = %tool, before, after = produced, "stage kept");
        Ok(Some(candidate))
    } else {
        debug!(stage = %tool, before, after = produced, "stage discarded");
        Ok(None)
    }
}
