//! GIF chain with speculative PNG conversion.
//!
//! `gifsicle` runs first and its output is what the conversion policy
//! inspects. When the policy allows it, two PNG branches follow: one
//! starting from the `gifsicle` output (A) and one from the untouched
//! working copy (B). Each branch converts to PNG and runs the full PNG
//! chain. The smaller branch wins, B on a tie, and the
//! winner replaces the GIF only if it is strictly smaller.

use super::driver::{StageContext, run_chain};
use super::png::PNG_CHAIN;
use super::{PipelineError, Produced};
use crate::imaging::{self, ImagingError};
use crate::policy::should_convert;
use crate::tools::{ExitKind, Tool, ToolError};
use crate::types::{ConversionPolicy, ImageKind};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub(super) fn optimize(
    ctx: &StageContext<'_>,
    working: &Path,
    policy: ConversionPolicy,
) -> Result<Produced, PipelineError> {
    let optimized = run_chain(ctx, &[Tool::Gifsicle], working)?;
    if !wants_conversion(policy, &optimized) {
        return Ok(Produced::same(optimized, ImageKind::Gif));
    }

    let branch_a = png_branch(ctx, &optimized)?;
    let branch_b = png_branch(ctx, working)?;
    let Some(winner) = smaller_of(branch_a, branch_b)? else {
        return Ok(Produced::same(optimized, ImageKind::Gif));
    };

    let png_size = fs::metadata(&winner)?.len();
    let gif_size = fs::metadata(&optimized)?.len();
    if png_size < gif_size {
        debug!(gif_size, png_size, "PNG conversion wins");
        Ok(Produced::converted(winner, ImageKind::Png))
    } else {
        Ok(Produced::same(optimized, ImageKind::Gif))
    }
}

/// Policy check with lazily computed probes. A GIF that cannot be probed
/// is left as a GIF.
fn wants_conversion(policy: ConversionPolicy, gif: &Path) -> bool {
    if !policy.is_enabled() {
        return false;
    }
    let probe = || -> Result<(bool, bool), ImagingError> {
        let animated = imaging::is_animated_gif(gif)?;
        let alpha = policy == ConversionPolicy::Ie6Safe
            && !animated
            && imaging::has_alpha_transparency(gif)?;
        Ok((animated, alpha))
    };
    match probe() {
        Ok((animated, alpha)) => should_convert(policy, animated, alpha),
        Err(e) => {
            warn!(file = %gif.display(), error = %e, "could not inspect GIF, skipping conversion");
            false
        }
    }
}

fn png_branch(ctx: &StageContext<'_>, gif: &Path) -> Result<Option<PathBuf>, PipelineError> {
    let png = ctx.next_path(ImageKind::Png.extension());
    if !convert_to_png(ctx, gif, &png)? {
        return Ok(None);
    }
    Ok(Some(run_chain(ctx, &PNG_CHAIN, &png)?))
}

/// Write `source` to `target` as PNG. Tries the in-process encoder first
/// and falls back to ImageMagick `convert` when decoding fails. Returns
/// `false` when neither produced a file.
fn convert_to_png(
    ctx: &StageContext<'_>,
    source: &Path,
    target: &Path,
) -> Result<bool, PipelineError> {
    match imaging::reencode_png(source, target) {
        Ok(()) => return Ok(true),
        Err(e) => debug!(file = %source.display(), error = %e, "in-process re-encode failed, trying convert"),
    }

    ctx.check_cancelled(Tool::Convert)?;
    match ctx.toolchain.run(Tool::Convert, source, target, ctx.cancel) {
        Ok(ExitKind::Success) if target.exists() => Ok(true),
        Ok(_) => Ok(false),
        Err(e @ (ToolError::NotFound { .. } | ToolError::Cancelled { .. })) => Err(e.into()),
        Err(e) => {
            warn!(file = %source.display(), error = %e, "PNG conversion failed");
            Ok(false)
        }
    }
}

fn smaller_of(a: Option<PathBuf>, b: Option<PathBuf>) -> Result<Option<PathBuf>, PipelineError> {
    Ok(match (a, b) {
        (Some(a), Some(b)) => {
            if fs::metadata(&a)?.len() < fs::metadata(&b)?.len() {
                Some(a)
            } else {
                Some(b)
            }
        }
        (a, b) => a.or(b),
    })
}
