//! Browser-specific WebP alternative: `cwebp -lossless` for PNG and JPEG,
//! `gif2webp` for still GIFs. Animated GIFs are left alone.

use super::PipelineError;
use super::driver::StageContext;
use crate::imaging;
use crate::tools::{ExitKind, Tool};
use crate::types::ImageKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub(super) fn convert(
    ctx: &StageContext<'_>,
    working: &Path,
    kind: ImageKind,
) -> Result<Option<PathBuf>, PipelineError> {
    let tool = match kind {
        ImageKind::Png | ImageKind::Jpeg => Tool::Cwebp,
        ImageKind::Gif => Tool::Gif2webp,
        ImageKind::WebP => return Err(PipelineError::Unsupported(kind)),
    };

    if kind == ImageKind::Gif {
        match imaging::is_animated_gif(working) {
            Ok(false) => {}
            Ok(true) => {
                debug!(file = %working.display(), "animated GIF, no WebP");
                return Ok(None);
            }
            Err(e) => {
                warn!(file = %working.display(), error = %e, "could not inspect GIF, no WebP");
                return Ok(None);
            }
        }
    }

    ctx.check_cancelled(tool)?;
    let target = ctx.next_path(ImageKind::WebP.extension());
    match ctx.toolchain.run(tool, working, &target, ctx.cancel)? {
        ExitKind::Success if target.exists() => Ok(Some(target)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use crate::tools::runner::tests::MockRunner;
    use crate::tools::{CancelToken, ProcessOutput, Toolbox, Toolchain};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fake_webp() -> MockRunner {
        MockRunner::new(|inv, _| {
            std::fs::write(&inv.output, b"RIFF....WEBP")?;
            Ok(ProcessOutput::exited(0))
        })
    }

    fn run(runner: &Arc<MockRunner>, file: &Path, kind: ImageKind) -> Option<PathBuf> {
        let tmp = TempDir::new().unwrap();
        let toolchain = Toolchain::new(runner.clone(), Toolbox::new("bin"), None);
        let cancel = CancelToken::new();
        let ctx = StageContext::new(&toolchain, &cancel, tmp.path());
        convert(&ctx, file, kind)
            .unwrap()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_path_buf())
    }

    #[test]
    fn png_and_jpeg_use_cwebp() {
        let tmp = TempDir::new().unwrap();
        let png = tmp.path().join("a.png");
        write_png(&png, &checkerboard(4, 4), 0);
        let runner = Arc::new(fake_webp());

        let out = run(&runner, &png, ImageKind::Png).unwrap();
        assert_eq!(out.extension().unwrap(), "webp");
        run(&runner, &png, ImageKind::Jpeg).unwrap();
        assert_eq!(runner.tools_run(), vec![Tool::Cwebp, Tool::Cwebp]);
    }

    #[test]
    fn still_gif_uses_gif2webp() {
        let tmp = TempDir::new().unwrap();
        let gif = tmp.path().join("a.gif");
        write_gif(&gif, &checkerboard(4, 4), 0);
        let runner = Arc::new(fake_webp());
        assert!(run(&runner, &gif, ImageKind::Gif).is_some());
        assert_eq!(runner.tools_run(), vec![Tool::Gif2webp]);
    }

    #[test]
    fn animated_gif_gets_no_webp() {
        let tmp = TempDir::new().unwrap();
        let gif = tmp.path().join("a.gif");
        write_animated_gif(&gif, 3);
        let runner = Arc::new(fake_webp());
        assert!(run(&runner, &gif, ImageKind::Gif).is_none());
        assert!(runner.tools_run().is_empty());
    }

    #[test]
    fn tool_without_output_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        let png = tmp.path().join("a.png");
        write_png(&png, &checkerboard(4, 4), 0);
        let runner = Arc::new(MockRunner::new(|_, _| Ok(ProcessOutput::exited(0))));
        assert!(run(&runner, &png, ImageKind::Png).is_none());
    }
}
