//! The [`ToolRunner`] seam between pipelines and child processes.
//!
//! Pipelines describe *what* to run as an [`Invocation`]; a runner decides
//! *how*. The production implementation is
//! [`ProcessRunner`](super::process::ProcessRunner). Tests swap in the
//! [`MockRunner`](tests::MockRunner), which simulates the compressors by
//! editing files.

use super::ToolError;
use super::catalog::Tool;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How the child's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    /// stdin closed; stdout and stderr merged into the captured output.
    Capture,
    /// stdin reads `input`, stdout writes `output`, stderr is captured.
    FileToFile,
}

/// A fully resolved command line for one tool run.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub tool: Tool,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    /// File the tool reads. Equal to `output` for in-place tools.
    pub input: PathBuf,
    /// File the tool is expected to write.
    pub output: PathBuf,
    pub redirect: Redirect,
}

impl Invocation {
    pub fn new(tool: Tool, program: impl Into<PathBuf>, input: &Path, output: &Path) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            redirect: Redirect::Capture,
        }
    }
}

/// What a finished process left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Merged stdout/stderr, lossily decoded.
    pub output: String,
}

impl ProcessOutput {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            output: String::new(),
        }
    }
}

/// Shared flag that asks every in-flight and queued work item to stop.
///
/// Cancellation is cooperative: runners check it at every process-wait
/// boundary and kill their child when it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Executes an invocation and reports how the process ended.
///
/// Implementations must fail with [`ToolError::NotFound`] when the program
/// cannot be launched, [`ToolError::TimedOut`] when `timeout` elapses and
/// [`ToolError::Cancelled`] when `cancel` fires. In both of the last two
/// cases the child must already be gone. Exit codes are *not* interpreted
/// here; see [`invoke`](super::invoke).
pub trait ToolRunner: Send + Sync {
    fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancelToken,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, ToolError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::test_helpers::strip_padding;
    use std::sync::Mutex;

    type Behavior =
        dyn Fn(&Invocation, &CancelToken) -> Result<ProcessOutput, ToolError> + Send + Sync;

    /// Runner that records every invocation and delegates to a closure
    /// instead of spawning processes.
    /// Uses Mutex (not RefCell) so it can be shared across pool threads.
    pub struct MockRunner {
        behavior: Box<Behavior>,
        pub runs: Mutex<Vec<Invocation>>,
    }

    impl MockRunner {
        pub fn new(
            behavior: impl Fn(&Invocation, &CancelToken) -> Result<ProcessOutput, ToolError>
            + Send
            + Sync
            + 'static,
        ) -> Self {
            Self {
                behavior: Box::new(behavior),
                runs: Mutex::new(Vec::new()),
            }
        }

        /// Every tool behaves like a well-working compressor: it drops the
        /// padding after the image trailer. `convert` re-encodes to PNG.
        pub fn stripping() -> Self {
            Self::new(|inv, _| {
                simulate(inv)?;
                Ok(ProcessOutput::exited(0))
            })
        }

        /// Tools succeed without writing anything smaller.
        pub fn idle() -> Self {
            Self::new(|inv, _| {
                if inv.input != inv.output {
                    std::fs::copy(&inv.input, &inv.output)?;
                }
                Ok(ProcessOutput::exited(0))
            })
        }

        /// Like [`stripping`](Self::stripping), but `missing` cannot be launched.
        pub fn missing(missing: Tool) -> Self {
            Self::new(move |inv, _| {
                if inv.tool == missing {
                    return Err(ToolError::NotFound {
                        tool: missing,
                        hint: Some(missing.install_hint()),
                        detail: "No such file or directory (os error 2)".into(),
                    });
                }
                simulate(inv)?;
                Ok(ProcessOutput::exited(0))
            })
        }

        /// Every run blocks until cancelled.
        pub fn hanging() -> Self {
            Self::new(|inv, cancel| {
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(ToolError::Cancelled { tool: inv.tool })
            })
        }

        pub fn tools_run(&self) -> Vec<Tool> {
            self.runs.lock().unwrap().iter().map(|i| i.tool).collect()
        }
    }

    impl ToolRunner for MockRunner {
        fn run(
            &self,
            invocation: &Invocation,
            cancel: &CancelToken,
            _timeout: Option<Duration>,
        ) -> Result<ProcessOutput, ToolError> {
            self.runs.lock().unwrap().push(invocation.clone());
            (self.behavior)(invocation, cancel)
        }
    }

    /// Emulate a compressor: strip trailing padding, or re-encode for `convert`.
    pub fn simulate(inv: &Invocation) -> std::io::Result<()> {
        if inv.tool == Tool::Convert {
            let img = image::open(&inv.input)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            return img
                .save_with_format(&inv.output, image::ImageFormat::Png)
                .map_err(|e| std::io::Error::other(e.to_string()));
        }
        let bytes = std::fs::read(&inv.input)?;
        std::fs::write(&inv.output, strip_padding(&bytes))
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn mock_records_invocations() {
        let tmp = tempfile::TempDir::new().unwrap();
        let input = tmp.path().join("a.png");
        std::fs::write(&input, b"data").unwrap();
        let output = tmp.path().join("b.png");

        let runner = MockRunner::idle();
        let inv = Invocation::new(Tool::Gifsicle, "gifsicle", &input, &output);
        let out = runner.run(&inv, &CancelToken::new(), None).unwrap();

        assert_eq!(out.code, Some(0));
        assert_eq!(runner.tools_run(), vec![Tool::Gifsicle]);
        assert!(output.exists());
    }

    #[test]
    fn missing_mock_reports_not_found_for_that_tool_only() {
        let runner = MockRunner::missing(Tool::Pngout);
        let inv = Invocation::new(Tool::Pngout, "pngout", Path::new("/x"), Path::new("/x"));
        let err = runner.run(&inv, &CancelToken::new(), None).unwrap_err();
        assert!(err.is_setup());
    }
}
