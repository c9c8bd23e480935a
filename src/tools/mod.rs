//! External-tool invocation.
//!
//! | Piece | Role |
//! |---|---|
//! | [`catalog`] | Which binaries exist, their argument templates and exit-code rules |
//! | [`runner`] | [`ToolRunner`] trait, [`Invocation`], [`CancelToken`] |
//! | [`process`] | [`ProcessRunner`]: real child processes with timeout and kill |
//!
//! [`Toolchain::run`] ties them together: build the invocation, run it,
//! and turn the raw exit code into an [`ExitKind`] or a [`ToolError`].

pub mod catalog;
pub mod process;
pub mod runner;

pub use catalog::{ExitKind, OutputMode, Tool, Toolbox};
pub use process::ProcessRunner;
pub use runner::{CancelToken, Invocation, ProcessOutput, Redirect, ToolRunner};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Shell convention for "command not found", also used by the dynamic
/// loader when a shared library is missing.
const COMMAND_NOT_FOUND: i32 = 127;

#[derive(Error, Debug)]
pub enum ToolError {
    /// Setup problem: the binary is missing or cannot start.
    #[error("{tool} could not be launched ({detail}). {}", .hint.unwrap_or(""))]
    NotFound {
        tool: Tool,
        hint: Option<&'static str>,
        detail: String,
    },
    #[error("{tool} failed with exit code {}: {output}", describe_code(.code))]
    ExecutionFailed {
        tool: Tool,
        code: Option<i32>,
        output: String,
    },
    #[error("{tool} did not finish within {after:?} and was killed")]
    TimedOut { tool: Tool, after: Duration },
    #[error("{tool} was cancelled")]
    Cancelled { tool: Tool },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// True for errors that mean the environment is broken, not the image.
    pub fn is_setup(&self) -> bool {
        matches!(self, ToolError::NotFound { .. })
    }
}

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (killed by signal)".to_string(), |c| c.to_string())
}

/// Interpret a finished run for `invocation.tool`.
pub fn interpret(invocation: &Invocation, out: ProcessOutput) -> Result<ExitKind, ToolError> {
    let tool = invocation.tool;
    if out.code == Some(COMMAND_NOT_FOUND) {
        return Err(ToolError::NotFound {
            tool,
            hint: Some(tool.install_hint()),
            detail: format!("exit code {COMMAND_NOT_FOUND}: {}", out.output),
        });
    }
    match tool.interpret(out.code) {
        ExitKind::Failed => Err(ToolError::ExecutionFailed {
            tool,
            code: out.code,
            output: out.output,
        }),
        kind => Ok(kind),
    }
}

/// Run one invocation to completion and interpret its exit code.
pub fn invoke(
    runner: &dyn ToolRunner,
    invocation: &Invocation,
    cancel: &CancelToken,
    timeout: Option<Duration>,
) -> Result<ExitKind, ToolError> {
    let out = runner.run(invocation, cancel, timeout)?;
    let kind = interpret(invocation, out)?;
    debug!(tool = %invocation.tool, ?kind, file = %invocation.input.display(), "tool finished");
    Ok(kind)
}

/// Everything a pipeline needs to launch tools: a runner, where the
/// binaries live, and the per-process timeout.
#[derive(Clone)]
pub struct Toolchain {
    runner: Arc<dyn ToolRunner>,
    toolbox: Toolbox,
    timeout: Option<Duration>,
}

impl Toolchain {
    pub fn new(runner: Arc<dyn ToolRunner>, toolbox: Toolbox, timeout: Option<Duration>) -> Self {
        Self {
            runner,
            toolbox,
            timeout,
        }
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    pub fn run(
        &self,
        tool: Tool,
        input: &Path,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<ExitKind, ToolError> {
        let invocation = self.toolbox.invocation(tool, input, output);
        invoke(self.runner.as_ref(), &invocation, cancel, self.timeout)
    }
}
