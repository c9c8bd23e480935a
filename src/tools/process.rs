//! Child-process runner used in production.
//!
//! Output capture goes through an anonymous temp file rather than pipes:
//! both stdout and stderr point at the same file, which merges them in
//! write order, and the parent can poll the child without draining pipes.
//!
//! The wait loop wakes every [`POLL_INTERVAL`] to check the per-process
//! timeout and the batch [`CancelToken`]. Either one kills the child and
//! reaps it before returning, so no orphan outlives its work item.

use super::ToolError;
use super::catalog::Tool;
use super::runner::{CancelToken, Invocation, ProcessOutput, Redirect, ToolRunner};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs tools as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ProcessRunner {
    fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancelToken,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, ToolError> {
        let tool = invocation.tool;
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled { tool });
        }

        let mut capture = tempfile::tempfile()?;
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }
        match invocation.redirect {
            Redirect::Capture => {
                command
                    .stdin(Stdio::null())
                    .stdout(Stdio::from(capture.try_clone()?))
                    .stderr(Stdio::from(capture.try_clone()?));
            }
            Redirect::FileToFile => {
                command
                    .stdin(Stdio::from(File::open(&invocation.input)?))
                    .stdout(Stdio::from(File::create(&invocation.output)?))
                    .stderr(Stdio::from(capture.try_clone()?));
            }
        }

        debug!(tool = %tool, program = %invocation.program.display(), args = ?invocation.args, "spawning");
        let mut child = command
            .spawn()
            .map_err(|e| launch_error(tool, &invocation.program, e))?;

        let status = wait(&mut child, tool, cancel, timeout)?;
        let output = read_capture(&mut capture)?;
        debug!(tool = %tool, code = ?status.code(), "exited");
        Ok(ProcessOutput {
            code: status.code(),
            output,
        })
    }
}

fn wait(
    child: &mut Child,
    tool: Tool,
    cancel: &CancelToken,
    timeout: Option<Duration>,
) -> Result<ExitStatus, ToolError> {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                terminate(child);
                return Err(e.into());
            }
        }
        if cancel.is_cancelled() {
            terminate(child);
            return Err(ToolError::Cancelled { tool });
        }
        if let Some(limit) = timeout.filter(|limit| started.elapsed() >= *limit) {
            terminate(child);
            return Err(ToolError::TimedOut { tool, after: limit });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill and reap. Errors are ignored: the child may have exited on its own
/// between the last poll and the kill.
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn launch_error(tool: Tool, program: &Path, err: io::Error) -> ToolError {
    ToolError::NotFound {
        tool,
        hint: Some(tool.install_hint()),
        detail: format!("{}: {err}", program.display()),
    }
}

fn read_capture(capture: &mut File) -> io::Result<String> {
    capture.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    capture.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
}
