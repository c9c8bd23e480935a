//! Worker pool and batch coordinator.
//!
//! [`Optimizer::optimize_all`] turns a list of files into work items, one
//! per file plus one WebP item per file when requested, and spawns them on
//! a private rayon pool sized by [`effective_threads`]. Each item reports
//! on an mpsc channel, so completions arrive in finishing order.
//!
//! ## Failure model
//!
//! | Item outcome | Batch reaction |
//! |---|---|
//! | `Ok(Some(result))` | collected |
//! | `Ok(None)` | dropped silently (nothing smaller found) |
//! | missing tool | cancel everything, fail with [`BatchError::ToolNotFound`] |
//! | any other error | logged at `warn`, item yields nothing |
//!
//! With a batch deadline, each wait on the channel is bounded by the time
//! left. When the deadline passes the shared [`CancelToken`] is tripped:
//! running tools are killed, queued items exit on start, and the call
//! fails with [`BatchError::Timeout`] without returning partial results.

use crate::config::{OptimizerConfig, effective_threads};
use crate::pipeline::{Goal, PipelineError, WorkItem};
use crate::placement::Placement;
use crate::tools::{CancelToken, ProcessRunner, ToolError, ToolRunner, Toolbox, Toolchain};
use crate::types::{ConversionPolicy, OptimizationResult};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    ToolNotFound(ToolError),
    #[error("Batch did not finish within {after:?}; all work was cancelled")]
    Timeout { after: Duration },
    #[error("Not a PNG, GIF or JPEG file: {0}")]
    UnsupportedFile(PathBuf),
    #[error("Could not start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

type Outcome = Result<Option<OptimizationResult>, PipelineError>;

/// Runs batches of work items on a fixed-size pool.
pub struct Optimizer {
    toolchain: Toolchain,
    placement: Placement,
    scratch_root: PathBuf,
    batch_timeout: Option<Duration>,
    pool: rayon::ThreadPool,
}

impl Optimizer {
    /// Optimizer that launches real child processes.
    pub fn new(config: &OptimizerConfig) -> Result<Self, BatchError> {
        Self::with_runner(Arc::new(ProcessRunner::new()), config)
    }

    pub fn with_runner(
        runner: Arc<dyn ToolRunner>,
        config: &OptimizerConfig,
    ) -> Result<Self, BatchError> {
        let threads = effective_threads(&config.processing);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("shrinkray-worker-{i}"))
            .panic_handler(|_| error!("work item panicked"))
            .build()?;
        let work_dir = config.work_dir();
        debug!(threads, work_dir = %work_dir.display(), "optimizer ready");
        Ok(Self {
            toolchain: Toolchain::new(
                runner,
                Toolbox::new(&config.binaries_dir),
                config.timeouts.tool(),
            ),
            placement: Placement::new(work_dir.join("final")),
            scratch_root: work_dir.join("scratch"),
            batch_timeout: config.timeouts.batch(),
            pool,
        })
    }

    /// Where optimized files are placed.
    pub fn results_dir(&self) -> &Path {
        self.placement.root()
    }

    /// Optimize every file, returning one result per strictly smaller output.
    ///
    /// Files are checked up front: anything that is not PNG, GIF or JPEG by
    /// extension fails the call before any work starts.
    pub fn optimize_all(
        &self,
        policy: ConversionPolicy,
        include_webp: bool,
        files: &[PathBuf],
    ) -> Result<Vec<OptimizationResult>, BatchError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let items = plan(policy, include_webp, files)?;
        fs::create_dir_all(&self.scratch_root)?;
        info!(files = files.len(), items = items.len(), %policy, include_webp, "starting batch");

        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel::<(PathBuf, Outcome)>();
        for item in items {
            let tx = tx.clone();
            let cancel = cancel.clone();
            let toolchain = self.toolchain.clone();
            let placement = self.placement.clone();
            let scratch_root = self.scratch_root.clone();
            self.pool.spawn(move || {
                let outcome = run_item(&item, &toolchain, &placement, &scratch_root, &cancel);
                let _ = tx.send((item.source, outcome));
            });
        }
        drop(tx);

        let deadline = self.batch_timeout.map(|after| (after, started + after));
        let mut results = Vec::new();
        loop {
            let (source, outcome) = match deadline {
                Some((after, at)) => {
                    match rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
                        Ok(message) => message,
                        Err(RecvTimeoutError::Timeout) => {
                            cancel.cancel();
                            warn!(?after, "batch deadline passed, cancelling outstanding work");
                            return Err(BatchError::Timeout { after });
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match rx.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };

            match outcome {
                Ok(Some(result)) => {
                    info!(
                        file = %result.original_file.display(),
                        optimized = %result.optimized_file.display(),
                        original_size = result.original_size,
                        optimized_size = result.optimized_size,
                        type_changed = result.file_type_changed,
                        browser_specific = result.is_browser_specific,
                        needs_review = result.failed_automated_test,
                        "optimized"
                    );
                    results.push(result);
                }
                Ok(None) => debug!(file = %source.display(), "no improvement"),
                Err(PipelineError::Tool(e)) if e.is_setup() => {
                    cancel.cancel();
                    error!(file = %source.display(), error = %e, "required tool is unavailable");
                    return Err(BatchError::ToolNotFound(e));
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => warn!(file = %source.display(), error = %e, "item failed"),
            }
        }

        info!(
            elapsed = ?started.elapsed(),
            results = results.len(),
            "batch finished"
        );
        Ok(results)
    }
}

/// Validate and deduplicate inputs, then build the work items.
fn plan(
    policy: ConversionPolicy,
    include_webp: bool,
    files: &[PathBuf],
) -> Result<Vec<WorkItem>, BatchError> {
    let mut unique = BTreeSet::new();
    for file in files {
        unique.insert(std::path::absolute(file)?);
    }

    let goals: &[Goal] = if include_webp {
        &[Goal::Optimize, Goal::WebP]
    } else {
        &[Goal::Optimize]
    };
    let mut items = Vec::with_capacity(unique.len() * goals.len());
    for file in unique {
        for &goal in goals {
            let item = WorkItem::new(file.clone(), policy, goal)
                .ok_or_else(|| BatchError::UnsupportedFile(file.clone()))?;
            items.push(item);
        }
    }
    Ok(items)
}

/// One work item from scratch directory to placed result. The scratch
/// directory is removed when this returns, whatever the outcome.
fn run_item(
    item: &WorkItem,
    toolchain: &Toolchain,
    placement: &Placement,
    scratch_root: &Path,
    cancel: &CancelToken,
) -> Outcome {
    if cancel.is_cancelled() {
        return Ok(None);
    }
    let scratch = tempfile::Builder::new()
        .prefix("item-")
        .tempdir_in(scratch_root)?;
    debug!(file = %item.source.display(), goal = ?item.goal, scratch = %scratch.path().display(), "item started");

    let Some(candidate) = item.execute(toolchain, cancel, scratch.path())? else {
        return Ok(None);
    };
    let Some(placed) =
        placement.place(&item.source, &candidate.file, candidate.file_type_changed)?
    else {
        return Ok(None);
    };
    Ok(Some(OptimizationResult {
        original_file: item.source.clone(),
        original_size: candidate.original_size,
        optimized_file: placed,
        optimized_size: candidate.optimized_size,
        file_type_changed: candidate.file_type_changed,
        is_browser_specific: candidate.is_browser_specific,
        failed_automated_test: candidate.failed_automated_test,
    }))
}
