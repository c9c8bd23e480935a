//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Optimize
//!
//! ```text
//! 001 logo.png
//!     Source: /home/ann/site/img/logo.png
//!     Result: /tmp/shrinkray/final/home/ann/site/img/logo.png
//!     Size: 18211 → 14020 bytes
//!     Saved: 4191 bytes (23.0%)
//! 002 spinner.gif → spinner.png
//!     Source: /home/ann/site/img/spinner.gif
//!     Result: /tmp/shrinkray/final/home/ann/site/img/spinner.png
//!     Type changed
//!     Size: 9000 → 7000 bytes
//!     Saved: 2000 bytes (22.2%)
//!
//! Optimized 2 images, saved 6191 bytes
//! ```
//!
//! With `--json` the same results are printed as a pretty JSON array of
//! result records instead.
//!
//! ## Check
//!
//! ```text
//! 001 logo.png
//!     Source: /home/ann/site/img/logo.png
//!
//! Found 1 image
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. Results arrive in
//! completion order and are sorted here so output is stable.

use crate::types::OptimizationResult;
use std::path::{Path, PathBuf};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Header line: `name`, or `name → new-name` when the result has a
/// different file name.
fn result_header(index: usize, result: &OptimizationResult) -> String {
    let original = file_name(&result.original_file);
    let optimized = file_name(&result.optimized_file);
    if original == optimized {
        format!("{} {}", format_index(index), original)
    } else {
        format!("{} {} → {}", format_index(index), original, optimized)
    }
}

fn percent(saved: u64, of: u64) -> f64 {
    if of == 0 {
        0.0
    } else {
        saved as f64 * 100.0 / of as f64
    }
}

// ============================================================================
// optimize
// ============================================================================

fn sorted(results: &[OptimizationResult]) -> Vec<&OptimizationResult> {
    let mut sorted: Vec<&OptimizationResult> = results.iter().collect();
    sorted.sort_by(|a, b| {
        (&a.original_file, &a.optimized_file).cmp(&(&b.original_file, &b.optimized_file))
    });
    sorted
}

pub fn format_results(results: &[OptimizationResult]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, result) in sorted(results).iter().enumerate() {
        lines.push(result_header(i + 1, result));
        lines.push(format!("{}Source: {}", indent(1), result.original_file.display()));
        lines.push(format!("{}Result: {}", indent(1), result.optimized_file.display()));
        if result.file_type_changed {
            lines.push(format!("{}Type changed", indent(1)));
        }
        if result.is_browser_specific {
            lines.push(format!("{}Browser specific (WebP)", indent(1)));
        }
        if result.failed_automated_test {
            lines.push(format!(
                "{}Needs review: not confirmed pixel-identical",
                indent(1)
            ));
        }
        lines.push(format!(
            "{}Size: {} → {} bytes",
            indent(1),
            result.original_size,
            result.optimized_size
        ));
        lines.push(format!(
            "{}Saved: {} bytes ({:.1}%)",
            indent(1),
            result.savings(),
            percent(result.savings(), result.original_size)
        ));
    }

    let saved: u64 = results.iter().map(OptimizationResult::savings).sum();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Optimized {}, saved {} bytes",
        plural(results.len(), "image"),
        saved
    ));
    lines
}

pub fn print_results(results: &[OptimizationResult], results_dir: &Path) {
    for line in format_results(results) {
        println!("{}", line);
    }
    if !results.is_empty() {
        println!("Results in {}", results_dir.display());
    }
}

pub fn format_results_json(results: &[OptimizationResult]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&sorted(results))
}

pub fn print_results_json(results: &[OptimizationResult]) -> serde_json::Result<()> {
    println!("{}", format_results_json(results)?);
    Ok(())
}

// ============================================================================
// check
// ============================================================================

pub fn format_discovered(files: &[PathBuf]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, file) in files.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), file_name(file)));
        lines.push(format!("{}Source: {}", indent(1), file.display()));
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!("Found {}", plural(files.len(), "image")));
    lines
}

pub fn print_discovered(files: &[PathBuf]) {
    for line in format_discovered(files) {
        println!("{}", line);
    }
}
