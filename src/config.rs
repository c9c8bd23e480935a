//! Optimizer configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! form the base layer; a user file overrides just the keys it names, and
//! command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! binaries_dir = "./lib/binary/linux"   # where advpng, optipng, ... live
//! # work_dir = "/tmp/shrinkray"         # scratch/ and final/ (default: system temp)
//!
//! [timeouts]
//! tool_seconds = 60     # per external process, 0 = unbounded
//! batch_seconds = 0     # whole batch, 0 = unbounded
//!
//! [conversion]
//! policy = "all"        # none | all | ie6-safe
//! webp = false          # also produce a WebP alternative
//!
//! [processing]
//! max_processes = 4     # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::ConversionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Directory holding the optimizer binaries.
    pub binaries_dir: PathBuf,
    /// Root for per-item scratch directories and the `final/` results tree.
    /// When absent, `<system temp>/shrinkray` is used.
    pub work_dir: Option<PathBuf>,
    pub timeouts: TimeoutsConfig,
    pub conversion: ConversionConfig,
    pub processing: ProcessingConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            binaries_dir: default_binaries_dir(),
            work_dir: None,
            timeouts: TimeoutsConfig::default(),
            conversion: ConversionConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

/// Platform-specific folder of the bundled binaries.
fn default_binaries_dir() -> PathBuf {
    let platform = if cfg!(windows) {
        "windows"
    } else if cfg!(target_os = "macos") {
        "darwin"
    } else {
        "linux"
    };
    Path::new("./lib/binary").join(platform)
}

impl OptimizerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if self.binaries_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "binaries_dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("shrinkray"))
    }
}

/// The two independent timeout layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutsConfig {
    /// Per external process. The child is killed when it runs longer.
    pub tool_seconds: u64,
    /// Whole `optimize_all` call. A breach cancels every item.
    pub batch_seconds: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            tool_seconds: 60,
            batch_seconds: 0,
        }
    }
}

impl TimeoutsConfig {
    pub fn tool(&self) -> Option<Duration> {
        seconds(self.tool_seconds)
    }

    pub fn batch(&self) -> Option<Duration> {
        seconds(self.batch_seconds)
    }
}

/// Zero means unbounded.
pub fn seconds(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    pub policy: ConversionPolicy,
    pub webp: bool,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel work items.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.min(cores))
        .unwrap_or(cores)
        .max(1)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(OptimizerConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<OptimizerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: OptimizerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from an explicit file, or stock defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<OptimizerConfig, ConfigError> {
    let overlay = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# shrinkray configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
# Command-line flags override anything set here.

# Directory holding advpng, pngout, optipng, pngquant, gifsicle, jpegtran,
# jfifremove, cwebp and gif2webp. ImageMagick `convert` is taken from PATH.
binaries_dir = "./lib/binary/linux"

# Scratch space and results. Optimized files are written to <work_dir>/final,
# mirroring the absolute path of each original.
# Omit to use <system temp>/shrinkray.
# work_dir = "/tmp/shrinkray"

# ---------------------------------------------------------------------------
# Timeouts (seconds, 0 = unbounded)
# ---------------------------------------------------------------------------
[timeouts]
# A single compressor process is killed after this long.
tool_seconds = 60

# The whole run is aborted, with no results, after this long.
batch_seconds = 0

# ---------------------------------------------------------------------------
# Format conversion
# ---------------------------------------------------------------------------
[conversion]
# none     - never change the file type
# all      - convert still GIFs to PNG when smaller
# ie6-safe - like all, but skip images with alpha transparency
policy = "all"

# Also produce a lossless WebP alternative next to each result.
webp = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel work items.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
