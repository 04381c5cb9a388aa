//! Sort configuration module.
//!
//! Handles loading, validating, and merging `datefold.toml`. Stock defaults
//! are the base layer; a user file overrides only the keys it names.
//!
//! ## Config File Location
//!
//! Either pass `--config FILE`, or place `datefold.toml` at the root of the
//! input tree (it is not organized along with the photos):
//!
//! ```text
//! photos/
//! ├── datefold.toml
//! ├── 2019 trip/
//! │   └── IMG_0001.jpg
//! └── phone dump/
//!     └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! path_format = "%Y/%m/%d"            # chrono strftime pattern for dated files
//! no_date_dir = "no date information" # where undated files go
//! duplicates_marker = "duplicates"    # duplicates dirs are <marker>-<hash>
//! follow_symlinks = false             # descend into / copy symlink targets
//!
//! [processing]
//! max_processes = 4         # Max parallel hashing workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::metadata;
use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

/// Config file looked up at the input root.
pub const CONFIG_FILENAME: &str = "datefold.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Sort configuration loaded from `datefold.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SortConfig {
    /// strftime pattern turning a capture date into a relative directory.
    pub path_format: String,
    /// Directory (under the output root) for files without a capture date.
    pub no_date_dir: String,
    /// Prefix of duplicates directories.
    pub duplicates_marker: String,
    /// Follow symlinks during the walk instead of skipping them.
    pub follow_symlinks: bool,
    pub processing: ProcessingConfig,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            path_format: "%Y/%m/%d".to_string(),
            no_date_dir: "no date information".to_string(),
            duplicates_marker: "duplicates".to_string(),
            follow_symlinks: false,
            processing: ProcessingConfig::default(),
        }
    }
}

impl SortConfig {
    /// Validate values that serde alone can't check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path_format.trim().is_empty() {
            return Err(ConfigError::Validation("path_format must not be empty".into()));
        }
        if StrftimeItems::new(&self.path_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Validation(format!(
                "path_format {:?} is not a valid strftime pattern",
                self.path_format
            )));
        }
        if !renders_inside_output(&self.path_format) {
            return Err(ConfigError::Validation(format!(
                "path_format {:?} must render to a relative path of plain directory names",
                self.path_format
            )));
        }
        if !is_relative_dir(&self.no_date_dir) {
            return Err(ConfigError::Validation(
                "no_date_dir must be a non-empty relative path".into(),
            ));
        }
        if self.duplicates_marker.is_empty()
            || self.duplicates_marker.contains(['/', '\\'])
            || self.duplicates_marker == "."
            || self.duplicates_marker == ".."
        {
            return Err(ConfigError::Validation(
                "duplicates_marker must be a plain, non-empty name".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn is_relative_dir(dir: &str) -> bool {
    let path = Path::new(dir);
    !dir.trim().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Render `path_format` for a sample date and require plain components, so
/// no capture date can produce `..`, a root, or a prefix.
fn renders_inside_output(path_format: &str) -> bool {
    let sample = NaiveDate::from_ymd_opt(2021, 7, 14).and_then(|d| d.and_hms_opt(14, 30, 5));
    let Some(rendered) = sample.and_then(|date| metadata::date_directory(&date, path_format)) else {
        return false;
    };
    let mut components = rendered.components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel hashing workers.
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
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SortConfig::default())?)
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

/// Read a config file as a raw TOML value.
pub fn load_raw_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SortConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SortConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `datefold.toml` from `root`, or stock defaults if there is none.
pub fn load_config(root: &Path) -> Result<SortConfig, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    let overlay = if config_path.is_file() {
        Some(load_raw_config_file(&config_path)?)
    } else {
        None
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Load an explicitly named config file. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<SortConfig, ConfigError> {
    let overlay = load_raw_config_file(path)?;
    resolve_config(stock_defaults_value()?, Some(overlay))
}

/// Returns a fully-commented stock `datefold.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# datefold configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Put this file at the root of the input tree as datefold.toml, or pass it
# with --config. Unknown keys will cause an error.

# Directory layout for files with a capture date, as a chrono strftime
# pattern. "%Y/%m/%d" gives 2021/07/14; "%Y/%Y-%m" gives 2021/2021-07.
path_format = "%Y/%m/%d"

# Directory for files without a capture date. The source directory layout
# is mirrored beneath it.
no_date_dir = "no date information"

# A copy whose content is already in its target directory is copied into
# a subdirectory named "<marker>-<content hash>" instead.
duplicates_marker = "duplicates"

# Symlinks are skipped unless this is set.
follow_symlinks = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel hashing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
