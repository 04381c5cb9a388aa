//! Input traversal and classification.
//!
//! Walks the input tree and turns every regular file into a
//! [`PlacementRequest`] aimed at its date directory under the output root.
//!
//! ## Classification
//!
//! ```text
//! photos/                              out/
//! ├── trip/                            ├── 2020/05/01/
//! │   ├── IMG_1.jpg  (2020:05:01 …) →  │   └── IMG_1.jpg
//! │   └── notes.txt  (no EXIF)      →  └── no date information/
//! └── datefold.toml  (not organized)       └── trip/
//!                                              └── notes.txt
//! ```
//!
//! - **Dated files** go to `<output>/<capture date in path_format>`.
//! - **Undated files** go to `<output>/<no_date_dir>/<source dir relative to
//!   input>`, so the input layout survives for files we can't place in time.
//!
//! ## Walk rules
//!
//! - Entries are visited sorted by file name, so the request order (and with
//!   it which file wins a name) is the same on every run.
//! - Symlinks are skipped and reported unless `follow_symlinks` is set.
//! - Unreadable entries are reported and skipped; the walk continues.
//! - An output root nested inside the input is pruned, so a second run
//!   never picks up the first run's output.
//! - `datefold.toml` at the input root is configuration, not content.

use crate::config::{CONFIG_FILENAME, SortConfig};
use crate::metadata;
use crate::types::PlacementRequest;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Input directory not found: {0}")]
    MissingInput(PathBuf),
    #[error("Output directory not found: {0}")]
    MissingOutput(PathBuf),
    #[error("Input and output are the same directory: {0}")]
    SameDirectory(PathBuf),
    #[error("path_format {0:?} cannot be rendered")]
    PathFormat(String),
}

/// Why an input entry was not turned into a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    Symlink,
    ConfigFile,
    Unreadable { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub path: PathBuf,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// A file headed for the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub request: PlacementRequest,
    /// `None` for files without a usable EXIF date.
    pub captured: Option<NaiveDateTime>,
}

/// Result of walking the input tree.
#[derive(Debug)]
pub struct Scan {
    /// Canonical input root.
    pub input: PathBuf,
    /// Canonical output root.
    pub output: PathBuf,
    /// Files in walk order.
    pub files: Vec<ScannedFile>,
    pub skipped: Vec<Skipped>,
}

impl Scan {
    pub fn dated_count(&self) -> usize {
        self.files.iter().filter(|f| f.captured.is_some()).count()
    }

    pub fn undated_count(&self) -> usize {
        self.files.len() - self.dated_count()
    }

    /// Placement requests in walk order.
    pub fn into_requests(self) -> Vec<PlacementRequest> {
        self.files.into_iter().map(|f| f.request).collect()
    }
}

/// Both roots must be existing directories. Returns their canonical forms.
pub fn check_roots(input: &Path, output: &Path) -> Result<(PathBuf, PathBuf), ScanError> {
    if !input.is_dir() {
        return Err(ScanError::MissingInput(input.to_path_buf()));
    }
    if !output.is_dir() {
        return Err(ScanError::MissingOutput(output.to_path_buf()));
    }
    let input = input.canonicalize()?;
    let output = output.canonicalize()?;
    if input == output {
        return Err(ScanError::SameDirectory(input));
    }
    Ok((input, output))
}

/// Directory a file captured at `captured` (or undated) should land in.
///
/// `source` must lie under `input`; for undated files its parent directory
/// is mirrored beneath `no_date_dir`.
pub fn target_directory(
    input: &Path,
    output: &Path,
    source: &Path,
    captured: Option<&NaiveDateTime>,
    config: &SortConfig,
) -> Result<PathBuf, ScanError> {
    match captured {
        Some(date) => metadata::date_directory(date, &config.path_format)
            .map(|rel| output.join(rel))
            .ok_or_else(|| ScanError::PathFormat(config.path_format.clone())),
        None => {
            let parent = source.parent().unwrap_or(input);
            let undated = output.join(&config.no_date_dir);
            match parent.strip_prefix(input) {
                Ok(relative) if !relative.as_os_str().is_empty() => Ok(undated.join(relative)),
                _ => Ok(undated),
            }
        }
    }
}

/// Walk `input` and classify every regular file into a request under `output`.
pub fn scan(input: &Path, output: &Path, config: &SortConfig) -> Result<Scan, ScanError> {
    let (input, output) = check_roots(input, output)?;
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    let walker = WalkDir::new(&input)
        .follow_links(config.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let is_output = e.path() == output.as_path();
            if is_output {
                debug!(path = %e.path().display(), "pruning output root from walk");
            }
            !is_output
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map_or_else(|| input.clone(), Path::to_path_buf);
                warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                skipped.push(Skipped {
                    path,
                    reason: SkipReason::Unreadable {
                        message: e.to_string(),
                    },
                });
                continue;
            }
        };

        if entry.path_is_symlink() && !config.follow_symlinks {
            debug!(path = %entry.path().display(), "skipping symlink");
            skipped.push(Skipped {
                path: entry.path().to_path_buf(),
                reason: SkipReason::Symlink,
            });
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.depth() == 1 && entry.file_name() == CONFIG_FILENAME {
            skipped.push(Skipped {
                path: entry.path().to_path_buf(),
                reason: SkipReason::ConfigFile,
            });
            continue;
        }

        let source = entry.into_path();
        let captured = metadata::capture_date(&source);
        let target = target_directory(&input, &output, &source, captured.as_ref(), config)?;
        if let Some(request) = PlacementRequest::keeping_name(source, target) {
            files.push(ScannedFile { request, captured });
        }
    }

    Ok(Scan {
        input,
        output,
        files,
        skipped,
    })
}
