//! Values passed between the traversal, resolver, committer, and reporting.

use crate::fingerprint::ContentFingerprint;
use serde::Serialize;
use std::ffi::OsString;
use std::path::PathBuf;

/// An instruction to copy one source file into one directory under one name.
///
/// The target directory need not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRequest {
    pub source_path: PathBuf,
    pub target_directory: PathBuf,
    pub desired_filename: OsString,
}

impl PlacementRequest {
    pub fn new(
        source_path: impl Into<PathBuf>,
        target_directory: impl Into<PathBuf>,
        desired_filename: impl Into<OsString>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            target_directory: target_directory.into(),
            desired_filename: desired_filename.into(),
        }
    }

    /// Request that keeps the source's own filename.
    ///
    /// Returns `None` for paths without a final component (`/`, `..`).
    pub fn keeping_name(source_path: impl Into<PathBuf>, target_directory: impl Into<PathBuf>) -> Option<Self> {
        let source_path = source_path.into();
        let desired_filename = source_path.file_name()?.to_os_string();
        Some(Self {
            source_path,
            target_directory: target_directory.into(),
            desired_filename,
        })
    }
}

/// Where a file finally lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlacement {
    pub directory: PathBuf,
    pub filename: OsString,
}

impl ResolvedPlacement {
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// How the resolver arrived at the final name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Accepted at the requested directory and name.
    Placed,
    /// A different file held the name; an enumerated name was used instead.
    Renamed,
    /// Identical content was already in the target directory; the copy went
    /// to that directory's duplicates subdirectory.
    Duplicate,
}

/// A completed placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub fingerprint: ContentFingerprint,
    pub disposition: Disposition,
}
