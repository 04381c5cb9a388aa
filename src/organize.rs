//! The placement engine: fingerprint, resolve, commit, report.
//!
//! [`Organizer`] owns the two pieces of run-wide state, the
//! [`FingerprintCache`] and the [`DirectoryIndex`], and threads them through
//! [`resolve`] and [`commit`]. Nothing is global: a fresh `Organizer` (or
//! [`Organizer::reset`]) gives an isolated, repeatable run.
//!
//! ## Ordering
//!
//! Requests are placed one at a time in the order given. That order decides
//! who wins a slot: the first file keeps its name, later identical content is
//! redirected to a duplicates directory and later different content is
//! renamed. Only fingerprinting may run ahead in parallel
//! ([`Organizer::prefetch`]); the check-copy-record sequence for a directory
//! is never interleaved with another.
//!
//! ## Failures
//!
//! Every failure is local to one request. [`Organizer::run`] reports it,
//! leaves the index as it was, and moves on to the next request.

use crate::commit::commit;
use crate::config::SortConfig;
use crate::fingerprint::FingerprintCache;
use crate::index::DirectoryIndex;
use crate::output::plural;
use crate::resolve::resolve;
use crate::types::{Disposition, Placement, PlacementRequest};
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

/// How many times a placement is re-resolved when its chosen name is taken
/// between resolution and copy.
pub const MAX_COMMIT_ATTEMPTS: usize = 3;

#[derive(Error, Debug)]
pub enum PlaceError {
    #[error("cannot read source {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write {destination}: {error}")]
    DestinationWriteFailure {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("destination already occupied: {destination}")]
    Occupied { destination: PathBuf },
    #[error("placement of {path} did not settle within {depth} directory levels")]
    RecursionExhausted { path: PathBuf, depth: usize },
}

/// The two failure classes surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SourceUnreadable,
    DestinationWriteFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnreadable => write!(f, "source unreadable"),
            Self::DestinationWriteFailure => write!(f, "write failed"),
        }
    }
}

impl PlaceError {
    pub fn unreadable(path: &Path, source: io::Error) -> Self {
        Self::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn write_failed(source: &Path, destination: &Path, error: io::Error) -> Self {
        Self::DestinationWriteFailure {
            source_path: source.to_path_buf(),
            destination: destination.to_path_buf(),
            error,
        }
    }

    /// Reportable class. A placement that never settled is a write failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::SourceUnreadable { .. } => FailureKind::SourceUnreadable,
            Self::DestinationWriteFailure { .. }
            | Self::Occupied { .. }
            | Self::RecursionExhausted { .. } => FailureKind::DestinationWriteFailure,
        }
    }

    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::DestinationWriteFailure { destination, .. } | Self::Occupied { destination } => {
                Some(destination)
            }
            Self::SourceUnreadable { .. } | Self::RecursionExhausted { .. } => None,
        }
    }
}

/// Progress events emitted while a run is in flight.
#[derive(Debug)]
pub enum OrganizeEvent {
    Placed(Placement),
    Failed { source: PathBuf, error: PlaceError },
}

/// One failed request, as kept in the [`RunReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a whole run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    pub placed: usize,
    pub renamed: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub placements: Vec<Placement>,
    pub failures: Vec<FailureRecord>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.placed + self.renamed + self.duplicates + self.failed
    }

    fn record_placement(&mut self, placement: &Placement) {
        match placement.disposition {
            Disposition::Placed => self.placed += 1,
            Disposition::Renamed => self.renamed += 1,
            Disposition::Duplicate => self.duplicates += 1,
        }
        self.placements.push(placement.clone());
    }

    fn record_failure(&mut self, request: &PlacementRequest, error: &PlaceError) {
        self.failed += 1;
        self.failures.push(FailureRecord {
            source: request.source_path.clone(),
            destination: error.destination().map(Path::to_path_buf),
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} copied, {} renamed, {}",
            self.placed,
            self.renamed,
            plural(self.duplicates, "duplicate", "duplicates")
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, " ({} total)", self.total())
    }
}

/// Duplicate-aware placement engine for one run.
#[derive(Debug)]
pub struct Organizer {
    marker: String,
    cache: FingerprintCache,
    index: DirectoryIndex,
}

impl Organizer {
    /// Engine whose duplicates directories are named `<marker>-<hex>`.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            cache: FingerprintCache::new(),
            index: DirectoryIndex::new(),
        }
    }

    pub fn from_config(config: &SortConfig) -> Self {
        Self::new(config.duplicates_marker.clone())
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn fingerprints(&self) -> &FingerprintCache {
        &self.cache
    }

    pub fn index(&self) -> &DirectoryIndex {
        &self.index
    }

    /// Fingerprint all request sources in parallel ahead of placement.
    pub fn prefetch(&mut self, requests: &[PlacementRequest]) -> usize {
        self.cache
            .prefetch(requests.iter().map(|r| r.source_path.as_path()))
    }

    /// Place a single request: fingerprint, resolve, copy, record.
    pub fn place(&mut self, request: &PlacementRequest) -> Result<Placement, PlaceError> {
        let fingerprint = self
            .cache
            .fingerprint(&request.source_path)
            .map_err(|e| PlaceError::unreadable(&request.source_path, e))?;

        let mut attempt = 1;
        loop {
            let resolution = resolve(request, fingerprint, &self.index, &mut self.cache, &self.marker)?;
            match commit(&resolution.placement, &request.source_path, fingerprint, &mut self.index) {
                Ok(destination) => {
                    return Ok(Placement {
                        source: request.source_path.clone(),
                        destination,
                        fingerprint,
                        disposition: resolution.disposition,
                    });
                }
                Err(PlaceError::Occupied { destination }) if attempt < MAX_COMMIT_ATTEMPTS => {
                    debug!(
                        destination = %destination.display(),
                        attempt,
                        "destination taken after resolution, resolving again"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Place every request in order, reporting progress on `events`.
    ///
    /// Never stops early: a failed request is recorded and skipped.
    pub fn run<I>(&mut self, requests: I, events: Option<Sender<OrganizeEvent>>) -> RunReport
    where
        I: IntoIterator<Item = PlacementRequest>,
    {
        let mut report = RunReport::default();
        for request in requests {
            match self.place(&request) {
                Ok(placement) => {
                    report.record_placement(&placement);
                    if let Some(tx) = &events {
                        let _ = tx.send(OrganizeEvent::Placed(placement));
                    }
                }
                Err(error) => {
                    warn!(
                        source = %request.source_path.display(),
                        kind = %error.kind(),
                        %error,
                        "placement failed"
                    );
                    report.record_failure(&request, &error);
                    if let Some(tx) = &events {
                        let _ = tx.send(OrganizeEvent::Failed {
                            source: request.source_path.clone(),
                            error,
                        });
                    }
                }
            }
        }
        report
    }

    /// Forget all fingerprints and directory contents.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.index.clear();
    }
}
