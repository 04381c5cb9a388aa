//! # datefold
//!
//! Sorts a tree of photos into date folders without ever overwriting a file
//! or losing track of a duplicate.
//!
//! # Architecture: Scan, then Place
//!
//! ```text
//! 1. Scan     input/    →  [PlacementRequest]   (walk + EXIF date → target dir)
//! 2. Place    requests  →  output/              (fingerprint → resolve → commit)
//! ```
//!
//! The scan decides *where a file wants to go*. The placement engine decides
//! *where it actually lands*, and is agnostic to why a file is headed for a
//! given directory. Keeping the two apart means the engine can be exercised
//! with hand-built requests and no EXIF at all.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the input tree and classifies files into placement requests |
//! | [`exif`] | Minimal EXIF date reader for JPEG and TIFF-based files |
//! | [`metadata`] | Capture-date priority and date-directory formatting |
//! | [`organize`] | The placement engine: owns run state, reports per-file outcomes |
//! | [`resolve`] | Decides final directory and name: accept, enumerate, or redirect |
//! | [`commit`] | Creates directories and copies bytes, never overwriting |
//! | [`fingerprint`] | MD5 content fingerprints and the per-run cache |
//! | [`index`] | Which fingerprints have been committed into which directory |
//! | [`naming`] | Enumerated, fingerprint-qualified, and duplicates-directory names |
//! | [`types`] | Requests and placements passed between stages |
//! | [`config`] | `datefold.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Placement Rules
//!
//! For each request, in order:
//!
//! - **Same content already in the target directory** (committed earlier in
//!   this run, or sitting there under the desired name): the file goes into
//!   `<marker>-<hash>/<hash>.<ext>` below the target.
//! - **Desired name taken by something else**: the file is renamed to
//!   `<stem>-<n>.<ext>` with the smallest free `n`.
//! - **Otherwise**: the file keeps its name.
//!
//! Nothing is ever overwritten. Destinations are opened create-new, so even a
//! file that appears between the decision and the copy is stepped around.
//!
//! # Run State
//!
//! The fingerprint cache and the directory index live in an
//! [`organize::Organizer`], not in globals. A fresh organizer (or
//! [`organize::Organizer::reset`]) replays the same requests to the same tree.

pub mod commit;
pub mod config;
pub mod exif;
pub mod fingerprint;
pub mod index;
pub mod metadata;
pub mod naming;
pub mod organize;
pub mod output;
pub mod resolve;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
