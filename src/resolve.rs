//! Placement resolution: deciding the final directory and name for a file.
//!
//! Given a request and the source's fingerprint, the resolver looks at the
//! [`DirectoryIndex`] and at what already sits on disk, and picks one of:
//!
//! | Situation in the target directory | Outcome |
//! |---|---|
//! | Same content already committed this run | redirect into `<marker>-<hex>/` as `<hex>.<ext>` |
//! | Same content already on disk under the desired name | redirect, as above |
//! | Desired name held by something else | enumerate: `<stem>-<n>.<ext>` |
//! | Nothing relevant | accept as requested |
//!
//! A redirect moves the request one level down into a duplicates directory,
//! which is never redirected again, so a single request visits at most
//! [`MAX_RESOLVE_DEPTH`] directory levels. Only a redirect made here, or a
//! target that is exactly this content's `<marker>-<hex>` directory, counts
//! as being in a duplicates directory. A folder that merely shares the
//! marker prefix is an ordinary target. The recursion is written as a
//! bounded loop; running past the bound is reported as
//! [`PlaceError::RecursionExhausted`] rather than silently dropping the file.
//!
//! Directory existence is not checked here: a target that doesn't exist yet
//! simply has no occupants, and creating it is the committer's job.

use crate::fingerprint::{ContentFingerprint, FingerprintCache};
use crate::index::{DirectoryIndex, normalize_dir};
use crate::naming;
use crate::organize::PlaceError;
use crate::types::{Disposition, PlacementRequest, ResolvedPlacement};
use std::path::Path;
use tracing::debug;

/// Directory levels a single request may visit: the target itself, plus
/// one duplicates directory below it.
pub const MAX_RESOLVE_DEPTH: usize = 2;

/// Outcome of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub placement: ResolvedPlacement,
    pub disposition: Disposition,
    /// Directory levels visited, 1 or 2.
    pub depth: usize,
}

/// What currently sits at a candidate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occupant {
    Vacant,
    SameContent,
    Other,
}

fn occupant_at(path: &Path, fingerprint: &ContentFingerprint, cache: &mut FingerprintCache) -> Occupant {
    let Ok(meta) = path.symlink_metadata() else {
        return Occupant::Vacant;
    };
    if !meta.is_file() {
        return Occupant::Other;
    }
    match cache.fingerprint(path) {
        Ok(existing) if existing == *fingerprint => Occupant::SameContent,
        Ok(_) => Occupant::Other,
        Err(e) => {
            // Can't compare, so treat it as foreign content and step around it.
            debug!(path = %path.display(), error = %e, "existing entry unreadable");
            Occupant::Other
        }
    }
}

/// Decide where `request` lands.
///
/// `fingerprint` is the source's content fingerprint. `cache` is consulted
/// when an existing destination file has to be compared against it.
pub fn resolve(
    request: &PlacementRequest,
    fingerprint: ContentFingerprint,
    index: &DirectoryIndex,
    cache: &mut FingerprintCache,
    marker: &str,
) -> Result<Resolution, PlaceError> {
    let mut directory = normalize_dir(&request.target_directory);
    let mut filename = request.desired_filename.clone();
    let mut disposition = Disposition::Placed;
    let mut in_duplicates = naming::is_duplicates_dir(&directory, marker, &fingerprint);

    for depth in 1..=MAX_RESOLVE_DEPTH {
        let committed_here = !in_duplicates && index.contains(&directory, &fingerprint);
        let occupant = if committed_here {
            Occupant::SameContent
        } else {
            occupant_at(&directory.join(&filename), &fingerprint, cache)
        };

        if !in_duplicates && occupant == Occupant::SameContent {
            debug!(
                source = %request.source_path.display(),
                directory = %directory.display(),
                %fingerprint,
                committed_here,
                "content already present, redirecting to duplicates"
            );
            directory = directory.join(naming::duplicates_dir_name(marker, &fingerprint));
            filename = naming::fingerprint_name(&fingerprint, &request.desired_filename);
            disposition = Disposition::Duplicate;
            in_duplicates = true;
            continue;
        }

        if occupant != Occupant::Vacant {
            let taken = filename;
            filename = naming::first_free_enumeration(&directory, &taken);
            debug!(
                directory = %directory.display(),
                taken = %taken.to_string_lossy(),
                chosen = %filename.to_string_lossy(),
                "name taken, enumerating"
            );
            if disposition == Disposition::Placed {
                disposition = Disposition::Renamed;
            }
        }

        return Ok(Resolution {
            placement: ResolvedPlacement { directory, filename },
            disposition,
            depth,
        });
    }

    Err(PlaceError::RecursionExhausted {
        path: request.source_path.clone(),
        depth: MAX_RESOLVE_DEPTH,
    })
}
