//! The one place that writes into the output tree.
//!
//! [`commit`] creates the destination directory, copies the bytes, and only
//! then records the fingerprint in the [`DirectoryIndex`]. The destination is
//! opened create-new, so an entry that appeared after resolution is reported
//! as [`PlaceError::Occupied`] instead of being overwritten; the caller
//! re-resolves in that case.

use crate::fingerprint::ContentFingerprint;
use crate::index::DirectoryIndex;
use crate::organize::PlaceError;
use crate::types::ResolvedPlacement;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Copy `source` to `placement` and record `fingerprint` for its directory.
///
/// Returns the full destination path. On any failure the index is left
/// untouched and no partial file remains.
pub fn commit(
    placement: &ResolvedPlacement,
    source: &Path,
    fingerprint: ContentFingerprint,
    index: &mut DirectoryIndex,
) -> Result<PathBuf, PlaceError> {
    let destination = placement.path();
    let reader = File::open(source).map_err(|e| PlaceError::unreadable(source, e))?;

    fs::create_dir_all(&placement.directory)
        .map_err(|e| PlaceError::write_failed(source, &destination, e))?;
    copy_new(reader, source, &destination)?;

    index.record(&placement.directory, fingerprint);
    Ok(destination)
}

fn copy_new(mut reader: File, source: &Path, destination: &Path) -> Result<(), PlaceError> {
    let mut writer = match OpenOptions::new().write(true).create_new(true).open(destination) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(PlaceError::Occupied {
                destination: destination.to_path_buf(),
            });
        }
        Err(e) => return Err(PlaceError::write_failed(source, destination, e)),
    };

    if let Err(e) = io::copy(&mut reader, &mut writer) {
        drop(writer);
        if let Err(cleanup) = fs::remove_file(destination) {
            warn!(
                destination = %destination.display(),
                error = %cleanup,
                "could not remove partial copy"
            );
        }
        return Err(PlaceError::write_failed(source, destination, e));
    }

    // Mirror the source's permission bits. Not worth failing the copy over.
    match reader.metadata() {
        Ok(meta) => {
            if let Err(e) = fs::set_permissions(destination, meta.permissions()) {
                debug!(destination = %destination.display(), error = %e, "permissions not copied");
            }
        }
        Err(e) => debug!(source = %source.display(), error = %e, "source metadata unavailable"),
    }

    Ok(())
}
