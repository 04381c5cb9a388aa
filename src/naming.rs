//! Filename rules used by the placement resolver.
//!
//! Every name the resolver produces comes from one of three shapes:
//!
//! - **Desired name**: the source's own filename, kept as-is when free.
//! - **Enumerated name**: `<stem>-<n>.<ext>` with the smallest free `n`,
//!   used when a different file already holds the desired name.
//! - **Fingerprint-qualified name**: `<hex>.<ext>`, used inside a
//!   duplicates directory so copies of different content never mix.
//!
//! Duplicates directories are named `<marker>-<hex>`:
//!
//! ```text
//! 2020/05/01/
//! ├── a.jpg
//! └── duplicates-1f3870be274f6c49b3e31a0c6728957f/
//!     ├── 1f3870be274f6c49b3e31a0c6728957f.jpg
//!     └── 1f3870be274f6c49b3e31a0c6728957f-0.jpg
//! ```
//!
//! Names are handled as [`OsStr`] so non-UTF-8 filenames survive untouched.

use crate::fingerprint::ContentFingerprint;
use std::ffi::{OsStr, OsString};
use std::path::Path;

/// Split a filename at its last dot.
///
/// Dotfiles have no extension: `.hidden` → (`.hidden`, None), and
/// `a.tar.gz` → (`a.tar`, Some(`gz`)).
pub fn split_extension(name: &OsStr) -> (&OsStr, Option<&OsStr>) {
    let path = Path::new(name);
    let stem = path.file_stem().unwrap_or(name);
    (stem, path.extension())
}

/// `<stem>-<n>.<ext>`, or `<stem>-<n>` when the name has no extension.
pub fn enumerated_name(name: &OsStr, n: u32) -> OsString {
    let (stem, ext) = split_extension(name);
    let mut out = OsString::from(stem);
    out.push(format!("-{}", n));
    if let Some(ext) = ext {
        out.push(".");
        out.push(ext);
    }
    out
}

/// `<hex fingerprint>.<ext of original>`.
pub fn fingerprint_name(fingerprint: &ContentFingerprint, original: &OsStr) -> OsString {
    let mut out = OsString::from(fingerprint.to_hex());
    if let Some(ext) = split_extension(original).1 {
        out.push(".");
        out.push(ext);
    }
    out
}

/// Name of the duplicates directory for one piece of content.
pub fn duplicates_dir_name(marker: &str, fingerprint: &ContentFingerprint) -> String {
    format!("{}-{}", marker, fingerprint)
}

/// Whether `dir` is the duplicates directory for `fingerprint`, judged by
/// an exact match of its final component. A folder that merely starts with
/// `<marker>-` is an ordinary directory.
pub fn is_duplicates_dir(dir: &Path, marker: &str, fingerprint: &ContentFingerprint) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == duplicates_dir_name(marker, fingerprint))
}

/// Whether anything at all occupies `path`: file, directory, or a dangling
/// symlink (which `Path::exists` would report as free).
pub fn is_occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// First enumerated variant of `name` that is free in `dir`, counting from 0.
pub fn first_free_enumeration(dir: &Path, name: &OsStr) -> OsString {
    (0..=u32::MAX)
        .map(|n| enumerated_name(name, n))
        .find(|candidate| !is_occupied(&dir.join(candidate)))
        .unwrap_or_else(|| enumerated_name(name, u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fp() -> ContentFingerprint {
        ContentFingerprint::of_bytes(b"same bytes")
    }

    // =========================================================================
    // split_extension
    // =========================================================================

    #[test]
    fn split_simple() {
        let (stem, ext) = split_extension(OsStr::new("img.jpg"));
        assert_eq!(stem, "img");
        assert_eq!(ext, Some(OsStr::new("jpg")));
    }

    #[test]
    fn split_takes_last_dot() {
        let (stem, ext) = split_extension(OsStr::new("archive.tar.gz"));
        assert_eq!(stem, "archive.tar");
        assert_eq!(ext, Some(OsStr::new("gz")));
    }

    #[test]
    fn split_dotfile_has_no_extension() {
        let (stem, ext) = split_extension(OsStr::new(".hidden"));
        assert_eq!(stem, ".hidden");
        assert_eq!(ext, None);
    }

    #[test]
    fn split_no_extension() {
        let (stem, ext) = split_extension(OsStr::new("README"));
        assert_eq!(stem, "README");
        assert_eq!(ext, None);
    }

    // =========================================================================
    // enumerated_name / fingerprint_name
    // =========================================================================

    #[test]
    fn enumerate_keeps_extension() {
        assert_eq!(enumerated_name(OsStr::new("img.jpg"), 0), "img-0.jpg");
        assert_eq!(enumerated_name(OsStr::new("img.jpg"), 12), "img-12.jpg");
    }

    #[test]
    fn enumerate_without_extension() {
        assert_eq!(enumerated_name(OsStr::new("README"), 1), "README-1");
    }

    #[test]
    fn enumerate_preserves_extension_case() {
        assert_eq!(enumerated_name(OsStr::new("IMG_0001.JPG"), 0), "IMG_0001-0.JPG");
    }

    #[test]
    fn fingerprint_name_uses_original_extension() {
        let name = fingerprint_name(&fp(), OsStr::new("holiday.jpeg"));
        assert_eq!(name, OsString::from(format!("{}.jpeg", fp())));
    }

    #[test]
    fn fingerprint_name_without_extension() {
        let name = fingerprint_name(&fp(), OsStr::new("scan"));
        assert_eq!(name, OsString::from(fp().to_hex()));
    }

    // =========================================================================
    // duplicates directories
    // =========================================================================

    #[test]
    fn duplicates_dir_embeds_marker_and_hex() {
        assert_eq!(
            duplicates_dir_name("duplicates", &fp()),
            format!("duplicates-{}", fp())
        );
    }

    #[test]
    fn recognizes_duplicates_dir() {
        let dir = Path::new("/out/2020/05/01").join(duplicates_dir_name("duplicates", &fp()));
        assert!(is_duplicates_dir(&dir, "duplicates", &fp()));
    }

    #[test]
    fn plain_dir_is_not_duplicates_dir() {
        assert!(!is_duplicates_dir(Path::new("/out/2020/05/01"), "duplicates", &fp()));
    }

    #[test]
    fn only_final_component_counts() {
        let dir = Path::new("/out")
            .join(duplicates_dir_name("duplicates", &fp()))
            .join("2020");
        assert!(!is_duplicates_dir(&dir, "duplicates", &fp()));
    }

    #[test]
    fn marker_prefixed_folder_is_not_duplicates_dir() {
        let dir = Path::new("/out/no date information/duplicates-from-old-phone");
        assert!(!is_duplicates_dir(dir, "duplicates", &fp()));
    }

    #[test]
    fn other_contents_duplicates_dir_does_not_match() {
        let other = ContentFingerprint::of_bytes(b"something else");
        let dir = Path::new("/out").join(duplicates_dir_name("duplicates", &other));
        assert!(!is_duplicates_dir(&dir, "duplicates", &fp()));
    }

    #[test]
    fn marker_without_dash_is_not_duplicates_dir() {
        assert!(!is_duplicates_dir(Path::new("/out/duplicates"), "duplicates", &fp()));
    }

    // =========================================================================
    // first_free_enumeration
    // =========================================================================

    #[test]
    fn first_free_starts_at_zero() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("img.jpg"), "a").unwrap();
        assert_eq!(first_free_enumeration(tmp.path(), OsStr::new("img.jpg")), "img-0.jpg");
    }

    #[test]
    fn first_free_skips_taken_numbers() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("img.jpg"), "a").unwrap();
        fs::write(tmp.path().join("img-0.jpg"), "b").unwrap();
        fs::create_dir(tmp.path().join("img-1.jpg")).unwrap();
        assert_eq!(first_free_enumeration(tmp.path(), OsStr::new("img.jpg")), "img-2.jpg");
    }

    #[test]
    fn first_free_fills_gaps() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("img-1.jpg"), "b").unwrap();
        assert_eq!(first_free_enumeration(tmp.path(), OsStr::new("img.jpg")), "img-0.jpg");
    }

    #[test]
    fn is_occupied_sees_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        assert!(is_occupied(&tmp.path().join("sub")));
        assert!(!is_occupied(&tmp.path().join("free")));
    }
}
