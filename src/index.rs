//! Which content has been committed into which directory during this run.
//!
//! The index is the resolver's memory: a directory maps to the set of
//! fingerprints physically copied into it. It only ever grows, is never
//! persisted, and is updated by the committer strictly after a copy
//! succeeds, so a failed copy can't leave a phantom entry behind.
//!
//! Keys are normalized with [`normalize_dir`] so `/out/2020/./05` and
//! `/out/2020/05` land on the same entry even before the directory exists
//! on disk (which rules out `fs::canonicalize`).

use crate::fingerprint::ContentFingerprint;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

/// Absolute, lexically normalized form of `dir`.
///
/// `.` components are dropped and `..` pops the previous component. Symlinks
/// are not resolved. Falls back to lexical cleanup of the path as given when
/// the working directory is unavailable.
pub fn normalize_dir(dir: &Path) -> PathBuf {
    let absolute = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root or a prefix.
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct DirectoryIndex {
    directories: HashMap<PathBuf, HashSet<ContentFingerprint>>,
}

impl DirectoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note that `fingerprint` now lives in `directory`. Idempotent; returns
    /// `true` the first time a pair is recorded.
    pub fn record(&mut self, directory: &Path, fingerprint: ContentFingerprint) -> bool {
        self.directories
            .entry(normalize_dir(directory))
            .or_default()
            .insert(fingerprint)
    }

    pub fn contains(&self, directory: &Path, fingerprint: &ContentFingerprint) -> bool {
        self.directories
            .get(&normalize_dir(directory))
            .is_some_and(|set| set.contains(fingerprint))
    }

    /// Number of distinct fingerprints recorded for `directory`.
    pub fn count_in(&self, directory: &Path) -> usize {
        self.directories
            .get(&normalize_dir(directory))
            .map_or(0, HashSet::len)
    }

    /// Number of directories written to so far.
    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn clear(&mut self) {
        self.directories.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(data: &[u8]) -> ContentFingerprint {
        ContentFingerprint::of_bytes(data)
    }

    #[test]
    fn empty_index_contains_nothing() {
        let index = DirectoryIndex::new();
        assert!(!index.contains(Path::new("/out/2020"), &fp(b"a")));
        assert_eq!(index.count_in(Path::new("/out/2020")), 0);
    }

    #[test]
    fn record_then_contains() {
        let mut index = DirectoryIndex::new();
        assert!(index.record(Path::new("/out/2020"), fp(b"a")));
        assert!(index.contains(Path::new("/out/2020"), &fp(b"a")));
        assert!(!index.contains(Path::new("/out/2020"), &fp(b"b")));
    }

    #[test]
    fn record_is_idempotent() {
        let mut index = DirectoryIndex::new();
        assert!(index.record(Path::new("/out/2020"), fp(b"a")));
        assert!(!index.record(Path::new("/out/2020"), fp(b"a")));
        assert_eq!(index.count_in(Path::new("/out/2020")), 1);
    }

    #[test]
    fn directories_are_independent() {
        let mut index = DirectoryIndex::new();
        index.record(Path::new("/out/2020/05/01"), fp(b"a"));
        assert!(!index.contains(Path::new("/out/2020/05/02"), &fp(b"a")));
        assert!(!index.contains(Path::new("/out/2020/05"), &fp(b"a")));
        assert_eq!(index.directory_count(), 1);
    }

    #[test]
    fn equivalent_spellings_share_an_entry() {
        let mut index = DirectoryIndex::new();
        index.record(Path::new("/out/2020/./05/"), fp(b"a"));
        assert!(index.contains(Path::new("/out/2020/05"), &fp(b"a")));
        assert!(index.contains(Path::new("/out/2020/06/../05"), &fp(b"a")));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut index = DirectoryIndex::new();
        index.record(Path::new("/out/a"), fp(b"a"));
        index.clear();
        assert_eq!(index.directory_count(), 0);
    }

    // =========================================================================
    // normalize_dir
    // =========================================================================

    #[test]
    fn normalize_drops_cur_dir() {
        assert_eq!(normalize_dir(Path::new("/a/./b")), PathBuf::from("/a/b"));
    }

    #[test]
    fn normalize_folds_parent_dir() {
        assert_eq!(normalize_dir(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
    }

    #[test]
    fn normalize_stops_at_root() {
        assert_eq!(normalize_dir(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn normalize_makes_relative_absolute() {
        let normalized = normalize_dir(Path::new("out/2020"));
        assert!(normalized.is_absolute());
        assert!(normalized.ends_with("out/2020"));
    }
}
