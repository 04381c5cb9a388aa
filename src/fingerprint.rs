//! Content fingerprints and the per-run fingerprint cache.
//!
//! A [`ContentFingerprint`] is the 128-bit MD5 digest of a file's full byte
//! content. Two files with equal fingerprints are treated as identical; no
//! second byte-by-byte comparison is made.
//!
//! ## Caching
//!
//! Hashing is the only step that reads whole files, and the same source can
//! be requested several times in one run (the same photo listed twice, or a
//! destination file probed during a name collision). [`FingerprintCache`]
//! keys digests by path and never invalidates them: sources are assumed not
//! to change while a run is in progress, and destinations are never
//! overwritten.
//!
//! ## Parallel prefetch
//!
//! Fingerprinting is pure and read-only, so [`FingerprintCache::prefetch`]
//! can warm the cache for a whole batch on the rayon pool before the
//! sequential placement pass starts. Placement itself never runs in
//! parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Read buffer size for streaming a file through the hasher.
const CHUNK_SIZE: usize = 64 * 1024;

/// 128-bit digest of a file's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentFingerprint([u8; 16]);

impl ContentFingerprint {
    /// Fingerprint an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(md5::compute(data).0)
    }

    /// Lowercase hex form, 32 characters. This is the token used in
    /// duplicates-directory names and fingerprint-qualified filenames.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl From<ContentFingerprint> for String {
    fn from(fp: ContentFingerprint) -> Self {
        fp.to_hex()
    }
}

impl TryFrom<String> for ContentFingerprint {
    type Error = String;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        if hex.len() != 32 || !hex.is_ascii() {
            return Err(format!("expected 32 hex characters, got {:?}", hex));
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|e| format!("invalid hex in {:?}: {}", hex, e))?;
        }
        Ok(Self(bytes))
    }
}

/// MD5 of a file's contents, streamed in fixed-size chunks.
pub fn hash_file(path: &Path) -> io::Result<ContentFingerprint> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }
    Ok(ContentFingerprint(context.compute().0))
}

/// How often the cache had to read a file versus answering from memory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintStats {
    pub hashed: u32,
    pub reused: u32,
}

impl FingerprintStats {
    pub fn total(&self) -> u32 {
        self.hashed + self.reused
    }
}

impl fmt::Display for FingerprintStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reused > 0 {
            write!(
                f,
                "{} hashed, {} reused ({} lookups)",
                self.hashed,
                self.reused,
                self.total()
            )
        } else {
            write!(f, "{} hashed", self.hashed)
        }
    }
}

/// Path-keyed fingerprint memo for one run.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: HashMap<PathBuf, ContentFingerprint>,
    stats: FingerprintStats,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint `path`, reading it only on the first request.
    pub fn fingerprint(&mut self, path: &Path) -> io::Result<ContentFingerprint> {
        if let Some(fp) = self.entries.get(path) {
            self.stats.reused += 1;
            return Ok(*fp);
        }
        let fp = hash_file(path)?;
        self.stats.hashed += 1;
        self.entries.insert(path.to_path_buf(), fp);
        Ok(fp)
    }

    /// Cached fingerprint for `path`, without touching the filesystem.
    pub fn get(&self, path: &Path) -> Option<ContentFingerprint> {
        self.entries.get(path).copied()
    }

    /// Hash every uncached path in parallel and store the results.
    ///
    /// Paths that fail to read are left out of the cache, so the later
    /// sequential [`fingerprint`](Self::fingerprint) call sees and reports
    /// the error for that one placement. Returns the number of files hashed.
    pub fn prefetch<'a, I>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut seen = HashSet::new();
        let pending: Vec<&Path> = paths
            .into_iter()
            .filter(|p| !self.entries.contains_key(*p) && seen.insert(*p))
            .collect();

        let hashed: Vec<(PathBuf, ContentFingerprint)> = pending
            .par_iter()
            .filter_map(|path| match hash_file(path) {
                Ok(fp) => Some((path.to_path_buf(), fp)),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "prefetch skipped unreadable file");
                    None
                }
            })
            .collect();

        let count = hashed.len();
        self.stats.hashed += count as u32;
        self.entries.extend(hashed);
        count
    }

    pub fn stats(&self) -> FingerprintStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every digest and zero the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats = FingerprintStats::default();
    }
}
