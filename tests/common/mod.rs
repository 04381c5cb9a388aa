//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use datefold::fingerprint::ContentFingerprint;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

/// Every regular file under `root`, relative and `/`-separated, sorted.
pub fn list_tree(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}

pub fn hex_of(data: &[u8]) -> String {
    ContentFingerprint::of_bytes(data).to_hex()
}

/// Little-endian TIFF holding only an Exif IFD with DateTimeOriginal.
fn tiff_with_original(date: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(b"II");
    out.extend(42u16.to_le_bytes());
    out.extend(8u32.to_le_bytes());
    // IFD0 at 8: one entry pointing at the Exif IFD (8 + 18 = 26).
    out.extend(1u16.to_le_bytes());
    out.extend(0x8769u16.to_le_bytes());
    out.extend(4u16.to_le_bytes());
    out.extend(1u32.to_le_bytes());
    out.extend(26u32.to_le_bytes());
    out.extend(0u32.to_le_bytes());
    // Exif IFD at 26: DateTimeOriginal, string right after (26 + 18 = 44).
    out.extend(1u16.to_le_bytes());
    out.extend(0x9003u16.to_le_bytes());
    out.extend(2u16.to_le_bytes());
    out.extend(((date.len() + 1) as u32).to_le_bytes());
    out.extend(44u32.to_le_bytes());
    out.extend(0u32.to_le_bytes());
    out.extend(date.as_bytes());
    out.push(0);
    out
}

/// A minimal JPEG whose DateTimeOriginal is `date`, with `pixels` as scan data.
pub fn dated_jpeg(date: &str, pixels: &[u8]) -> Vec<u8> {
    let tiff = tiff_with_original(date);
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend(((2 + 6 + tiff.len()) as u16).to_be_bytes());
    out.extend(b"Exif\0\0");
    out.extend(tiff);
    out.extend([0xFF, 0xDA, 0x00, 0x02]);
    out.extend(pixels);
    out.extend([0xFF, 0xD9]);
    out
}
