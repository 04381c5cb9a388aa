//! Shared test utilities for the datefold test suite.
//!
//! Provides fixture writers, synthetic EXIF builders, and a tree listing
//! for asserting on what a run left in the output directory.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_file(tmp.path(), "in/a.jpg", &dated_jpeg("2020:05:01 10:00:00", b"a"));
//! // ... run ...
//! assert_eq!(list_tree(&tmp.path().join("out")), vec!["2020/05/01/a.jpg"]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// =========================================================================
// Fixture files
// =========================================================================

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Every regular file under `root`, relative and `/`-separated, sorted.
/// A missing root lists as empty.
pub fn list_tree(root: &Path) -> Vec<String> {
    if !root.exists() {
        return Vec::new();
    }
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

// =========================================================================
// Synthetic EXIF
// =========================================================================

fn u16_bytes(v: u16, big_endian: bool) -> [u8; 2] {
    if big_endian { v.to_be_bytes() } else { v.to_le_bytes() }
}

fn u32_bytes(v: u32, big_endian: bool) -> [u8; 4] {
    if big_endian { v.to_be_bytes() } else { v.to_le_bytes() }
}

fn push_entry(out: &mut Vec<u8>, big_endian: bool, tag: u16, typ: u16, count: u32, value: u32) {
    out.extend(u16_bytes(tag, big_endian));
    out.extend(u16_bytes(typ, big_endian));
    out.extend(u32_bytes(count, big_endian));
    out.extend(u32_bytes(value, big_endian));
}

/// A TIFF stream with DateTime in IFD0 and DateTimeOriginal in a linked
/// Exif IFD, each only if given.
pub fn tiff_with_dates(original: Option<&str>, date_time: Option<&str>, big_endian: bool) -> Vec<u8> {
    let ifd0_count = date_time.is_some() as u16 + original.is_some() as u16;
    let exif_ifd_offset = 8 + 2 + 12 * ifd0_count as usize + 4;
    let exif_ifd_len = if original.is_some() { 2 + 12 + 4 } else { 0 };
    let mut data_offset = exif_ifd_offset + exif_ifd_len;

    let mut out = Vec::new();
    let mut strings = Vec::new();
    out.extend(if big_endian { b"MM" } else { b"II" });
    out.extend(u16_bytes(42, big_endian));
    out.extend(u32_bytes(8, big_endian));

    out.extend(u16_bytes(ifd0_count, big_endian));
    if let Some(dt) = date_time {
        let len = dt.len() + 1;
        push_entry(&mut out, big_endian, 0x0132, 2, len as u32, data_offset as u32);
        strings.extend(dt.as_bytes());
        strings.push(0);
        data_offset += len;
    }
    if original.is_some() {
        push_entry(&mut out, big_endian, 0x8769, 4, 1, exif_ifd_offset as u32);
    }
    out.extend(u32_bytes(0, big_endian));

    if let Some(dto) = original {
        let len = dto.len() + 1;
        out.extend(u16_bytes(1, big_endian));
        push_entry(&mut out, big_endian, 0x9003, 2, len as u32, data_offset as u32);
        out.extend(u32_bytes(0, big_endian));
        strings.extend(dto.as_bytes());
        strings.push(0);
    }

    out.extend(strings);
    out
}

/// A JPEG with an APP0 segment, an APP1 Exif segment wrapping `tiff`, and
/// `pixels` as scan data.
pub fn jpeg_with_exif(tiff: &[u8], pixels: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    out.extend([0xFF, 0xE0, 0x00, 0x10]);
    out.extend(b"JFIF\0\x01\x01\x00\x00\x01\x00\x01\x00\x00");
    let app1_len = (2 + 6 + tiff.len()) as u16;
    out.extend([0xFF, 0xE1]);
    out.extend(app1_len.to_be_bytes());
    out.extend(b"Exif\0\0");
    out.extend(tiff);
    out.extend([0xFF, 0xDA, 0x00, 0x02]);
    out.extend(pixels);
    out.extend([0xFF, 0xD9]);
    out
}

/// JPEG whose DateTimeOriginal is `date` (EXIF format).
pub fn dated_jpeg(date: &str, pixels: &[u8]) -> Vec<u8> {
    jpeg_with_exif(&tiff_with_dates(Some(date), None, false), pixels)
}
