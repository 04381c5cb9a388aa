//! Minimal EXIF reader for capture dates.
//!
//! Extracts two ASCII fields:
//! - DateTimeOriginal (Exif IFD, tag 0x9003)
//! - DateTime (IFD0, tag 0x0132)
//!
//! For JPEG: reads the TIFF structure inside the APP1 `Exif\0\0` segment.
//! For TIFF-based files (`II*\0` / `MM\0*`, which includes most camera RAW
//! formats): reads the file's own IFD0.
//!
//! Files are recognized by their leading bytes, not their extension. Only a
//! bounded prefix is read for JPEG and unrecognized files; TIFF-based files
//! are read whole because their IFDs may sit anywhere.
//! Anything malformed yields empty [`ExifDates`] rather than an error: a
//! file without readable dates is simply undated.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const TAG_DATE_TIME: u16 = 0x0132;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;

const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;

const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Bytes read from the start of a file before deciding its format. APP1 is
/// capped at 64 KiB, and only a few small segments precede it in practice.
const PREFIX_LEN: u64 = 256 * 1024;

/// Raw date strings found in a file, untrimmed of their EXIF formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifDates {
    pub date_time_original: Option<String>,
    pub date_time: Option<String>,
}

impl ExifDates {
    pub fn is_empty(&self) -> bool {
        self.date_time_original.is_none() && self.date_time.is_none()
    }
}

/// Read EXIF dates from a file, dispatching on its magic bytes.
/// Returns empty dates on any read or parse failure.
pub fn read_exif_dates(path: &Path) -> ExifDates {
    match read_metadata_bytes(path) {
        Ok(bytes) => exif_dates_from_bytes(&bytes),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "not readable for EXIF");
            ExifDates::default()
        }
    }
}

/// The leading [`PREFIX_LEN`] bytes, extended to the whole file only when it
/// is TIFF-based.
fn read_metadata_bytes(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    (&mut file).take(PREFIX_LEN).read_to_end(&mut bytes)?;
    if is_tiff(&bytes) {
        file.read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}

fn is_tiff(data: &[u8]) -> bool {
    data.starts_with(b"II*\0") || data.starts_with(b"MM\0*")
}

/// Same as [`read_exif_dates`], for an in-memory file.
pub fn exif_dates_from_bytes(data: &[u8]) -> ExifDates {
    if data.starts_with(&[0xFF, 0xD8]) {
        find_jpeg_exif(data).map(read_tiff_dates).unwrap_or_default()
    } else if is_tiff(data) {
        read_tiff_dates(data)
    } else {
        ExifDates::default()
    }
}

// ---------------------------------------------------------------------------
// JPEG: locate the APP1 Exif segment
// ---------------------------------------------------------------------------

/// TIFF bytes inside the first APP1 segment that carries an Exif header.
fn find_jpeg_exif(data: &[u8]) -> Option<&[u8]> {
    let mut pos = 2; // past SOI
    loop {
        // Fill bytes: any number of 0xFF before the marker code.
        while data.get(pos) == Some(&0xFF) && data.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        if *data.get(pos)? != 0xFF {
            return None;
        }
        let marker = *data.get(pos + 1)?;
        match marker {
            // SOS / EOI: metadata segments are all behind us.
            0xDA | 0xD9 => return None,
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            _ => {}
        }

        let seg_len = u16::from_be_bytes([*data.get(pos + 2)?, *data.get(pos + 3)?]) as usize;
        if seg_len < 2 {
            return None;
        }
        let seg_start = pos + 4;
        let seg_end = pos + 2 + seg_len;
        if marker == 0xE1 {
            let segment = data.get(seg_start..seg_end.min(data.len()))?;
            if let Some(tiff) = segment.strip_prefix(EXIF_HEADER) {
                return Some(tiff);
            }
        }
        pos = seg_end;
    }
}

// ---------------------------------------------------------------------------
// TIFF structure
// ---------------------------------------------------------------------------

/// Bounds-checked view over a TIFF byte stream.
struct Tiff<'a> {
    data: &'a [u8],
    big_endian: bool,
}

/// One 12-byte IFD entry. `value_pos` is where the 4-byte value/offset
/// field starts.
#[derive(Debug, Clone, Copy)]
struct IfdEntry {
    tag: u16,
    typ: u16,
    count: u32,
    value_pos: usize,
}

impl<'a> Tiff<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let big_endian = match data.get(0..2)? {
            b"MM" => true,
            b"II" => false,
            _ => return None,
        };
        let tiff = Self { data, big_endian };
        (tiff.u16_at(2)? == 42).then_some(tiff)
    }

    fn u16_at(&self, offset: usize) -> Option<u16> {
        let bytes: [u8; 2] = self.data.get(offset..offset + 2)?.try_into().ok()?;
        Some(if self.big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(offset..offset + 4)?.try_into().ok()?;
        Some(if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }

    fn first_ifd(&self) -> Option<usize> {
        Some(self.u32_at(4)? as usize)
    }

    /// Entries of the IFD at `offset`. Truncated tables yield what fits.
    fn entries(&self, offset: usize) -> Vec<IfdEntry> {
        let Some(count) = self.u16_at(offset) else {
            return Vec::new();
        };
        (0..count as usize)
            .map_while(|i| {
                let at = offset + 2 + i * 12;
                Some(IfdEntry {
                    tag: self.u16_at(at)?,
                    typ: self.u16_at(at + 2)?,
                    count: self.u32_at(at + 4)?,
                    value_pos: at + 8,
                })
            })
            .collect()
    }

    fn long(&self, entry: &IfdEntry) -> Option<u32> {
        (entry.typ == TYPE_LONG && entry.count >= 1).then(|| self.u32_at(entry.value_pos))?
    }

    /// ASCII value with trailing NULs and whitespace removed.
    fn ascii(&self, entry: &IfdEntry) -> Option<String> {
        if entry.typ != TYPE_ASCII || entry.count == 0 {
            return None;
        }
        let len = entry.count as usize;
        let start = if len <= 4 {
            entry.value_pos
        } else {
            self.u32_at(entry.value_pos)? as usize
        };
        let raw = self.data.get(start..start.checked_add(len)?)?;
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_end_matches('\0').trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// Dates from IFD0 and, if linked, the Exif sub-IFD.
fn read_tiff_dates(data: &[u8]) -> ExifDates {
    let mut dates = ExifDates::default();
    let Some(tiff) = Tiff::parse(data) else {
        return dates;
    };
    let Some(ifd0) = tiff.first_ifd() else {
        return dates;
    };

    let mut exif_ifd = None;
    for entry in tiff.entries(ifd0) {
        match entry.tag {
            TAG_DATE_TIME => dates.date_time = tiff.ascii(&entry),
            TAG_EXIF_IFD => exif_ifd = tiff.long(&entry).map(|o| o as usize),
            _ => {}
        }
    }

    // A sub-IFD pointing back at IFD0 would just re-read it; harmless.
    if let Some(offset) = exif_ifd {
        dates.date_time_original = tiff
            .entries(offset)
            .iter()
            .find(|e| e.tag == TAG_DATE_TIME_ORIGINAL)
            .and_then(|e| tiff.ascii(e));
    }

    dates
}
