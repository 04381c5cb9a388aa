//! Capture-date resolution and date-directory formatting.
//!
//! A photo's capture date decides which directory of the output tree it is
//! headed for. The date comes from embedded EXIF fields (see [`crate::exif`]):
//!
//! - **DateTimeOriginal**: when the shutter fired. Written by the camera and
//!   left alone by editors.
//! - **DateTime**: last modification of the file's metadata. Often equal to
//!   the capture time for straight-out-of-camera files, but rewritten by
//!   some editing software.
//!
//! ## Resolution priority
//!
//! The first value that parses wins: DateTimeOriginal → DateTime → None.
//! A present but unparsable value (cameras with an unset clock write
//! `0000:00:00 00:00:00`) is skipped, not fatal.
//!
//! Files with no usable date are classified elsewhere as undated; see
//! [`crate::scan`].

use crate::exif::read_exif_dates;
use chrono::NaiveDateTime;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Layout of EXIF date strings.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Parse an EXIF date string such as `2020:05:01 10:00:00`.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), EXIF_DATETIME_FORMAT).ok()
}

/// First source that parses as a date, in priority order.
///
/// ```text
/// resolve_date(&[date_time_original, date_time])
/// ```
pub fn resolve_date(sources: &[Option<&str>]) -> Option<NaiveDateTime> {
    sources.iter().flatten().find_map(|raw| parse_exif_datetime(raw))
}

/// Capture date of the file at `path`, if it has one.
pub fn capture_date(path: &Path) -> Option<NaiveDateTime> {
    let dates = read_exif_dates(path);
    resolve_date(&[dates.date_time_original.as_deref(), dates.date_time.as_deref()])
}

/// Relative directory for `date` under `path_format` (e.g. `%Y/%m/%d`).
///
/// Returns `None` if the pattern can't be rendered.
pub fn date_directory(date: &NaiveDateTime, path_format: &str) -> Option<PathBuf> {
    let mut rendered = String::new();
    write!(rendered, "{}", date.format(path_format)).ok()?;
    Some(PathBuf::from(rendered))
}
