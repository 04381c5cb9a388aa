//! CLI output formatting for `check` and `sort`.
//!
//! # Output Format
//!
//! ## Check
//!
//! Files are grouped by the directory they are headed for, in output-tree
//! order, with sources shown relative to the input root:
//!
//! ```text
//! 2020/05/01 (2 files)
//!     001 trip/IMG_1.jpg
//!     002 trip/IMG_2.jpg
//! no date information/trip (1 file)
//!     001 trip/notes.txt
//!
//! Skipped
//!     trip/link.jpg (symlink)
//!
//! 3 files: 2 dated, 1 undated, 1 skipped
//! ```
//!
//! ## Sort
//!
//! One line per placement as it happens, a notice for renames and
//! duplicates, and a summary at the end:
//!
//! ```text
//! trip/IMG_1.jpg → 2020/05/01/IMG_1.jpg
//! trip/IMG_1 copy.jpg → 2020/05/01/duplicates-5eb6…/5eb6….jpg (duplicate)
//! other/IMG_1.jpg → 2020/05/01/IMG_1-0.jpg (renamed)
//! FAILED trip/broken.jpg
//!     cannot read source …: Permission denied (os error 13)
//!
//! 1 copied, 1 renamed, 1 duplicate, 1 failed (4 total)
//! Fingerprints: 4 hashed, 1 reused (5 lookups)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::fingerprint::FingerprintStats;
use crate::organize::{OrganizeEvent, RunReport};
use crate::scan::{Scan, SkipReason, Skipped};
use crate::types::Disposition;
use std::collections::BTreeMap;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `root` with `/` separators, or as given if outside it.
fn relative(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.display().to_string(),
    }
}

pub(crate) fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

fn skip_reason(reason: &SkipReason) -> String {
    match reason {
        SkipReason::Symlink => "symlink".to_string(),
        SkipReason::ConfigFile => "config file".to_string(),
        SkipReason::Unreadable { message } => format!("unreadable: {}", message),
    }
}

/// Format the skipped-entries block. Empty input gives no lines.
pub fn format_skipped(skipped: &[Skipped], input_root: &Path) -> Vec<String> {
    if skipped.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Skipped".to_string()];
    for entry in skipped {
        lines.push(format!(
            "{}{} ({})",
            indent(1),
            relative(&entry.path, input_root),
            skip_reason(&entry.reason)
        ));
    }
    lines
}

// ============================================================================
// Check
// ============================================================================

/// Format a scan as a per-destination-directory plan.
pub fn format_scan_output(scan: &Scan) -> Vec<String> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for file in &scan.files {
        groups
            .entry(relative(&file.request.target_directory, &scan.output))
            .or_default()
            .push(relative(&file.request.source_path, &scan.input));
    }

    let mut lines = Vec::new();
    for (directory, sources) in &groups {
        lines.push(format!(
            "{} ({})",
            directory,
            plural(sources.len(), "file", "files")
        ));
        for (i, source) in sources.iter().enumerate() {
            lines.push(format!("{}{} {}", indent(1), format_index(i + 1), source));
        }
    }

    let skipped = format_skipped(&scan.skipped, &scan.input);
    if !skipped.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(skipped);
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{}: {} dated, {} undated, {} skipped",
        plural(scan.files.len(), "file", "files"),
        scan.dated_count(),
        scan.undated_count(),
        scan.skipped.len()
    ));
    lines
}

pub fn print_scan_output(scan: &Scan) {
    for line in format_scan_output(scan) {
        println!("{}", line);
    }
}

// ============================================================================
// Sort
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_event(event: &OrganizeEvent, input_root: &Path, output_root: &Path) -> Vec<String> {
    match event {
        OrganizeEvent::Placed(placement) => {
            let line = format!(
                "{} → {}",
                relative(&placement.source, input_root),
                relative(&placement.destination, output_root)
            );
            let line = match placement.disposition {
                Disposition::Placed => line,
                Disposition::Renamed => format!("{} (renamed)", line),
                Disposition::Duplicate => format!("{} (duplicate)", line),
            };
            vec![line]
        }
        OrganizeEvent::Failed { source, error } => vec![
            format!("FAILED {}", relative(source, input_root)),
            format!("{}{}", indent(1), error),
        ],
    }
}

/// Format the end-of-run summary.
pub fn format_report(report: &RunReport, fingerprints: &FingerprintStats) -> Vec<String> {
    vec![report.to_string(), format!("Fingerprints: {}", fingerprints)]
}

pub fn print_report(report: &RunReport, fingerprints: &FingerprintStats) {
    for line in format_report(report, fingerprints) {
        println!("{}", line);
    }
}
