//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! The header line names what happened to the file (source `→` result); the
//! indented context lines carry the derived facts. Absent facts are omitted
//! rather than printed as blanks.
//!
//! # Output Format
//!
//! ## Normalize
//!
//! ```text
//! IMG_0042.heic → reframed/IMG_0042.jpg
//!     Size: 1024x768 JPEG, 181.2 KB
//!     Orientation: 90° (stored sideways)
//!     Location: -33.85680, 151.21530
//!     Taken: 2019-03-02T09:04:59Z
//! ```
//!
//! When the original is kept the header reads `IMG_0042.jpg (unchanged)`.
//!
//! ## Exif
//!
//! ```text
//! IMG_0042.heic
//!     Orientation: 0° (upright)
//!     Location: none
//!     Taken: unknown
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::{ExifResult, GeoLocation, OutputFormat};
use crate::pipeline::NormalizeReport;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human-readable byte count with one decimal above 1 KB.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn format_orientation(rotation: u32, is_vertical: bool) -> String {
    let layout = if is_vertical { "upright" } else { "stored sideways" };
    if rotation == 180 {
        return "180\u{b0} (upside down)".to_string();
    }
    format!("{rotation}\u{b0} ({layout})")
}

fn format_location(latitude: f64, longitude: f64) -> String {
    format!("{latitude:.5}, {longitude:.5}")
}

fn format_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Png => "PNG",
        OutputFormat::Jpeg => "JPEG",
    }
}

// ============================================================================
// normalize
// ============================================================================

/// Format a normalize report as display lines.
pub fn format_normalize_report(source: &Path, report: &NormalizeReport) -> Vec<String> {
    let mut lines = Vec::new();
    let ctx = indent(1);

    if report.path == source {
        lines.push(format!("{} (unchanged)", display_name(source)));
    } else {
        lines.push(format!(
            "{} \u{2192} {}",
            display_name(source),
            report.path.display()
        ));
    }

    let mut size = format!("{}x{}", report.width, report.height);
    if let Some(format) = report.format {
        size.push(' ');
        size.push_str(format_name(format));
    }
    lines.push(format!(
        "{ctx}Size: {size}, {}",
        format_size(report.file_size)
    ));

    lines.push(format!(
        "{ctx}Orientation: {}",
        format_orientation(report.original_rotation, report.is_vertical)
    ));
    if let (Some(lat), Some(lon)) = (report.latitude, report.longitude) {
        lines.push(format!("{ctx}Location: {}", format_location(lat, lon)));
    }
    if let Some(ts) = &report.timestamp {
        lines.push(format!("{ctx}Taken: {ts}"));
    }
    if let Some(reason) = &report.fallback_reason {
        lines.push(format!("{ctx}Fallback: {reason}"));
    }
    for path in &report.discarded {
        lines.push(format!("{ctx}Discarded: {}", path.display()));
    }
    lines
}

pub fn print_normalize_report(source: &Path, report: &NormalizeReport) {
    for line in format_normalize_report(source, report) {
        println!("{}", line);
    }
}

// ============================================================================
// exif
// ============================================================================

/// Format an EXIF reading as display lines.
pub fn format_exif(source: &Path, exif: &ExifResult) -> Vec<String> {
    let ctx = indent(1);
    let location = exif
        .location
        .map(|GeoLocation { latitude, longitude }| format_location(latitude, longitude))
        .unwrap_or_else(|| "none".to_string());

    let mut lines = vec![
        display_name(source),
        format!(
            "{ctx}Orientation: {}",
            format_orientation(exif.rotation, exif.is_vertical)
        ),
        format!("{ctx}Location: {location}"),
        format!(
            "{ctx}Taken: {}",
            exif.timestamp.as_deref().unwrap_or("unknown")
        ),
    ];
    if let Some(e) = &exif.error {
        lines.push(format!("{ctx}Error: {e}"));
    }
    lines
}

pub fn print_exif(source: &Path, exif: &ExifResult) {
    for line in format_exif(source, exif) {
        println!("{}", line);
    }
}

// ============================================================================
// relocate
// ============================================================================

/// Format a completed move.
pub fn format_relocation(from: &Path, to: &Path) -> Vec<String> {
    vec![format!("{} \u{2192} {}", from.display(), to.display())]
}

pub fn print_relocation(from: &Path, to: &Path) {
    for line in format_relocation(from, to) {
        println!("{}", line);
    }
}
