//! Output filename resolution.
//!
//! The output file takes the source's name with its extension swapped for the
//! destination extension:
//!
//! - `IMG_0042.HEIC` + `png` → `IMG_0042.png`
//! - `IMG_0042.HEIC` + `heic`, with `heic` in the convert-to-JPEG set → `IMG_0042.jpg`
//! - `holiday.final.jpeg` + `jpg` → `holiday.final.jpg` (only the last extension changes)
//!
//! An explicit filename from the caller is used verbatim. When there is no
//! source name to derive from, a random `image-<uuid>.<ext>` is synthesized.

use std::path::Path;
use uuid::Uuid;

/// Lowercased text after the last `.`, or empty when there is none.
///
/// - `"IMG_0042.HEIC"` → `"heic"`
/// - `"archive.tar.GZ"` → `"gz"`
/// - `"README"` → `""`
pub fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Split a comma-separated extension list, trimming and lowercasing entries.
///
/// Empty entries are dropped: `"heic, HEIF,,"` → `["heic", "heif"]`.
pub fn parse_extension_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// The extension actually written: `jpg` when `extension` is in the
/// convert-to-JPEG set, otherwise `extension` unchanged.
///
/// Applying it to its own output is a no-op.
pub fn resolve_extension(extension: &str, convert_to_jpg: &[String]) -> String {
    if convert_to_jpg
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
    {
        "jpg".to_string()
    } else {
        extension.to_string()
    }
}

/// Replace the last extension of `original_name` with `extension`.
///
/// Names without an extension (or dot-files like `.profile`) get one appended.
pub fn derive_file_name(original_name: &str, extension: &str) -> String {
    match original_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.{extension}"),
        _ => format!("{original_name}.{extension}"),
    }
}

/// A fresh `image-<uuid>.<extension>` name.
pub fn synthesize_file_name(extension: &str) -> String {
    format!("image-{}.{}", Uuid::new_v4(), extension)
}

/// Pick the output filename for `original`.
///
/// Priority: `explicit` verbatim → derived from the source name → synthesized.
/// The destination extension passes through [`resolve_extension`] first.
pub fn output_file_name(
    original: &Path,
    explicit: Option<&str>,
    extension: &str,
    convert_to_jpg: &[String],
) -> String {
    if let Some(name) = explicit.filter(|n| !n.trim().is_empty()) {
        return name.to_string();
    }

    let extension = resolve_extension(extension, convert_to_jpg);
    match original.file_name().and_then(|n| n.to_str()) {
        Some(name) => derive_file_name(name, &extension),
        None => synthesize_file_name(&extension),
    }
}
