//! EXIF orientation, geolocation, and capture time.
//!
//! Reads the three pieces of embedded metadata the pipeline cares about and
//! normalizes them:
//!
//! | Tag | Normalized to |
//! |---|---|
//! | `Orientation` (0x0112) | rotation in {0, 90, 180, 270} + vertical flag |
//! | `GPSLatitude`/`GPSLongitude` + refs | signed decimal degrees |
//! | `DateTime` (0x0132), local time | ISO-8601 UTC, `YYYY-MM-DDTHH:MM:SSZ` |
//!
//! Mirrored orientations (2, 4, 5, 7) and anything out of range collapse to
//! "no rotation". A file that cannot be opened or whose metadata is corrupt
//! yields rotation 0 plus an error; that error never aborts the pipeline.
//! A readable file that simply has no EXIF block is not an error.

use chrono::{NaiveDateTime, TimeZone, Utc};
use exif::{In, Reader, Tag, Value};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const ISO_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Error, Debug)]
pub enum ExifError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unreadable EXIF metadata in {path}: {source}")]
    Parse { path: PathBuf, source: exif::Error },
}

/// Latitude/longitude in signed decimal degrees (south and west negative).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Normalized metadata for one source file.
#[derive(Debug, Serialize)]
pub struct ExifResult {
    /// Clockwise degrees the image must be rotated to display upright.
    pub rotation: u32,
    /// `false` when the stored pixels are sideways (90° / 270°).
    pub is_vertical: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip)]
    pub error: Option<ExifError>,
}

impl Default for ExifResult {
    fn default() -> Self {
        Self {
            rotation: 0,
            is_vertical: true,
            location: None,
            timestamp: None,
            error: None,
        }
    }
}

impl ExifResult {
    fn failed(error: ExifError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Map a raw EXIF orientation value to `(rotation, is_vertical)`.
///
/// Total: every value outside 3, 6 and 8 is treated as upright.
pub fn normalize_orientation(raw: u32) -> (u32, bool) {
    match raw {
        6 => (90, false),
        3 => (180, true),
        8 => (270, false),
        _ => (0, true),
    }
}

/// Read orientation, location, and timestamp from `path`.
///
/// The capture timestamp is interpreted in the machine's local time zone.
pub fn read_exif(path: &Path) -> ExifResult {
    read_exif_in(path, &chrono::Local)
}

/// [`read_exif`] with an explicit time zone for the camera's local clock.
pub fn read_exif_in<Tz: TimeZone>(path: &Path, camera_tz: &Tz) -> ExifResult {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(source) => {
            warn!("Cannot open {} for EXIF: {}", path.display(), source);
            return ExifResult::failed(ExifError::Open {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let exif = match Reader::new().read_from_container(&mut BufReader::new(file)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => {
            debug!("No EXIF block in {}", path.display());
            return ExifResult::default();
        }
        Err(source) => {
            warn!("Unreadable EXIF in {}: {}", path.display(), source);
            return ExifResult::failed(ExifError::Parse {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let raw_orientation = exif
        .get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1);
    let (rotation, is_vertical) = normalize_orientation(raw_orientation);

    let location = read_location(&exif);
    let timestamp = ascii_field(&exif, Tag::DateTime)
        .and_then(|raw| exif_datetime_to_utc(&raw, camera_tz));

    debug!(
        "EXIF {}: orientation={} rotation={} location={:?} timestamp={:?}",
        path.display(),
        raw_orientation,
        rotation,
        location,
        timestamp
    );

    ExifResult {
        rotation,
        is_vertical,
        location,
        timestamp,
        error: None,
    }
}

/// Convert an EXIF `YYYY:MM:DD HH:MM:SS` local time to ISO-8601 UTC.
///
/// Returns `None` for anything that does not parse, and for local times that
/// do not exist in `tz` (skipped by a DST jump).
pub fn exif_datetime_to_utc<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<String> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), EXIF_DATETIME_FORMAT).ok()?;
    let local = tz.from_local_datetime(&naive).earliest()?;
    Some(local.with_timezone(&Utc).format(ISO_UTC_FORMAT).to_string())
}

/// Both coordinates must be present; reported only if either is non-zero.
fn read_location(exif: &exif::Exif) -> Option<GeoLocation> {
    let latitude = signed_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S")?;
    let longitude = signed_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W")?;

    if latitude == 0.0 && longitude == 0.0 {
        return None;
    }
    Some(GeoLocation {
        latitude,
        longitude,
    })
}

fn signed_coordinate(
    exif: &exif::Exif,
    value_tag: Tag,
    ref_tag: Tag,
    negative_ref: &str,
) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let degrees = match &field.value {
        Value::Rational(parts) if parts.len() >= 3 => {
            parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0
        }
        _ => return None,
    };
    let negative = ascii_field(exif, ref_tag).is_some_and(|r| r.eq_ignore_ascii_case(negative_ref));
    Some(if negative { -degrees } else { degrees })
}

fn ascii_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(values) => values.first().map(|bytes| {
            String::from_utf8_lossy(bytes)
                .trim_end_matches('\0')
                .trim()
                .to_string()
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ExifFixture, write_jpeg, write_jpeg_with_exif};
    use chrono::FixedOffset;

    #[test]
    fn orientation_table_maps_rotations() {
        assert_eq!(normalize_orientation(1), (0, true));
        assert_eq!(normalize_orientation(6), (90, false));
        assert_eq!(normalize_orientation(3), (180, true));
        assert_eq!(normalize_orientation(8), (270, false));
    }

    #[test]
    fn orientation_table_is_total() {
        for raw in [0, 2, 4, 5, 7, 9, 255, u32::MAX] {
            assert_eq!(normalize_orientation(raw), (0, true), "raw value {raw}");
        }
    }

    #[test]
    fn datetime_converts_to_utc() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            exif_datetime_to_utc("2021:07:14 09:30:00", &plus_two).as_deref(),
            Some("2021-07-14T07:30:00Z")
        );
        assert_eq!(
            exif_datetime_to_utc("2021:07:14 09:30:00", &Utc).as_deref(),
            Some("2021-07-14T09:30:00Z")
        );
    }

    #[test]
    fn datetime_crossing_midnight() {
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(
            exif_datetime_to_utc("2020:12:31 22:15:05", &minus_five).as_deref(),
            Some("2021-01-01T03:15:05Z")
        );
    }

    #[test]
    fn malformed_datetime_is_omitted() {
        assert_eq!(exif_datetime_to_utc("", &Utc), None);
        assert_eq!(exif_datetime_to_utc("2021-07-14 09:30:00", &Utc), None);
        assert_eq!(exif_datetime_to_utc("0000:00:00 00:00:00", &Utc), None);
        assert_eq!(exif_datetime_to_utc("    :  :     :  :  ", &Utc), None);
    }

    #[test]
    fn missing_file_reports_error_with_upright_defaults() {
        let result = read_exif(Path::new("/nonexistent/photo.jpg"));
        assert_eq!(result.rotation, 0);
        assert!(result.is_vertical);
        assert!(matches!(result.error, Some(ExifError::Open { .. })));
    }

    #[test]
    fn garbage_file_reports_parse_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let result = read_exif(&path);
        assert_eq!(result.rotation, 0);
        assert!(matches!(result.error, Some(ExifError::Parse { .. })));
    }

    #[test]
    fn jpeg_without_exif_is_not_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plain.jpg");
        write_jpeg(&path, 32, 16);

        let result = read_exif(&path);
        assert!(result.error.is_none());
        assert_eq!((result.rotation, result.is_vertical), (0, true));
        assert!(result.location.is_none());
        assert!(result.timestamp.is_none());
    }

    #[test]
    fn reads_rotate_90_orientation() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("sideways.jpg");
        write_jpeg_with_exif(
            &path,
            32,
            16,
            &ExifFixture {
                orientation: Some(6),
                ..ExifFixture::default()
            },
        );

        let result = read_exif(&path);
        assert!(result.error.is_none(), "{:?}", result.error);
        assert_eq!(result.rotation, 90);
        assert!(!result.is_vertical);
    }

    #[test]
    fn reads_mirrored_orientation_as_upright() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("mirrored.jpg");
        write_jpeg_with_exif(
            &path,
            8,
            8,
            &ExifFixture {
                orientation: Some(5),
                ..ExifFixture::default()
            },
        );

        let result = read_exif(&path);
        assert_eq!((result.rotation, result.is_vertical), (0, true));
    }

    #[test]
    fn reads_location_with_hemisphere_refs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("geo.jpg");
        write_jpeg_with_exif(
            &path,
            8,
            8,
            &ExifFixture {
                location: Some((-33.8568, 151.2153)),
                ..ExifFixture::default()
            },
        );

        let location = read_exif(&path).location.expect("location");
        assert!((location.latitude - -33.8568).abs() < 1e-4);
        assert!((location.longitude - 151.2153).abs() < 1e-4);
    }

    #[test]
    fn zero_location_is_not_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("null-island.jpg");
        write_jpeg_with_exif(
            &path,
            8,
            8,
            &ExifFixture {
                location: Some((0.0, 0.0)),
                ..ExifFixture::default()
            },
        );

        assert!(read_exif(&path).location.is_none());
    }

    #[test]
    fn reads_timestamp_in_camera_zone() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("dated.jpg");
        write_jpeg_with_exif(
            &path,
            8,
            8,
            &ExifFixture {
                datetime: Some("2019:03:02 18:04:59".into()),
                ..ExifFixture::default()
            },
        );

        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let result = read_exif_in(&path, &tokyo);
        assert_eq!(result.timestamp.as_deref(), Some("2019-03-02T09:04:59Z"));
    }

    #[test]
    fn bad_timestamp_is_swallowed() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bad-date.jpg");
        write_jpeg_with_exif(
            &path,
            8,
            8,
            &ExifFixture {
                orientation: Some(3),
                datetime: Some("yesterday-ish".into()),
                ..ExifFixture::default()
            },
        );

        let result = read_exif_in(&path, &Utc);
        assert!(result.error.is_none());
        assert!(result.timestamp.is_none());
        assert_eq!(result.rotation, 180);
    }
}
