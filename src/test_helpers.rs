//! Shared test utilities for the reframe test suite.
//!
//! Synthesizes small JPEG and PNG files on disk, optionally carrying an EXIF
//! block with orientation, capture time, and GPS coordinates.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = tmp.path().join("sideways.jpg");
//! write_jpeg_with_exif(&path, 64, 32, &ExifFixture {
//!     orientation: Some(6),
//!     ..ExifFixture::default()
//! });
//! ```

use image::{ImageFormat, RgbImage};
use std::path::Path;

// =========================================================================
// Pixel fixtures
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// Black, with a white block over the top-left quarter of each axis.
///
/// The block's final position shows which way a rotation turned the image.
fn marked(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if x < width / 4 && y < height / 4 {
            image::Rgb([255, 255, 255])
        } else {
            image::Rgb([0, 0, 0])
        }
    })
}

/// Write a gradient JPEG of the given size.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
}

/// Write a gradient PNG of the given size.
pub fn write_png(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

// =========================================================================
// EXIF fixtures
// =========================================================================

/// Tags to embed with [`write_jpeg_with_exif`]. `None` fields are omitted.
#[derive(Debug, Clone, Default)]
pub struct ExifFixture {
    /// Raw orientation value (1-8).
    pub orientation: Option<u16>,
    /// `DateTime` text, written as-is.
    pub datetime: Option<String>,
    /// Signed decimal (latitude, longitude).
    pub location: Option<(f64, f64)>,
}

/// Write a gradient JPEG with an APP1 EXIF segment right after SOI.
pub fn write_jpeg_with_exif(path: &Path, width: u32, height: u32, fixture: &ExifFixture) {
    write_with_exif(path, &gradient(width, height), fixture);
}

/// [`write_jpeg_with_exif`] for a black image with a white top-left block.
pub fn write_marked_jpeg_with_exif(path: &Path, width: u32, height: u32, fixture: &ExifFixture) {
    write_with_exif(path, &marked(width, height), fixture);
}

fn write_with_exif(path: &Path, pixels: &RgbImage, fixture: &ExifFixture) {
    let mut jpeg = Vec::new();
    pixels
        .write_to(&mut std::io::Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "encoder did not emit SOI");

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend(build_tiff(fixture));

    let mut out = jpeg[..2].to_vec();
    out.extend([0xFF, 0xE1]);
    out.extend(((payload.len() + 2) as u16).to_be_bytes());
    out.extend(payload);
    out.extend(&jpeg[2..]);
    std::fs::write(path, out).unwrap();
}

const SHORT: u16 = 3;
const ASCII: u16 = 2;
const LONG: u16 = 4;
const RATIONAL: u16 = 5;

const TIFF_HEADER_LEN: u32 = 8;

/// One IFD entry: tag, type, count, raw big-endian value bytes.
struct Entry(u16, u16, u32, Vec<u8>);

fn ascii(text: &str) -> Entry {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    Entry(0, ASCII, bytes.len() as u32, bytes)
}

fn tagged(tag: u16, Entry(_, ty, count, bytes): Entry) -> Entry {
    Entry(tag, ty, count, bytes)
}

/// Degrees/minutes/seconds as three rationals, seconds to 1/10000.
fn dms(value: f64) -> Entry {
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = ((value - degrees) * 60.0).trunc();
    let seconds = ((value - degrees) * 60.0 - minutes) * 60.0;

    let mut bytes = Vec::new();
    for (num, den) in [
        (degrees as u32, 1u32),
        (minutes as u32, 1),
        ((seconds * 10_000.0).round() as u32, 10_000),
    ] {
        bytes.extend(num.to_be_bytes());
        bytes.extend(den.to_be_bytes());
    }
    Entry(0, RATIONAL, 3, bytes)
}

/// Serialize an IFD placed at `offset`, with out-of-line values after it.
fn serialize_ifd(entries: &[Entry], offset: u32) -> Vec<u8> {
    let table_len = 2 + 12 * entries.len() as u32 + 4;
    let mut table = (entries.len() as u16).to_be_bytes().to_vec();
    let mut data = Vec::new();

    for Entry(tag, ty, count, bytes) in entries {
        table.extend(tag.to_be_bytes());
        table.extend(ty.to_be_bytes());
        table.extend(count.to_be_bytes());
        if bytes.len() <= 4 {
            let mut inline = bytes.clone();
            inline.resize(4, 0);
            table.extend(inline);
        } else {
            let value_offset = offset + table_len + data.len() as u32;
            table.extend(value_offset.to_be_bytes());
            data.extend(bytes);
            if data.len() % 2 == 1 {
                data.push(0);
            }
        }
    }
    table.extend(0u32.to_be_bytes());
    table.extend(data);
    table
}

fn build_tiff(fixture: &ExifFixture) -> Vec<u8> {
    let mut ifd0 = Vec::new();
    if let Some(orientation) = fixture.orientation {
        ifd0.push(Entry(0x0112, SHORT, 1, orientation.to_be_bytes().to_vec()));
    }
    if let Some(datetime) = &fixture.datetime {
        ifd0.push(tagged(0x0132, ascii(datetime)));
    }

    let gps = fixture.location.map(|(lat, lon)| {
        vec![
            tagged(0x0001, ascii(if lat < 0.0 { "S" } else { "N" })),
            tagged(0x0002, dms(lat)),
            tagged(0x0003, ascii(if lon < 0.0 { "W" } else { "E" })),
            tagged(0x0004, dms(lon)),
        ]
    });
    if gps.is_some() {
        // Placeholder pointer, patched once IFD0's length is known.
        ifd0.push(Entry(0x8825, LONG, 1, vec![0; 4]));
    }

    let mut tiff = b"MM\0\x2A".to_vec();
    tiff.extend(TIFF_HEADER_LEN.to_be_bytes());

    let mut ifd0_bytes = serialize_ifd(&ifd0, TIFF_HEADER_LEN);
    if let Some(gps) = gps {
        let gps_offset = TIFF_HEADER_LEN + ifd0_bytes.len() as u32;
        if let Some(pointer) = ifd0.iter_mut().find(|e| e.0 == 0x8825) {
            pointer.3 = gps_offset.to_be_bytes().to_vec();
        }
        ifd0_bytes = serialize_ifd(&ifd0, TIFF_HEADER_LEN);
        tiff.extend(ifd0_bytes);
        tiff.extend(serialize_ifd(&gps, gps_offset));
    } else {
        tiff.extend(ifd0_bytes);
    }
    tiff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exif_fixture_is_readable_by_exif_reader() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("fixture.jpg");
        write_jpeg_with_exif(
            &path,
            16,
            8,
            &ExifFixture {
                orientation: Some(8),
                datetime: Some("2020:01:02 03:04:05".into()),
                location: Some((48.8584, -2.2945)),
            },
        );

        let file = std::fs::File::open(&path).unwrap();
        let exif = exif::Reader::new()
            .read_from_container(&mut std::io::BufReader::new(file))
            .unwrap();
        let orientation = exif
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|f| f.value.get_uint(0));
        assert_eq!(orientation, Some(8));
        assert!(
            exif.get_field(exif::Tag::GPSLongitude, exif::In::PRIMARY)
                .is_some()
        );

        // Still a decodable JPEG of the requested size.
        assert_eq!(image::image_dimensions(&path).unwrap(), (16, 8));
    }
}
