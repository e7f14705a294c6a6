//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader`, format sniffed from content |
//! | Pre-scale, JPEG | `jpeg_decoder::Decoder::scale` (IDCT scaling, 1/2 to 1/8) |
//! | Pre-scale, other formats | full decode, then `resize_exact` with `Triangle` |
//! | Rotate 90/180/270 | `DynamicImage::rotate90` / `rotate180` / `rotate270` |
//! | Residual scale | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Rotate other angles | `imageproc::geometric_transformations::warp_into` (bilinear) |
//! | Encode → PNG | `DynamicImage::write_to` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the requested quality |
//! | EXIF | [`metadata::read_exif`](super::metadata::read_exif) (`kamadak-exif`) |
//!
//! ## Pre-scaled decoding
//!
//! JPEG sources are decoded straight at 1/2, 1/4 or 1/8 size, so a large
//! photo never exists in memory at full resolution. Factors beyond 8 finish
//! with a `Triangle` reduction of the 1/8 bitmap. PNG, TIFF and WebP have no
//! reduced decode: the full bitmap is decoded, reduced, and dropped right
//! away, so for those formats the pre-scale only bounds the memory of the
//! later rotate and resample steps.
//!
//! The output size is always measured from the full source size (see
//! [`TransformParams::output_extent`]), so decoder rounding never changes it.

use super::backend::{BackendError, Dimensions, EncodedImage, ImageBackend};
use super::calculations::{TransformExtent, calculate_decoded_dimensions, is_right_angle};
use super::metadata::{self, ExifResult};
use super::params::{OutputFormat, Quality, TransformParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{
    DynamicImage, ExtendedColorType, GrayImage, ImageEncoder, ImageFormat, ImageReader, RgbImage,
    Rgba,
};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use jpeg_decoder::PixelFormat;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tracing::debug;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn open_reader(path: &Path) -> Result<ImageReader<BufReader<File>>, BackendError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?)
}

fn decode_error(path: &Path, e: impl std::fmt::Display) -> BackendError {
    BackendError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    open_reader(path)?
        .decode()
        .map_err(|e| decode_error(path, e))
}

/// Decode `path`, whose full size is `source`, reduced by `factor` on each axis.
///
/// JPEG goes through the scaled decoder; everything else, and any JPEG the
/// scaled decoder rejects, is fully decoded and then reduced. The full-size
/// bitmap only lives inside this function.
fn decode_prescaled(
    path: &Path,
    source: Dimensions,
    factor: u32,
) -> Result<DynamicImage, BackendError> {
    if factor <= 1 {
        return load_image(path);
    }

    let target = calculate_decoded_dimensions(source.as_tuple(), factor);
    let reader = open_reader(path)?;
    let scaled = match reader.format() {
        Some(ImageFormat::Jpeg) => decode_jpeg_scaled(path, target),
        _ => None,
    };
    let img = match scaled {
        Some(img) => img,
        None => reader.decode().map_err(|e| decode_error(path, e))?,
    };

    if (img.width(), img.height()) == target {
        return Ok(img);
    }
    debug!(
        "Pre-scaled {} by {}: {}x{} -> {}x{}",
        path.display(),
        factor,
        img.width(),
        img.height(),
        target.0,
        target.1
    );
    Ok(img.resize_exact(target.0, target.1, FilterType::Triangle))
}

/// Decode a JPEG at the smallest IDCT scale that still covers `target`.
///
/// Returns `None` when the scaled decoder cannot handle the file (CMYK,
/// 16-bit, corrupt data); the caller then takes the full decode path.
fn decode_jpeg_scaled(path: &Path, target: (u32, u32)) -> Option<DynamicImage> {
    let file = File::open(path).ok()?;
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));

    let request = |v: u32| u16::try_from(v).unwrap_or(u16::MAX);
    let (width, height) = match decoder.scale(request(target.0), request(target.1)) {
        Ok(size) => size,
        Err(e) => {
            debug!("Scaled decode unavailable for {}: {}", path.display(), e);
            return None;
        }
    };
    let pixels = match decoder.decode() {
        Ok(pixels) => pixels,
        Err(e) => {
            debug!("Scaled decode failed for {}: {}", path.display(), e);
            return None;
        }
    };

    let (width, height) = (u32::from(width), u32::from(height));
    match decoder.info()?.pixel_format {
        PixelFormat::RGB24 => {
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        PixelFormat::L8 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        _ => None,
    }
}

/// Rotate clockwise by `rotation` degrees, then scale uniformly by `scale`
/// into exactly `extent`.
fn apply_transform(
    img: DynamicImage,
    rotation: i32,
    scale: f64,
    extent: TransformExtent,
) -> DynamicImage {
    if !is_right_angle(rotation) {
        return warp_arbitrary(&img, rotation, scale, extent);
    }

    let rotated = match rotation.rem_euclid(360) {
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => img,
    };

    if (rotated.width(), rotated.height()) == (extent.width, extent.height) {
        rotated
    } else {
        rotated.resize_exact(extent.width, extent.height, FilterType::Lanczos3)
    }
}

/// Affine warp for angles that are not a multiple of 90°.
///
/// Corners uncovered by the rotated source stay transparent.
fn warp_arbitrary(
    img: &DynamicImage,
    rotation: i32,
    scale: f64,
    extent: TransformExtent,
) -> DynamicImage {
    let source = img.to_rgba8();
    let projection = Projection::rotate((rotation.rem_euclid(360) as f32).to_radians())
        .and_then(Projection::scale(scale as f32, scale as f32))
        .and_then(Projection::translate(extent.offset_x, extent.offset_y));

    let mut out = image::RgbaImage::new(extent.width, extent.height);
    warp_into(
        &source,
        &projection,
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
        &mut out,
    );
    DynamicImage::ImageRgba8(out)
}

/// Encode to memory. JPEG drops alpha; quality 0 is sent as the encoder's minimum.
fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let mut bytes = Vec::new();
    let result = match format {
        OutputFormat::Png => img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png),
        OutputFormat::Jpeg => {
            let rgb = img.to_rgb8();
            let q = quality.value().clamp(1, 100) as u8;
            JpegEncoder::new_with_quality(&mut bytes, q).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
        }
    };
    result.map_err(|e| BackendError::Encode(e.to_string()))?;
    Ok(bytes)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = open_reader(path)?
            .into_dimensions()
            .map_err(|e| decode_error(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn read_exif(&self, path: &Path) -> ExifResult {
        metadata::read_exif(path)
    }

    fn transform(&self, params: &TransformParams) -> Result<EncodedImage, BackendError> {
        let transformed = {
            let decoded =
                decode_prescaled(&params.source, params.source_size, params.pre_scale_factor)?;
            apply_transform(decoded, params.rotation, params.scale, params.output_extent())
        };
        let (width, height) = (transformed.width(), transformed.height());
        let encoded = encode(&transformed, params.format, params.quality);
        drop(transformed);

        Ok(EncodedImage {
            bytes: encoded?,
            width,
            height,
            format: params.format,
        })
    }
}
