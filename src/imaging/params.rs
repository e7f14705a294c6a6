//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what output to produce) and the [`backend`](super::backend)
//! (which does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Re-encode quality (0–100, default 100). Clamped on construction.
//! - [`OutputFormat`]: PNG or JPEG, chosen from the destination extension.
//! - [`TransformParams`]: Everything needed for one decode → transform → encode pass.
//! - [`OutputSpec`]: Where and under which name the encoded bytes land.

use super::backend::Dimensions;
use super::calculations::{TransformExtent, calculate_transform_extent};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Quality setting for re-encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Encoded output format.
///
/// `png` is the only lossless target; every other destination extension is
/// written as JPEG at the configured quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn from_extension(extension: &str) -> Self {
        if extension.eq_ignore_ascii_case("png") {
            Self::Png
        } else {
            Self::Jpeg
        }
    }
}

/// Parameters for a single decode → rotate/scale → encode pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    pub source: PathBuf,
    /// Full-resolution size of `source`, as identified before decoding.
    pub source_size: Dimensions,
    /// Power-of-two reduction applied while decoding.
    pub pre_scale_factor: u32,
    /// Degrees, EXIF rotation plus the caller's explicit delta. Not normalized.
    pub rotation: i32,
    /// Uniform scale applied to the pre-scaled bitmap.
    pub scale: f64,
    pub format: OutputFormat,
    pub quality: Quality,
}

impl TransformParams {
    /// Scale from source pixels to output pixels.
    pub fn residual_scale(&self) -> f64 {
        self.scale / self.pre_scale_factor.max(1) as f64
    }

    /// Size of the encoded output.
    ///
    /// Measured from `source_size`, never from the pre-scaled bitmap, so the
    /// result stays within the bounds the scale was computed for whatever
    /// rounding the decoder applied.
    pub fn output_extent(&self) -> TransformExtent {
        calculate_transform_extent(
            self.source_size.as_tuple(),
            self.rotation,
            self.residual_scale(),
        )
    }
}

/// Destination naming and placement for an encoded image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputSpec {
    /// Directory the output is written into (created if missing).
    pub directory: PathBuf,
    /// Lowercase destination extension, e.g. `jpg` or `png`.
    pub extension: String,
    /// Extensions rewritten to `jpg` when naming the output file.
    pub convert_to_jpg: Vec<String>,
    /// Explicit output filename; derived from the source name when absent.
    pub filename: Option<String>,
}
