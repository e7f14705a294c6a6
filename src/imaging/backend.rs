//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, read_exif, and transform.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! and `imageproc` crates.

use super::metadata::ExifResult;
use super::params::{OutputFormat, TransformParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// An encoded output image, held in memory until it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

/// Trait for image processing backends.
///
/// `transform` owns every pixel buffer it creates. Both the decoded and the
/// transformed bitmap are gone by the time it returns, whatever the outcome;
/// only the encoded bytes leave the backend.
pub trait ImageBackend: Sync {
    /// Get image dimensions without decoding pixels.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Read orientation, location, and timestamp. Never fails; problems are
    /// carried in [`ExifResult::error`].
    fn read_exif(&self, path: &Path) -> ExifResult;

    /// Decode, rotate + scale, and encode to memory.
    fn transform(&self, params: &TransformParams) -> Result<EncodedImage, BackendError>;
}
