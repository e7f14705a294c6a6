//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **EXIF** | `kamadak-exif` (orientation, GPS, `DateTime`) |
//! | **Pre-scale** | `jpeg-decoder` scaled decode for JPEG, box reduction otherwise |
//! | **Rotate + scale** | `image` right-angle rotations + Lanczos3, `imageproc` warp otherwise |
//! | **Encode** | PNG, or JPEG at the configured quality |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for scale and extent math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Metadata**: EXIF orientation / location / timestamp normalization
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod metadata;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, EncodedImage, ImageBackend};
pub use calculations::{
    ScaleResult, TransformExtent, calculate_decoded_dimensions, calculate_scale,
    calculate_transform_extent,
};
pub use metadata::{ExifError, ExifResult, GeoLocation, normalize_orientation, read_exif};
pub use operations::{Transformed, WrittenImage, get_dimensions, plan_transform, resize_image};
pub use params::{OutputFormat, OutputSpec, Quality, TransformParams};
pub use rust_backend::RustBackend;
