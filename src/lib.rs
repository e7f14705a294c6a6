//! # reframe
//!
//! Photo normalization: given a source image and target constraints, produce
//! an upright, size-bounded, re-encoded file, and move it wherever it needs
//! to end up, even across mount points.
//!
//! # Architecture
//!
//! ```text
//! source ─► EXIF (orientation, GPS, DateTime)
//!        ─► identify ─► scale plan (power-of-two pre-scale + residual)
//!        ─► decode ─► rotate + scale ─► encode ─► write
//!        ─► relocate (copy, then delete) ─► media index ─► cleanup
//! ```
//!
//! Every step works on an immutable [`types::ImageConfig`]. Each stage
//! returns a new config that points at the file it produced, so earlier
//! generations stay valid and cleanup is an explicit, separate step.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Scale math, EXIF reading, backend trait and the pure-Rust backend |
//! | [`pipeline`] | One-image orchestration and the serializable report |
//! | [`relocate`] | Copy-then-delete moves, relocation of a config, superseded-file cleanup |
//! | [`naming`] | Output file names: extension swap, JPEG conversion, synthesized names |
//! | [`config`] | Layered `reframe.toml` loading and validation |
//! | [`types`] | [`types::ImageConfig`] |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Lenient Writes, Strict Decodes
//!
//! A source that cannot be decoded is an error: there is nothing sensible to
//! hand back. A destination that cannot be written is not; the caller gets
//! the original file back, along with the reason, and can still use it.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, rotation, resampling and encoding use the `image` and
//! `imageproc` crates; EXIF parsing uses `kamadak-exif`. No system libraries
//! are required.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod relocate;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
