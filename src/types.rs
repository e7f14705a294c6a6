//! The image configuration carried through every pipeline stage.
//!
//! [`ImageConfig`] is an immutable value. Each `with_*` method returns a new
//! config and leaves the receiver untouched, so a stage can never observe a
//! later stage's changes through a shared reference:
//!
//! ```text
//! ImageConfig::new("IMG_0042.heic")        original = IMG_0042.heic, resized = None
//!   .with_max_width(1024)                  bounds tightened / set
//!   .with_resized_file("out/IMG_0042.jpg") resized = Some(out/IMG_0042.jpg)
//! ```

use crate::imaging::{Dimensions, Quality};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source file, optional output file, and the constraints to apply.
///
/// `max_width` / `max_height` of `0` mean "unbounded on this axis".
/// `rotation` is added on top of whatever the EXIF orientation asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub original: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resized: Option<PathBuf>,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
    pub rotation: i32,
}

impl ImageConfig {
    pub fn new(original: impl Into<PathBuf>) -> Self {
        Self {
            original: original.into(),
            resized: None,
            max_width: 0,
            max_height: 0,
            quality: Quality::default(),
            rotation: 0,
        }
    }

    pub fn with_original_file(&self, original: impl Into<PathBuf>) -> Self {
        Self {
            original: original.into(),
            ..self.clone()
        }
    }

    pub fn with_resized_file(&self, resized: impl Into<PathBuf>) -> Self {
        Self {
            resized: Some(resized.into()),
            ..self.clone()
        }
    }

    pub fn with_max_width(&self, max_width: u32) -> Self {
        Self {
            max_width,
            ..self.clone()
        }
    }

    pub fn with_max_height(&self, max_height: u32) -> Self {
        Self {
            max_height,
            ..self.clone()
        }
    }

    pub fn with_quality(&self, quality: Quality) -> Self {
        Self {
            quality,
            ..self.clone()
        }
    }

    pub fn with_rotation(&self, rotation: i32) -> Self {
        Self {
            rotation,
            ..self.clone()
        }
    }

    /// The file later stages operate on: the resized output if one exists,
    /// otherwise the original.
    pub fn working_file(&self) -> &Path {
        self.resized.as_deref().unwrap_or(&self.original)
    }

    /// Replace unset (`0`) or looser-than-source bounds with the source's own
    /// dimensions. Bounds tighter than the source are kept.
    pub fn with_bounds_tightened_to(&self, source: Dimensions) -> Self {
        let mut result = self.clone();
        if self.max_width == 0 || self.max_width > source.width {
            result = result.with_max_width(source.width);
        }
        if self.max_height == 0 || self.max_height > source.height {
            result = result.with_max_height(source.height);
        }
        result
    }

    /// Whether the source can be handed back untouched: no bound would shrink
    /// it, quality is lossless-equivalent, and no net rotation is requested.
    pub fn use_original(&self, source: Dimensions, exif_rotation: u32) -> bool {
        let width_fits = self.max_width == 0 || self.max_width >= source.width;
        let height_fits = self.max_height == 0 || self.max_height >= source.height;
        let net_rotation = (exif_rotation as i32 + self.rotation).rem_euclid(360);
        width_fits && height_fits && self.quality.value() == 100 && net_rotation == 0
    }
}
