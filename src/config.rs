//! Options file handling.
//!
//! Handles loading, validating, and merging `reframe.toml`. Options are
//! layered: stock defaults, then the options file, then command-line flags.
//! Each layer is a sparse TOML table merged onto the previous one:
//!
//! ```text
//! stock defaults  ─►  reframe.toml  ─►  --max-width 1024 --quality 80 ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [image]
//! max_width = 0             # 0 = unbounded
//! max_height = 0            # 0 = unbounded
//! quality = 100             # 0-100; 100 with no resize keeps the original
//! rotation = 0              # degrees, added to the EXIF orientation
//!
//! [output]
//! directory = "reframed"    # where re-encoded files are written
//! extension = ""            # empty = keep the source extension
//! convert_to_jpg = []       # extensions written as .jpg instead
//! # filename = "cover.jpg"  # explicit output name
//! # relocate_to = "DCIM"    # move the result here afterwards
//! discard_superseded = false
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{OutputSpec, Quality};
use crate::naming::extension_of;
use crate::pipeline::NormalizeOptions;
use crate::types::ImageConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "reframe.toml";

/// Extension used when neither the options nor the source name provide one.
const FALLBACK_EXTENSION: &str = "jpg";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Options loaded from `reframe.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReframeConfig {
    /// Bounds, quality and rotation applied to the source.
    pub image: ImageOptions,
    /// Where and how the result is written.
    pub output: OutputOptions,
}

/// `[image]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u32,
    pub rotation: i32,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            max_width: 0,
            max_height: 0,
            quality: 100,
            rotation: 0,
        }
    }
}

/// `[output]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputOptions {
    pub directory: PathBuf,
    /// Destination extension. Empty keeps the source's.
    pub extension: String,
    pub convert_to_jpg: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relocate_to: Option<PathBuf>,
    pub discard_superseded: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("reframed"),
            extension: String::new(),
            convert_to_jpg: Vec::new(),
            filename: None,
            relocate_to: None,
            discard_superseded: false,
        }
    }
}

impl ReframeConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image.quality > 100 {
            return Err(ConfigError::Validation("image.quality must be 0-100".into()));
        }
        if self.output.directory.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output.directory must not be empty".into(),
            ));
        }
        if self.output.extension.contains(['.', '/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "output.extension must be a bare extension, got {:?}",
                self.output.extension
            )));
        }
        if let Some(name) = self
            .output
            .filename
            .as_deref()
            .filter(|n| n.contains(['/', '\\']))
        {
            return Err(ConfigError::Validation(format!(
                "output.filename must not contain a path separator, got {name:?}"
            )));
        }
        Ok(())
    }

    /// Build the starting [`ImageConfig`] for `source`.
    pub fn image_config(&self, source: &Path) -> ImageConfig {
        ImageConfig::new(source)
            .with_max_width(self.image.max_width)
            .with_max_height(self.image.max_height)
            .with_quality(Quality::new(self.image.quality))
            .with_rotation(self.image.rotation)
    }

    /// Build the [`NormalizeOptions`] for `source`.
    ///
    /// An empty `output.extension` takes the source's own extension.
    pub fn normalize_options(&self, source: &Path) -> NormalizeOptions {
        let extension = match self.output.extension.trim() {
            "" => source
                .file_name()
                .and_then(|n| n.to_str())
                .map(extension_of)
                .filter(|ext| !ext.is_empty())
                .unwrap_or_else(|| FALLBACK_EXTENSION.to_string()),
            ext => ext.to_lowercase(),
        };

        NormalizeOptions {
            output: OutputSpec {
                directory: self.output.directory.clone(),
                extension,
                convert_to_jpg: self
                    .output
                    .convert_to_jpg
                    .iter()
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect(),
                filename: self.output.filename.clone(),
            },
            relocate_to: self.output.relocate_to.clone(),
            discard_superseded: self.output.discard_superseded,
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ReframeConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read an options file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge `layers` in order onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(
    layers: impl IntoIterator<Item = toml::Value>,
) -> Result<ReframeConfig, ConfigError> {
    let merged = layers
        .into_iter()
        .fold(stock_defaults_value(), merge_toml);
    let config: ReframeConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// The options-file layer.
///
/// An `explicit` path must exist. Without one, [`DEFAULT_CONFIG_FILE`] in
/// the working directory is used if present.
pub fn load_config_layer(explicit: Option<&Path>) -> Result<Option<toml::Value>, ConfigError> {
    match explicit {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Ok(Some(toml::from_str(&content)?))
        }
        None => load_raw_config(Path::new(DEFAULT_CONFIG_FILE)),
    }
}

/// Returns a fully-commented stock `reframe.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# reframe Configuration
# =====================
#
# All settings are optional. Remove or comment out anything you don't need.
# Values shown below are the defaults.
#
# Command-line flags override values in this file.
# Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Source constraints
# ---------------------------------------------------------------------------
[image]
# Bounding box for the output. 0 leaves that axis unbounded. The image is
# scaled down uniformly until it fits; it is never scaled up.
max_width = 0
max_height = 0

# Re-encode quality (0-100). At 100, with no resize and no net rotation,
# the source file is used as-is and nothing is written.
quality = 100

# Extra clockwise rotation in degrees, added to the EXIF orientation.
rotation = 0

# ---------------------------------------------------------------------------
# Output placement
# ---------------------------------------------------------------------------
[output]
# Directory for re-encoded files (created if missing).
directory = "reframed"

# Destination extension. "png" writes PNG, anything else writes JPEG.
# Empty keeps the source file's extension.
extension = ""

# Extensions that are always written with a .jpg name instead.
convert_to_jpg = []

# Explicit output file name. When unset, the source name is reused with the
# extension swapped.
# filename = "cover.jpg"

# Move the final file into this directory after writing. Works across
# mount points.
# relocate_to = "DCIM"

# Delete the files the final result no longer references (the source after
# a resize, or the intermediate file after a relocation).
discard_superseded = false
"##
}
