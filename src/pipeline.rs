//! One-image normalization pipeline.
//!
//! Composes the imaging, relocation and cleanup primitives for a single
//! source file and assembles the [`NormalizeReport`] handed back to callers.
//!
//! ## Flow
//!
//! ```text
//! read EXIF ─► identify ─► nothing to do? ──yes──► keep original ─┐
//!                               │ no                                │
//!                               ▼                                   │
//!                         resize_image ─────────────────────────────┤
//!                                                                   ▼
//!                              relocate? ─► media index ─► discard superseded? ─► report
//! ```
//!
//! ## Errors
//!
//! | Failure | Effect |
//! |---|---|
//! | EXIF unreadable | warning; rotation 0, no location/timestamp |
//! | Source cannot be decoded | fatal, nothing written |
//! | Destination cannot be written | warning; the original is reported unchanged |
//! | Relocation fails | fatal; the file stays where it was |

use crate::imaging::{
    BackendError, ExifError, ImageBackend, OutputFormat, OutputSpec, get_dimensions, resize_image,
};
use crate::relocate::{RelocateError, discard_superseded, relocate};
use crate::types::ImageConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: BackendError,
    },
    #[error("EXIF metadata unavailable: {0}")]
    MetadataRead(#[from] ExifError),
    #[error("could not write output, kept original: {0}")]
    DestinationWrite(BackendError),
    #[error("relocation failed: {0}")]
    Relocation(#[from] RelocateError),
}

/// Everything besides the [`ImageConfig`] a caller decides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizeOptions {
    pub output: OutputSpec,
    /// Move the final file into this directory.
    pub relocate_to: Option<PathBuf>,
    /// Delete every referenced file except the final one.
    pub discard_superseded: bool,
}

/// Response document for one normalized image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizeReport {
    pub path: PathBuf,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    /// Encoded format, absent when the original was kept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub original_rotation: u32,
    pub is_vertical: bool,
    pub resized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discarded: Vec<PathBuf>,
}

/// Result of [`normalize`]: the final config, its report, and any
/// non-fatal problems met on the way.
#[derive(Debug)]
pub struct Normalized {
    pub config: ImageConfig,
    pub report: NormalizeReport,
    pub warnings: Vec<NormalizeError>,
}

/// Receives the final path of every normalized image.
pub trait MediaIndex {
    fn notify(&self, path: &Path);
}

/// [`MediaIndex`] that records hand-offs in the log.
pub struct LogIndex;

impl MediaIndex for LogIndex {
    fn notify(&self, path: &Path) {
        info!("Indexed {}", path.display());
    }
}

/// Normalize `config.original` according to `options`.
pub fn normalize(
    backend: &impl ImageBackend,
    index: &impl MediaIndex,
    config: &ImageConfig,
    options: &NormalizeOptions,
) -> Result<Normalized, NormalizeError> {
    let mut warnings = Vec::new();

    let mut exif = backend.read_exif(&config.original);
    if let Some(e) = exif.error.take() {
        warn!("Continuing without EXIF: {}", e);
        warnings.push(NormalizeError::MetadataRead(e));
    }

    let source =
        get_dimensions(backend, &config.original).map_err(|source| NormalizeError::Decode {
            path: config.original.clone(),
            source,
        })?;

    let mut current;
    let mut dimensions = (source.width, source.height);
    let mut format = None;
    let mut fallback_reason = None;

    if config.use_original(source, exif.rotation) {
        debug!(
            "{} already satisfies the constraints",
            config.original.display()
        );
        current = config.clone();
    } else {
        let transformed = resize_image(backend, config, source, exif.rotation, &options.output)
            .map_err(|source| NormalizeError::Decode {
                path: config.original.clone(),
                source,
            })?;
        current = transformed.config;
        if let Some(written) = transformed.written {
            dimensions = (written.width, written.height);
            format = Some(written.format);
        }
        if let Some(e) = transformed.fallback {
            fallback_reason = Some(e.to_string());
            warnings.push(NormalizeError::DestinationWrite(e));
        }
    }

    if let Some(dir) = &options.relocate_to {
        let relocated = relocate(&current, dir);
        if let Some(e) = relocated.error {
            return Err(e.into());
        }
        current = relocated.config;
    }

    index.notify(current.working_file());

    // Only the final file survives a discard.
    let discarded = if options.discard_superseded {
        discard_superseded(&current, &ImageConfig::new(current.working_file()))
    } else {
        Vec::new()
    };

    let path = current.working_file().to_path_buf();
    let report = NormalizeReport {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_size: std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
        path,
        width: dimensions.0,
        height: dimensions.1,
        format,
        latitude: exif.location.map(|l| l.latitude),
        longitude: exif.location.map(|l| l.longitude),
        timestamp: exif.timestamp,
        original_rotation: exif.rotation,
        is_vertical: exif.is_vertical,
        resized: current.resized.is_some(),
        fallback_reason,
        discarded,
    };

    Ok(Normalized {
        config: current,
        report,
        warnings,
    })
}
