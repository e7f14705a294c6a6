//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take an [`ImageConfig`], compute parameters, call the backend, and
//! write the result.
//!
//! ## Write failures
//!
//! Decoding problems abort the operation. Failing to create or write the
//! destination file does not: the caller gets the *unmodified* input config
//! back, as if no resize had been requested, with the swallowed error in
//! [`Transformed::fallback`].
//!
//! Only a file this call created is removed after a failed write. The
//! source itself is never a destination: when the derived name would land
//! on it, a synthesized `image-<uuid>.<ext>` name is used instead.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_scale;
use super::params::{OutputFormat, OutputSpec, TransformParams};
use crate::naming::{output_file_name, resolve_extension, synthesize_file_name};
use crate::types::ImageConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<Dimensions> {
    backend.identify(path)
}

/// The file a successful transform produced.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub size: u64,
}

/// Outcome of [`resize_image`].
#[derive(Debug)]
pub struct Transformed {
    /// Config with `resized` set, or the unmodified input on fallback.
    pub config: ImageConfig,
    pub written: Option<WrittenImage>,
    /// Why the output could not be written, when the fallback was taken.
    pub fallback: Option<BackendError>,
}

/// Plan a transform without executing it.
///
/// Returns the config with bounds tightened to the source, and the backend
/// parameters. The rotation is the raw sum of EXIF and explicit rotation.
pub fn plan_transform(
    config: &ImageConfig,
    source: Dimensions,
    exif_rotation: u32,
    format: OutputFormat,
) -> (ImageConfig, TransformParams) {
    let scale = calculate_scale(source.as_tuple(), (config.max_width, config.max_height));
    let tightened = config.with_bounds_tightened_to(source);

    let params = TransformParams {
        source: config.original.clone(),
        source_size: source,
        pre_scale_factor: scale.pre_scale_factor,
        rotation: exif_rotation as i32 + config.rotation,
        scale: scale.transform_scale(),
        format,
        quality: config.quality,
    };
    (tightened, params)
}

/// Resize, rotate, and re-encode `config.original` into `output.directory`.
///
/// See the [module docs](self) for the write-failure policy.
pub fn resize_image(
    backend: &impl ImageBackend,
    config: &ImageConfig,
    source: Dimensions,
    exif_rotation: u32,
    output: &OutputSpec,
) -> Result<Transformed> {
    let extension = resolve_extension(&output.extension, &output.convert_to_jpg);
    let format = OutputFormat::from_extension(&extension);
    let (tightened, params) = plan_transform(config, source, exif_rotation, format);

    debug!(
        "Transform {}: pre-scale {} scale {:.4} rotation {} -> {:?}",
        params.source.display(),
        params.pre_scale_factor,
        params.scale,
        params.rotation,
        format
    );
    let encoded = backend.transform(&params)?;

    let filename = output_file_name(
        &config.original,
        output.filename.as_deref(),
        &output.extension,
        &output.convert_to_jpg,
    );
    let mut path = output.directory.join(filename);
    if overwrites(&path, &config.original) {
        let renamed = output.directory.join(synthesize_file_name(&extension));
        info!(
            "{} is the source image; writing {} instead",
            path.display(),
            renamed.display()
        );
        path = renamed;
    }

    match write_output(&path, &encoded.bytes) {
        Ok(()) => Ok(Transformed {
            config: tightened.with_resized_file(&path),
            written: Some(WrittenImage {
                path,
                width: encoded.width,
                height: encoded.height,
                format: encoded.format,
                size: encoded.bytes.len() as u64,
            }),
            fallback: None,
        }),
        Err(e) => {
            warn!(
                "Could not write {}: {}; keeping original {}",
                path.display(),
                e,
                config.original.display()
            );
            Ok(Transformed {
                config: config.clone(),
                written: None,
                fallback: Some(e),
            })
        }
    }
}

/// Whether writing `path` would replace `original`.
fn overwrites(path: &Path, original: &Path) -> bool {
    match (fs::canonicalize(path), fs::canonicalize(original)) {
        (Ok(a), Ok(b)) => a == b,
        _ => path == original,
    }
}

/// Create parent directories and write `bytes` to `path`.
fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    write_via(path, bytes, |path, bytes| fs::write(path, bytes))
}

/// [`write_output`] with the file write supplied by `write`.
///
/// On failure a file that did not exist beforehand is removed; an existing
/// one is left alone.
fn write_via<F>(path: &Path, bytes: &[u8], write: F) -> Result<()>
where
    F: FnOnce(&Path, &[u8]) -> io::Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let existed = path.exists();
    if let Err(e) = write(path, bytes) {
        if !existed {
            match fs::remove_file(path) {
                Err(cleanup) if cleanup.kind() != io::ErrorKind::NotFound => {
                    warn!("Could not remove partial {}: {}", path.display(), cleanup);
                }
                _ => {}
            }
        }
        return Err(e.into());
    }
    Ok(())
}
