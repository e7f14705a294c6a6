//! Moving files across filesystem boundaries.
//!
//! `rename(2)` fails across mount points, so a move here is always a full
//! content copy followed by deletion of the source:
//!
//! ```text
//! open source ─► create dest ─► copy all bytes ─► verify count ─► sync ─► delete source
//!      │              │                │                │            │
//!      └──────────────┴────────────────┴────────────────┴────────────┴─► error: source intact, partial dest removed
//! ```
//!
//! The source is only deleted once the destination holds every byte and has
//! been synced to disk, so a crash mid-move leaves at least one copy. If that
//! final delete fails the move still counts as done (the copy is complete and
//! callers follow it), and the leftover is logged.

use crate::types::ImageConfig;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("cannot open source {path}: {source}")]
    OpenSource { path: PathBuf, source: io::Error },
    #[error("cannot create destination {path}: {source}")]
    CreateDestination { path: PathBuf, source: io::Error },
    #[error("copy to {path} failed: {source}")]
    Transfer { path: PathBuf, source: io::Error },
    #[error("incomplete copy to {path}: {copied} of {expected} bytes")]
    Incomplete {
        path: PathBuf,
        copied: u64,
        expected: u64,
    },
    #[error("{0} has no file name")]
    NoFileName(PathBuf),
}

/// Outcome of [`relocate`]. On error `config` is the input, unchanged.
#[derive(Debug)]
pub struct RelocationResult {
    pub config: ImageConfig,
    pub error: Option<RelocateError>,
}

/// Destination writers that can push their contents to stable storage.
trait Persist: Write {
    fn persist(&self) -> io::Result<()>;
}

impl Persist for File {
    fn persist(&self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Writer that flushes when dropped, logging instead of failing.
struct FlushOnDrop<W: Write> {
    inner: W,
    path: PathBuf,
}

impl<W: Write> Write for FlushOnDrop<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Drop for FlushOnDrop<W> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.flush() {
            warn!("Closing {} failed: {}", self.path.display(), e);
        }
    }
}

/// Move `from` to `to` by copy-then-delete. Parent directories of `to` are
/// created as needed.
pub fn move_file(from: &Path, to: &Path) -> Result<(), RelocateError> {
    move_via(from, to, |path| File::create(path))
}

/// [`move_file`] with the destination writer supplied by `open_dest`.
fn move_via<W, F>(from: &Path, to: &Path, open_dest: F) -> Result<(), RelocateError>
where
    W: Persist,
    F: FnOnce(&Path) -> io::Result<W>,
{
    if is_same_file(from, to) {
        debug!("{} is already in place", from.display());
        return Ok(());
    }

    let source = File::open(from).map_err(|source| RelocateError::OpenSource {
        path: from.to_path_buf(),
        source,
    })?;
    let expected = source
        .metadata()
        .map_err(|source| RelocateError::OpenSource {
            path: from.to_path_buf(),
            source,
        })?
        .len();

    let create_error = |source| RelocateError::CreateDestination {
        path: to.to_path_buf(),
        source,
    };
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(create_error)?;
    }
    let mut dest = FlushOnDrop {
        inner: open_dest(to).map_err(create_error)?,
        path: to.to_path_buf(),
    };

    let copied = transfer(BufReader::new(source), &mut dest, expected, to).and_then(|()| {
        dest.inner
            .persist()
            .map_err(|source| RelocateError::Transfer {
                path: to.to_path_buf(),
                source,
            })
    });
    drop(dest);
    if let Err(e) = copied {
        match fs::remove_file(to) {
            Err(cleanup) if cleanup.kind() != io::ErrorKind::NotFound => {
                warn!("Could not remove partial {}: {}", to.display(), cleanup);
            }
            _ => {}
        }
        return Err(e);
    }

    if let Err(e) = fs::remove_file(from) {
        warn!(
            "Copied {} to {} but could not delete the source: {}",
            from.display(),
            to.display(),
            e
        );
    }
    info!("Moved {} -> {} ({} bytes)", from.display(), to.display(), expected);
    Ok(())
}

/// Copy everything from `reader` to `writer` and flush. Fails unless exactly
/// `expected` bytes went through.
fn transfer<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    expected: u64,
    dest: &Path,
) -> Result<(), RelocateError> {
    let transfer_error = |source| RelocateError::Transfer {
        path: dest.to_path_buf(),
        source,
    };
    let copied = io::copy(&mut reader, &mut writer).map_err(transfer_error)?;
    writer.flush().map_err(transfer_error)?;

    if copied != expected {
        return Err(RelocateError::Incomplete {
            path: dest.to_path_buf(),
            copied,
            expected,
        });
    }
    Ok(())
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Move the config's working file into `dest_dir`, keeping its file name.
///
/// Exactly one reference changes: `resized` if it was set, else `original`.
pub fn relocate(config: &ImageConfig, dest_dir: &Path) -> RelocationResult {
    let from = config.working_file();
    let Some(name) = from.file_name() else {
        return RelocationResult {
            config: config.clone(),
            error: Some(RelocateError::NoFileName(from.to_path_buf())),
        };
    };
    let to = dest_dir.join(name);

    match move_file(from, &to) {
        Ok(()) => {
            let config = if config.resized.is_some() {
                config.with_resized_file(&to)
            } else {
                config.with_original_file(&to)
            };
            RelocationResult {
                config,
                error: None,
            }
        }
        Err(e) => {
            warn!("Relocation of {} failed: {}", from.display(), e);
            RelocationResult {
                config: config.clone(),
                error: Some(e),
            }
        }
    }
}

/// Delete the files `previous` references that `current` no longer does.
///
/// Missing files are ignored. Returns the paths actually removed.
pub fn discard_superseded(previous: &ImageConfig, current: &ImageConfig) -> Vec<PathBuf> {
    let still_used = |path: &Path| {
        path == current.original || current.resized.as_deref() == Some(path)
    };

    std::iter::once(previous.original.as_path())
        .chain(previous.resized.as_deref())
        .filter(|path| !still_used(path))
        .filter_map(|path| remove_if_present(path).then(|| path.to_path_buf()))
        .collect()
}

fn remove_if_present(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Could not remove {}: {}", path.display(), e);
            false
        }
    }
}
