//! Backup-then-overwrite replacement of a single file's content.
//!
//! If the target exists it is first renamed to `<path>.backup`; the new
//! content is then written in place. On success the backup is removed
//! (best effort), on failure it is renamed back so the previous content
//! survives a synchronous write error.
//!
//! This does not protect against a crash mid-write: there is no fsync and
//! no write-to-temp-then-rename. Callers must not assume crash durability.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths::with_suffix;
use crate::types::BACKUP_SUFFIX;

/// Whether a write created a new file or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
}

impl WriteOutcome {
    /// Verb used in commit messages.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Created => "Added",
            Self::Updated => "Updated",
        }
    }
}

/// Replace the content of `path` with `content`.
pub fn write(path: &Path, content: &[u8]) -> Result<WriteOutcome> {
    write_with(path, |f| f.write_all(content))
}

/// Replace the content of `path` with whatever `fill` writes into it.
///
/// # Errors
/// Returns [`Error::Io`] if the backup rename or `fill` fails. When `fill`
/// fails, the previous content has been restored (or, for a new file, the
/// partial file removed) before the error is returned.
pub fn write_with<F>(path: &Path, fill: F) -> Result<WriteOutcome>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let existed = match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {
            return Err(Error::io(
                path,
                io::Error::new(io::ErrorKind::Other, "is a directory"),
            ));
        }
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => return Err(Error::io(path, e)),
    };

    let backup = with_suffix(path, BACKUP_SUFFIX);
    if existed {
        fs::rename(path, &backup).map_err(|e| Error::io(path, e))?;
    }

    match File::create(path).and_then(|mut f| fill(&mut f)) {
        Ok(()) => {
            if existed {
                if let Err(e) = fs::remove_file(&backup) {
                    log::warn!("unable to remove backup {}: {}", backup.display(), e);
                }
                Ok(WriteOutcome::Updated)
            } else {
                Ok(WriteOutcome::Created)
            }
        }
        Err(e) => {
            log::warn!("unable to write content to {}: {}", path.display(), e);
            if existed {
                if let Err(re) = fs::rename(&backup, path) {
                    log::error!(
                        "unable to restore {} from {}: {}",
                        path.display(),
                        backup.display(),
                        re
                    );
                }
            } else {
                let _ = fs::remove_file(path);
            }
            Err(Error::io(path, e))
        }
    }
}

/// Create the missing parent directories of `path`, then run `f`.
///
/// If `f` fails, the directories created here are removed again (deepest
/// first, only while empty, best effort) before the error is returned.
pub fn with_created_parents<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let mut created = Vec::new();
    let mut dir = path.parent();
    while let Some(d) = dir {
        if d.as_os_str().is_empty() || fs::symlink_metadata(d).is_ok() {
            break;
        }
        created.push(d.to_path_buf());
        dir = d.parent();
    }
    if let Some(top) = created.first() {
        fs::create_dir_all(top).map_err(|e| Error::io(top, e))?;
    }

    f().map_err(|e| {
        for d in &created {
            if let Err(re) = fs::remove_dir(d) {
                log::warn!("unable to remove directory {}: {}", d.display(), re);
                break;
            }
        }
        e
    })
}
