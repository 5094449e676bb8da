use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::exclude::ExcludeFilter;
use crate::types::{Attributes, DirEntry, EntryKind, PROFILES_SUFFIX};

/// Size and modification time of `path`; `label` names it in errors.
pub fn attributes(path: &Path, label: &str) -> Result<Attributes> {
    let meta = fs::metadata(path).map_err(|e| Error::lookup(label, e))?;
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    Ok(Attributes {
        size: meta.len(),
        mtime: mtime.unix_seconds(),
    })
}

/// Enumerates directory entries, hiding excluded names and profile sidecars.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLister {
    filter: ExcludeFilter,
}

impl DirectoryLister {
    pub fn new(filter: ExcludeFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &ExcludeFilter {
        &self.filter
    }

    /// List an ordinary directory, sorted by name.
    ///
    /// Entries matching the exclusion filter and directories ending in
    /// `.profiles` are left out. `label` names the directory in errors.
    ///
    /// # Errors
    /// [`Error::NotFound`] if `dir` is absent, [`Error::NotADirectory`] if it
    /// is a file.
    pub fn list(&self, dir: &Path, label: &str) -> Result<Vec<DirEntry>> {
        self.scan(dir, label, true)
    }

    /// List a profiles sidecar directory. Same as [`list`](Self::list) except
    /// that nested `.profiles` names are not treated specially.
    pub fn list_profiles(&self, dir: &Path, label: &str) -> Result<Vec<DirEntry>> {
        self.scan(dir, label, false)
    }

    fn scan(&self, dir: &Path, label: &str, hide_sidecars: bool) -> Result<Vec<DirEntry>> {
        let meta = fs::metadata(dir).map_err(|e| Error::lookup(label, e))?;
        if !meta.is_dir() {
            return Err(Error::not_a_directory(label));
        }

        let mut out = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();

            // Follows symlinks; dangling links are skipped.
            let kind = match fs::metadata(entry.path()) {
                Ok(m) if m.is_file() => EntryKind::File,
                Ok(m) if m.is_dir() => EntryKind::Directory,
                _ => continue,
            };

            if self.filter.is_excluded(&name, kind.is_dir()) {
                continue;
            }
            if hide_sidecars && kind.is_dir() && name.ends_with(PROFILES_SUFFIX) {
                continue;
            }
            out.push(DirEntry::new(name, kind));
        }

        out.sort();
        Ok(out)
    }
}
