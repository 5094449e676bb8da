use std::fs;
use std::io;

use crate::error::{Error, Result};
use crate::paths::{sibling_path, PathResolver, ResolvedPath};
use crate::profiles::{staged_profile_paths, ProfileStore};
use crate::vcs::StagingSet;

/// Result of renaming a primary file on the local tree.
#[derive(Debug, Clone)]
pub struct RenamedFile {
    pub source: ResolvedPath,
    pub target: ResolvedPath,
    /// Old and new primary paths, plus old and new path of every profile
    /// found in the target's sidecar after the move.
    pub staged: StagingSet,
}

/// Moves a primary file together with its profiles sidecar directory.
pub struct RenameCoordinator<'a> {
    resolver: &'a PathResolver,
    profiles: ProfileStore<'a>,
}

impl<'a> RenameCoordinator<'a> {
    pub fn new(resolver: &'a PathResolver, profiles: ProfileStore<'a>) -> Self {
        Self { resolver, profiles }
    }

    /// Rename the file at `path` to `new_name`, which is relative to the
    /// file's own directory.
    ///
    /// The primary file must move; the sidecar move is best effort. The
    /// staged set is built from a fresh read of the *target* sidecar.
    ///
    /// # Errors
    /// - [`Error::OutsideRoot`] if either path escapes the root.
    /// - [`Error::NotFound`] if the source does not exist.
    /// - [`Error::AlreadyExists`] if the target exists.
    /// - [`Error::Io`] if the primary rename fails. Nothing is staged then.
    pub fn rename(&self, path: &str, new_name: &str) -> Result<RenamedFile> {
        if new_name.trim_matches('/').is_empty() {
            return Err(Error::invalid_path("new name must not be empty"));
        }

        let source = self.resolver.resolve_entry(path)?;
        let target = self
            .resolver
            .resolve_entry(&sibling_path(&source.rel, new_name))?;

        let meta = fs::metadata(&source.real).map_err(|e| Error::lookup(&source.rel, e))?;
        if meta.is_dir() {
            return Err(Error::invalid_path(format!(
                "{} is a directory; use renamedir",
                source.rel
            )));
        }
        if fs::symlink_metadata(&target.real).is_ok() {
            return Err(Error::already_exists(target.rel));
        }

        fs::rename(&source.real, &target.real).map_err(|e| {
            log::warn!("unable to rename {} to {}: {}", source.rel, target.rel, e);
            Error::io(&source.real, e)
        })?;

        let (old_sidecar, new_sidecar) = (source.sidecar_real(), target.sidecar_real());
        if let Err(e) = fs::rename(&old_sidecar, &new_sidecar) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!(
                    "unable to move profiles {} to {}: {}",
                    old_sidecar.display(),
                    new_sidecar.display(),
                    e
                );
            }
        }

        let mut staged = StagingSet::new();
        staged.push(target.rel.clone());
        staged.push(source.rel.clone());
        for name in self.profiles.entry_names(&target) {
            let pair = [name];
            staged.extend(staged_profile_paths(&source.rel, &pair));
            staged.extend(staged_profile_paths(&target.rel, &pair));
        }

        Ok(RenamedFile {
            source,
            target,
            staged,
        })
    }
}
