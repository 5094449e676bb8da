//! Profiles: named sidecar artifacts stored in `<file>.profiles/<name>`.
//!
//! The sidecar directory is created lazily by the first profile write.

use std::fs;

use crate::error::{Error, Result};
use crate::listing::{self, DirectoryLister};
use crate::paths::{PathResolver, ResolvedPath};
use crate::types::{Attributes, DirEntry};
use crate::writer::{self, WriteOutcome};

/// A profile after a successful write.
#[derive(Debug, Clone)]
pub struct WrittenProfile {
    pub primary: ResolvedPath,
    pub profile: ResolvedPath,
    pub outcome: WriteOutcome,
}

/// Local operations on the profiles of primary files.
///
/// Borrows the backend's resolver and lister; performs no version control.
#[derive(Debug, Clone, Copy)]
pub struct ProfileStore<'a> {
    resolver: &'a PathResolver,
    lister: &'a DirectoryLister,
}

impl<'a> ProfileStore<'a> {
    pub fn new(resolver: &'a PathResolver, lister: &'a DirectoryLister) -> Self {
        Self { resolver, lister }
    }

    /// List the profiles of the file at `path`.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the sidecar directory is absent or unreadable.
    pub fn list(&self, path: &str) -> Result<Vec<DirEntry>> {
        let primary = self.resolver.resolve_entry(path)?;
        let label = primary.sidecar_rel();
        self.lister
            .list_profiles(&primary.sidecar_real(), &label)
            .map_err(|e| match e {
                Error::Io(_) | Error::NotADirectory(_) => {
                    log::warn!("unable to list profiles directory {}: {}", label, e);
                    Error::not_found(label.clone())
                }
                other => other,
            })
    }

    pub fn read(&self, path: &str, name: &str) -> Result<Vec<u8>> {
        let (_, profile) = self.resolver.resolve_profile(path, name)?;
        fs::read(&profile.real).map_err(|e| Error::lookup(&profile.rel, e))
    }

    /// Create or replace profile `name`, creating the sidecar directory if
    /// needed. The returned profile's `rel` is what must be staged.
    pub fn write(&self, path: &str, name: &str, content: &[u8]) -> Result<WrittenProfile> {
        let (primary, profile) = self.resolver.resolve_profile(path, name)?;
        let outcome =
            writer::with_created_parents(&profile.real, || writer::write(&profile.real, content))?;
        Ok(WrittenProfile {
            primary,
            profile,
            outcome,
        })
    }

    /// Remove a single profile file. Returns the removed profile's paths.
    pub fn unlink(&self, path: &str, name: &str) -> Result<(ResolvedPath, ResolvedPath)> {
        let (primary, profile) = self.resolver.resolve_profile(path, name)?;
        fs::remove_file(&profile.real).map_err(|e| Error::lookup(&profile.rel, e))?;
        Ok((primary, profile))
    }

    pub fn attributes(&self, path: &str, name: &str) -> Result<Attributes> {
        let (_, profile) = self.resolver.resolve_profile(path, name)?;
        listing::attributes(&profile.real, &profile.rel)
    }

    /// Names currently present in the sidecar directory of `primary`.
    ///
    /// Always reads the directory afresh; an absent sidecar yields an empty
    /// list.
    pub fn entry_names(&self, primary: &ResolvedPath) -> Vec<String> {
        match self
            .lister
            .list_profiles(&primary.sidecar_real(), &primary.sidecar_rel())
        {
            Ok(entries) => entries.into_iter().map(|e| e.name).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Staging paths for `names` inside the sidecar of `rel`.
pub fn staged_profile_paths<'n>(
    rel: &'n str,
    names: &'n [String],
) -> impl Iterator<Item = String> + 'n {
    names
        .iter()
        .map(move |name| format!("{}{}/{}", rel, crate::types::PROFILES_SUFFIX, name))
}
