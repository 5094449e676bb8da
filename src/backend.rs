//! The backend facade consumed by the request-handling layer above.
//!
//! Every mutating call runs a local-mutate phase and, only if it succeeds,
//! a stage-and-commit phase. If the commit fails the local change stays in
//! place and [`Error::Repository`] is returned; that divergence is logged
//! at `error` level so it can be reconciled.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::exclude::ExcludeFilter;
use crate::git::GitRepository;
use crate::listing::{self, DirectoryLister};
use crate::lock::with_file_lock;
use crate::paths::{sibling_path, PathResolver, ResolvedPath};
use crate::profiles::{staged_profile_paths, ProfileStore};
use crate::rename::RenameCoordinator;
use crate::types::{Attributes, BackendConfig, DirEntry, Revision};
use crate::vcs::{commit_message, CommitCoordinator, StagingSet, VersionControl};
use crate::writer;

// ---------------------------------------------------------------------------
// Option structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Appended to the commit message as `(reason: ...)`.
    pub reason: Option<String>,
    /// Revision the caller based its edit on. Accepted but not checked.
    pub base_revision: Option<Revision>,
}

impl WriteOptions {
    pub fn reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// FileSystemBackend
// ---------------------------------------------------------------------------

/// Capability surface of a versioned file backend.
///
/// Paths are virtual, slash-separated and rooted at the repository; a
/// leading `/` is optional.
pub trait FileSystemBackend: Send + Sync {
    fn read(&self, path: &str) -> Result<Vec<u8>>;
    fn write(&self, path: &str, content: &[u8], opts: WriteOptions) -> Result<Revision>;
    fn rename(&self, path: &str, new_name: &str, reason: Option<&str>) -> Result<Revision>;
    fn unlink(&self, path: &str, reason: Option<&str>) -> Result<Revision>;
    fn getdir(&self, path: &str) -> Result<Vec<DirEntry>>;
    fn mkdir(&self, path: &str) -> Result<()>;
    fn rmdir(&self, path: &str) -> Result<()>;
    fn renamedir(&self, path: &str, new_name: &str) -> Result<()>;
    fn attributes(&self, path: &str) -> Result<Attributes>;
    fn revisions(&self, path: &str) -> Result<Vec<Revision>>;
    fn isdir(&self, path: &str) -> Result<bool>;
    fn isfile(&self, path: &str) -> Result<bool>;
    fn get_profiles(&self, path: &str) -> Result<Vec<DirEntry>>;
    fn read_profile(&self, path: &str, name: &str) -> Result<Vec<u8>>;
    fn write_profile(&self, path: &str, name: &str, content: &[u8]) -> Result<Revision>;
    fn unlink_profile(&self, path: &str, name: &str) -> Result<Revision>;
    fn profile_attributes(&self, path: &str, name: &str) -> Result<Attributes>;
}

// ---------------------------------------------------------------------------
// VersionedBackend
// ---------------------------------------------------------------------------

/// A rooted local tree whose every mutation is committed to a
/// [`VersionControl`] collaborator.
///
/// Mutations are serialized by a write gate held across both phases (plus
/// the collaborator's file lock, if it has one); reads share the gate and
/// so never observe a half-finished rename or unlink.
#[derive(Debug)]
pub struct VersionedBackend {
    resolver: PathResolver,
    lister: DirectoryLister,
    committer: String,
    commits: CommitCoordinator,
    gate: RwLock<()>,
}

impl VersionedBackend {
    /// Build a backend over `config.root` recording into `vcs`.
    pub fn new(config: &BackendConfig, vcs: Box<dyn VersionControl>) -> Result<Self> {
        let filter = ExcludeFilter::parse(&config.excluded);
        let resolver = PathResolver::new(&config.root)?.with_exclusions(filter.clone());
        let lister = DirectoryLister::new(filter);
        log::debug!(
            "backend rooted at {} (excluded: {:?})",
            resolver.root().display(),
            config.excluded
        );
        Ok(Self {
            resolver,
            lister,
            committer: config.committer.clone(),
            commits: CommitCoordinator::new(vcs),
            gate: RwLock::new(()),
        })
    }

    /// Open a backend over the existing git working tree at `config.root`.
    pub fn open_git(config: &BackendConfig) -> Result<Self> {
        let git = GitRepository::open(&config.root)?;
        Self::new(config, Box::new(git))
    }

    /// Canonical repository root.
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Default commit author.
    pub fn committer(&self) -> &str {
        &self.committer
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    fn profiles(&self) -> ProfileStore<'_> {
        ProfileStore::new(&self.resolver, &self.lister)
    }

    /// Run `f` with shared access to the tree.
    fn shared<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Run `f` with exclusive access to the tree and the collaborator.
    fn exclusive<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        match self.commits.lock_path() {
            Some(lock) => with_file_lock(lock, f),
            None => f(),
        }
    }

    /// Stage-and-commit phase. Local state is never rolled back here.
    fn record(&self, staged: &StagingSet, message: &str) -> Result<Revision> {
        self.commits
            .stage_and_commit(staged, message, &self.committer)
            .map_err(|e| {
                log::error!(
                    "local change not recorded in version history ({}): {}",
                    staged.paths().join(", "),
                    e
                );
                match e {
                    Error::Repository(_) => e,
                    other => Error::Repository(Box::new(other)),
                }
            })
    }

    /// Resolve `path` and require an existing regular file there.
    fn existing_file(&self, path: &str) -> Result<ResolvedPath> {
        let p = self.resolver.resolve_entry(path)?;
        let meta = fs::metadata(&p.real).map_err(|e| Error::lookup(&p.rel, e))?;
        if meta.is_dir() {
            return Err(Error::invalid_path(format!("{} is a directory", p.rel)));
        }
        Ok(p)
    }
}

impl FileSystemBackend for VersionedBackend {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.shared(|| {
            let p = self.existing_file(path)?;
            fs::read(&p.real).map_err(|e| Error::lookup(&p.rel, e))
        })
    }

    fn write(&self, path: &str, content: &[u8], opts: WriteOptions) -> Result<Revision> {
        self.exclusive(|| {
            let p = self.resolver.resolve_entry(path)?;
            let outcome =
                writer::with_created_parents(&p.real, || writer::write(&p.real, content))?;

            let staged: StagingSet = [p.rel.as_str()].into_iter().collect();
            let summary = format!("{} {}", outcome.verb(), p.rel);
            self.record(&staged, &commit_message(&summary, opts.reason.as_deref()))
        })
    }

    fn rename(&self, path: &str, new_name: &str, reason: Option<&str>) -> Result<Revision> {
        self.exclusive(|| {
            let renamed = RenameCoordinator::new(&self.resolver, self.profiles())
                .rename(path, new_name)?;
            let summary = format!("Renamed {} to {}", renamed.source.rel, new_name);
            self.record(&renamed.staged, &commit_message(&summary, reason))
        })
    }

    fn unlink(&self, path: &str, reason: Option<&str>) -> Result<Revision> {
        self.exclusive(|| {
            let p = self.existing_file(path)?;
            let profile_names = self.profiles().entry_names(&p);

            let sidecar = p.sidecar_real();
            if let Err(e) = fs::remove_dir_all(&sidecar) {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!("unable to remove profiles of {}: {}", p.rel, e);
                }
            }
            fs::remove_file(&p.real).map_err(|e| {
                log::warn!("unable to unlink {}: {}", p.rel, e);
                Error::io(&p.real, e)
            })?;

            let mut staged = StagingSet::new();
            staged.push(p.rel.clone());
            staged.extend(staged_profile_paths(&p.rel, &profile_names));
            let summary = format!("Deleted {}", p.rel);
            self.record(&staged, &commit_message(&summary, reason))
        })
    }

    fn getdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.shared(|| {
            let p = self.resolver.resolve(path)?;
            self.lister.list(&p.real, &format!("/{}", p.rel))
        })
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        self.exclusive(|| {
            let p = self.resolver.resolve_entry(path)?;
            if fs::symlink_metadata(&p.real).is_ok() {
                return Err(Error::already_exists(p.rel));
            }
            fs::create_dir_all(&p.real).map_err(|e| Error::io(&p.real, e))
        })
    }

    fn rmdir(&self, path: &str) -> Result<()> {
        self.exclusive(|| {
            let p = self.resolver.resolve_entry(path)?;
            let meta = fs::metadata(&p.real).map_err(|e| Error::lookup(&p.rel, e))?;
            if !meta.is_dir() {
                return Err(Error::not_a_directory(p.rel));
            }
            let mut entries = fs::read_dir(&p.real).map_err(|e| Error::io(&p.real, e))?;
            if entries.next().is_some() {
                return Err(Error::not_empty(p.rel));
            }
            fs::remove_dir(&p.real).map_err(|e| Error::io(&p.real, e))
        })
    }

    fn renamedir(&self, path: &str, new_name: &str) -> Result<()> {
        self.exclusive(|| {
            if new_name.trim_matches('/').is_empty() {
                return Err(Error::invalid_path("new name must not be empty"));
            }
            let source = self.resolver.resolve_entry(path)?;
            let target = self
                .resolver
                .resolve_entry(&sibling_path(&source.rel, new_name))?;

            let meta = fs::metadata(&source.real).map_err(|e| Error::lookup(&source.rel, e))?;
            if !meta.is_dir() {
                return Err(Error::not_a_directory(source.rel));
            }
            if fs::symlink_metadata(&target.real).is_ok() {
                return Err(Error::already_exists(target.rel));
            }
            fs::rename(&source.real, &target.real).map_err(|e| Error::io(&source.real, e))?;

            // Directory renames are not staged: the move is local only.
            log::info!(
                "renamed directory {} to {} (not recorded in version history)",
                source.rel,
                target.rel
            );
            Ok(())
        })
    }

    fn attributes(&self, path: &str) -> Result<Attributes> {
        self.shared(|| {
            let p = self.resolver.resolve(path)?;
            listing::attributes(&p.real, &p.rel)
        })
    }

    fn revisions(&self, path: &str) -> Result<Vec<Revision>> {
        self.resolver.resolve(path)?;
        Err(Error::unsupported("revisions"))
    }

    fn isdir(&self, path: &str) -> Result<bool> {
        self.shared(|| Ok(self.resolver.resolve(path)?.real.is_dir()))
    }

    fn isfile(&self, path: &str) -> Result<bool> {
        self.shared(|| Ok(self.resolver.resolve(path)?.real.is_file()))
    }

    fn get_profiles(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.shared(|| self.profiles().list(path))
    }

    fn read_profile(&self, path: &str, name: &str) -> Result<Vec<u8>> {
        self.shared(|| self.profiles().read(path, name))
    }

    fn write_profile(&self, path: &str, name: &str, content: &[u8]) -> Result<Revision> {
        self.exclusive(|| {
            self.existing_file(path)?;
            let written = self.profiles().write(path, name, content)?;

            let staged: StagingSet = [written.profile.rel.as_str()].into_iter().collect();
            let message = format!(
                "{} profile {} for {}",
                written.outcome.verb(),
                name,
                written.primary.rel
            );
            self.record(&staged, &message)
        })
    }

    fn unlink_profile(&self, path: &str, name: &str) -> Result<Revision> {
        self.exclusive(|| {
            let (primary, profile) = self.profiles().unlink(path, name)?;
            let staged: StagingSet = [profile.rel.as_str()].into_iter().collect();
            let message = format!("Removed profile {} for {}", name, primary.rel);
            self.record(&staged, &message)
        })
    }

    fn profile_attributes(&self, path: &str, name: &str) -> Result<Attributes> {
        self.shared(|| self.profiles().attributes(path, name))
    }
}

impl<B: FileSystemBackend + ?Sized> FileSystemBackend for Box<B> {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        (**self).read(path)
    }

    fn write(&self, path: &str, content: &[u8], opts: WriteOptions) -> Result<Revision> {
        (**self).write(path, content, opts)
    }

    fn rename(&self, path: &str, new_name: &str, reason: Option<&str>) -> Result<Revision> {
        (**self).rename(path, new_name, reason)
    }

    fn unlink(&self, path: &str, reason: Option<&str>) -> Result<Revision> {
        (**self).unlink(path, reason)
    }

    fn getdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        (**self).getdir(path)
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        (**self).mkdir(path)
    }

    fn rmdir(&self, path: &str) -> Result<()> {
        (**self).rmdir(path)
    }

    fn renamedir(&self, path: &str, new_name: &str) -> Result<()> {
        (**self).renamedir(path, new_name)
    }

    fn attributes(&self, path: &str) -> Result<Attributes> {
        (**self).attributes(path)
    }

    fn revisions(&self, path: &str) -> Result<Vec<Revision>> {
        (**self).revisions(path)
    }

    fn isdir(&self, path: &str) -> Result<bool> {
        (**self).isdir(path)
    }

    fn isfile(&self, path: &str) -> Result<bool> {
        (**self).isfile(path)
    }

    fn get_profiles(&self, path: &str) -> Result<Vec<DirEntry>> {
        (**self).get_profiles(path)
    }

    fn read_profile(&self, path: &str, name: &str) -> Result<Vec<u8>> {
        (**self).read_profile(path, name)
    }

    fn write_profile(&self, path: &str, name: &str, content: &[u8]) -> Result<Revision> {
        (**self).write_profile(path, name, content)
    }

    fn unlink_profile(&self, path: &str, name: &str) -> Result<Revision> {
        (**self).unlink_profile(path, name)
    }

    fn profile_attributes(&self, path: &str, name: &str) -> Result<Attributes> {
        (**self).profile_attributes(path, name)
    }
}
