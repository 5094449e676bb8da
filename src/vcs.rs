//! The version-control collaborator boundary.
//!
//! [`VersionControl`] is the capability consumed from the outside world
//! (stage + commit). [`CommitCoordinator`] owns the collaborator and is the
//! only place in the crate that calls it.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::Revision;

// ---------------------------------------------------------------------------
// VersionControl
// ---------------------------------------------------------------------------

/// Stage/commit capability of a version-control system.
pub trait VersionControl: Send {
    /// Record the current working-tree state of each root-relative path.
    /// Paths that no longer exist are recorded as deletions.
    fn stage(&mut self, paths: &[String]) -> Result<()>;

    /// Commit everything staged so far and return the new revision.
    fn commit(&mut self, message: &str, author: &str) -> Result<Revision>;

    /// File to hold an advisory lock on while mutating, if the collaborator
    /// can be shared between processes.
    fn lock_path(&self) -> Option<PathBuf> {
        None
    }
}

// ---------------------------------------------------------------------------
// StagingSet
// ---------------------------------------------------------------------------

/// Ordered, duplicate-free set of root-relative paths for one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingSet {
    paths: Vec<String>,
}

impl StagingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` unless it is already present.
    pub fn push(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.paths
    }
}

impl<S: Into<String>> FromIterator<S> for StagingSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for StagingSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for p in iter {
            self.push(p);
        }
    }
}

// ---------------------------------------------------------------------------
// CommitCoordinator
// ---------------------------------------------------------------------------

/// Stages a [`StagingSet`] and commits it as one revision.
///
/// Performs no local filesystem mutation and never rolls back the caller's
/// local changes when the collaborator fails.
pub struct CommitCoordinator {
    vcs: Mutex<Box<dyn VersionControl>>,
    lock_path: Option<PathBuf>,
}

impl CommitCoordinator {
    pub fn new(vcs: Box<dyn VersionControl>) -> Self {
        let lock_path = vcs.lock_path();
        Self {
            vcs: Mutex::new(vcs),
            lock_path,
        }
    }

    /// Cross-process lock file reported by the collaborator.
    pub fn lock_path(&self) -> Option<&Path> {
        self.lock_path.as_deref()
    }

    /// Stage `staged`, commit with `message`/`author`, return the revision.
    ///
    /// # Errors
    /// [`Error::Repository`] if the set is empty or the collaborator fails.
    pub fn stage_and_commit(
        &self,
        staged: &StagingSet,
        message: &str,
        author: &str,
    ) -> Result<Revision> {
        if staged.is_empty() {
            return Err(Error::repository_msg("refusing to commit an empty staging set"));
        }

        // Each stage/commit starts from the on-disk index, so a collaborator
        // that panicked earlier is still usable.
        let mut vcs = self.vcs.lock().unwrap_or_else(|poisoned| {
            log::warn!("recovering collaborator after a panic in a previous commit");
            poisoned.into_inner()
        });
        vcs.stage(staged.paths())?;
        let rev = vcs.commit(message, author)?;
        log::info!("new revision created: {}", rev);
        Ok(rev)
    }
}

impl std::fmt::Debug for CommitCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitCoordinator")
            .field("lock_path", &self.lock_path)
            .finish_non_exhaustive()
    }
}

/// Build a commit message from an operation summary and optional reason.
pub fn commit_message(summary: &str, reason: Option<&str>) -> String {
    match reason {
        Some(r) => format!("{} (reason: {})", summary, r),
        None => summary.to_string(),
    }
}
