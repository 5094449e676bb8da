//! [`VersionControl`] implemented on a non-bare git repository via `git2`.
//!
//! The repository's working tree is the backend root; staging reads file
//! content straight from it.

use std::path::{Path, PathBuf};

use git2::{ErrorCode, IndexAddOption, Repository, Signature};

use crate::error::{Error, Result};
use crate::types::Revision;
use crate::vcs::VersionControl;

/// Name of the advisory lock file kept inside the git directory.
pub const LOCK_FILE: &str = "vost-backend.lock";

/// A git working-tree repository used as the commit collaborator.
pub struct GitRepository {
    repo: Repository,
    workdir: PathBuf,
}

impl GitRepository {
    /// Open the existing repository whose working tree is `root`.
    ///
    /// # Errors
    /// [`Error::Repository`] if `root` is not a git working tree.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let repo = Repository::open(root.as_ref())?;
        Self::from_repository(repo)
    }

    /// Open the repository at `root`, initializing one if none exists.
    pub fn open_or_init(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let repo = match Repository::open(root) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                log::info!("initializing git repository in {}", root.display());
                Repository::init(root)?
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_repository(repo)
    }

    fn from_repository(repo: Repository) -> Result<Self> {
        let workdir = repo
            .workdir()
            .ok_or_else(|| Error::repository_msg("bare repository not supported"))?
            .to_path_buf();
        Ok(Self { repo, workdir })
    }

    /// The underlying `git2` repository.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl VersionControl for GitRepository {
    fn stage(&mut self, paths: &[String]) -> Result<()> {
        let mut index = self.repo.index()?;
        for p in paths {
            let rel = Path::new(p);
            match std::fs::symlink_metadata(self.workdir.join(rel)) {
                Ok(meta) if meta.is_dir() => {
                    index.add_all([p.as_str()].iter(), IndexAddOption::DEFAULT, None)?;
                }
                Ok(_) => index.add_path(rel)?,
                Err(_) => {
                    index.remove_path(rel)?;
                    index.remove_dir(rel, 0)?;
                }
            }
        }
        index.write()?;
        Ok(())
    }

    fn commit(&mut self, message: &str, author: &str) -> Result<Revision> {
        let sig = parse_signature(author)?;
        let tree_oid = self.repo.index()?.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;
        let parent = self.head_commit()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        Ok(Revision::new(oid.to_string()))
    }

    fn lock_path(&self) -> Option<PathBuf> {
        Some(self.repo.path().join(LOCK_FILE))
    }
}

/// Parse `"Name <email>"` into a signature stamped with the current time.
///
/// A bare name without `<email>` gets a `name@localhost` address.
pub fn parse_signature(author: &str) -> Result<Signature<'static>> {
    let author = author.trim();
    let (name, email) = match (author.find('<'), author.rfind('>')) {
        (Some(open), Some(close)) if open < close => (
            author[..open].trim().to_string(),
            author[open + 1..close].trim().to_string(),
        ),
        _ => {
            let local: Vec<&str> = author.split_whitespace().collect();
            (author.to_string(), format!("{}@localhost", local.join(".")))
        }
    };
    if name.is_empty() {
        return Err(Error::repository_msg(format!("invalid author '{}'", author)));
    }
    Ok(Signature::now(&name, &email)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head_files(repo: &Repository) -> Vec<String> {
        let tree = repo.head().unwrap().peel_to_tree().unwrap();
        let mut out = Vec::new();
        tree.walk(git2::TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(git2::ObjectType::Blob) {
                out.push(format!("{}{}", dir, entry.name().unwrap()));
            }
            git2::TreeWalkResult::Ok
        })
        .unwrap();
        out.sort();
        out
    }

    #[test]
    fn signature_with_email() {
        let sig = parse_signature("Jane Doe <jane@example.com>").unwrap();
        assert_eq!(sig.name(), Some("Jane Doe"));
        assert_eq!(sig.email(), Some("jane@example.com"));
    }

    #[test]
    fn signature_bare_name() {
        let sig = parse_signature("robot").unwrap();
        assert_eq!(sig.name(), Some("robot"));
        assert_eq!(sig.email(), Some("robot@localhost"));
    }

    #[test]
    fn signature_empty_rejected() {
        assert!(parse_signature("  <x@y>").is_err());
    }

    #[test]
    fn open_requires_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(GitRepository::open(dir.path()), Err(Error::Repository(_))));
    }

    #[test]
    fn first_and_second_commit() {
        let dir = tempfile::tempdir().unwrap();
        let mut git = GitRepository::open_or_init(dir.path()).unwrap();

        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        git.stage(&["a.txt".into()]).unwrap();
        let r1 = git.commit("Added a.txt", "t <t@x>").unwrap();

        std::fs::create_dir(dir.path().join("d")).unwrap();
        std::fs::write(dir.path().join("d/b.txt"), b"b").unwrap();
        git.stage(&["d/b.txt".into()]).unwrap();
        let r2 = git.commit("Added d/b.txt", "t <t@x>").unwrap();

        assert_ne!(r1, r2);
        let repo = git.repository();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.id().to_string(), r2.as_str());
        assert_eq!(head.parent(0).unwrap().id().to_string(), r1.as_str());
        assert_eq!(head.message(), Some("Added d/b.txt"));
        assert_eq!(head_files(repo), vec!["a.txt", "d/b.txt"]);
    }

    #[test]
    fn staging_missing_path_records_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let mut git = GitRepository::open_or_init(dir.path()).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        git.stage(&["a.txt".into(), "b.txt".into()]).unwrap();
        git.commit("add", "t").unwrap();

        std::fs::remove_file(dir.path().join("a.txt")).unwrap();
        git.stage(&["a.txt".into(), "never-existed".into()]).unwrap();
        git.commit("delete", "t").unwrap();
        assert_eq!(head_files(git.repository()), vec!["b.txt"]);
    }

    #[test]
    fn staging_directory_adds_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut git = GitRepository::open_or_init(dir.path()).unwrap();
        std::fs::create_dir_all(dir.path().join("x.profiles/sub")).unwrap();
        std::fs::write(dir.path().join("x.profiles/sub/p"), b"p").unwrap();
        git.stage(&["x.profiles/sub".into()]).unwrap();
        git.commit("dir", "t").unwrap();
        assert_eq!(head_files(git.repository()), vec!["x.profiles/sub/p"]);
    }

    #[test]
    fn lock_path_inside_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitRepository::open_or_init(dir.path()).unwrap();
        let lock = git.lock_path().unwrap();
        assert!(lock.ends_with(format!(".git/{}", LOCK_FILE)));
    }
}
