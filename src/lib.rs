//! A versioned working-tree file backend.
//!
//! `vost_backend` exposes a rooted virtual file tree (files, directories,
//! and per-file *profiles*) on top of a local directory and records every
//! mutation as a revision in a version-control collaborator, normally the
//! git repository whose working tree is that directory.
//!
//! # Key types
//!
//! - [`FileSystemBackend`]: the capability surface (`read`, `write`,
//!   `rename`, `unlink`, `getdir`, profiles, ...).
//! - [`VersionedBackend`]: the implementation, local mutation followed by
//!   stage-and-commit, serialized per instance.
//! - [`VersionControl`]: the stage/commit capability it consumes;
//!   [`GitRepository`] implements it with `git2`.
//! - [`Logged`]: call-logging wrapper for any backend.
//! - [`BackendRegistry`]: explicit name → constructor table.
//!
//! # On-disk layout
//!
//! Primary files live at their virtual path under the root. Profiles of
//! `a/b.txt` live in `a/b.txt.profiles/<name>`. While a file is being
//! overwritten its previous content sits in `<file>.backup`.
//!
//! # Quick example
//!
//! ```rust,no_run
//! use vost_backend::{BackendConfig, FileSystemBackend, VersionedBackend};
//!
//! let config = BackendConfig::new("/srv/tests-repo");
//! let backend = VersionedBackend::open_git(&config).unwrap();
//!
//! let rev = backend.write("/tests/foo.ats", b"v1", Default::default()).unwrap();
//! println!("committed {}", rev);
//! backend.write_profile("/tests/foo.ats", "default", b"p-data").unwrap();
//! backend.rename("/tests/foo.ats", "bar.ats", Some("clearer name")).unwrap();
//! ```

pub mod backend;
pub mod error;
pub mod exclude;
pub mod git;
pub mod listing;
pub mod lock;
pub mod logged;
pub mod paths;
pub mod profiles;
pub mod registry;
pub mod rename;
pub mod types;
pub mod vcs;
pub mod writer;

// Re-export primary public types at crate root.
pub use backend::{FileSystemBackend, VersionedBackend, WriteOptions};
pub use error::{Error, Result};
pub use exclude::ExcludeFilter;
pub use git::GitRepository;
pub use logged::Logged;
pub use paths::{PathResolver, ResolvedPath};
pub use registry::{BackendConstructor, BackendRegistry};
pub use vcs::{CommitCoordinator, StagingSet, VersionControl};
pub use types::*;
