use std::fmt;
use std::path::PathBuf;

/// Suffix of the sidecar directory that holds a file's profiles.
pub const PROFILES_SUFFIX: &str = ".profiles";

/// Suffix of the transient backup made while a file is being overwritten.
pub const BACKUP_SUFFIX: &str = ".backup";

pub const DEFAULT_COMMITTER: &str = "vost backend <vost@localhost>";
pub const DEFAULT_EXCLUDED: &str = ".git";

// ---------------------------------------------------------------------------
// EntryKind / DirEntry
// ---------------------------------------------------------------------------

/// Kind of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn is_file(self) -> bool {
        matches!(self, Self::File)
    }

    pub fn is_dir(self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
        }
    }
}

/// A single directory (or profile) listing entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DirEntry {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, EntryKind::File)
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, EntryKind::Directory)
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Size and modification time of a file or profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Attributes {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, seconds since the Unix epoch.
    pub mtime: i64,
}

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// Opaque identifier of a committed state, as produced by the
/// version-control collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Revision(String);

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Revision {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Revision {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

/// Settings read once when a backend is initialized.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Repository root (the git working tree).
    pub root: PathBuf,
    /// Identity used as the commit author, `"Name <email>"`.
    pub committer: String,
    /// Space-separated name patterns hidden from listings.
    pub excluded: String,
}

impl BackendConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            committer: DEFAULT_COMMITTER.into(),
            excluded: DEFAULT_EXCLUDED.into(),
        }
    }

    pub fn committer(mut self, committer: impl Into<String>) -> Self {
        self.committer = committer.into();
        self
    }

    pub fn excluded(mut self, excluded: impl Into<String>) -> Self {
        self.excluded = excluded.into();
        self
    }

    /// Build a config from `VOST_ROOT`, `VOST_COMMITTER` and `VOST_EXCLUDED`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`](crate::Error::InvalidPath) when
    /// `VOST_ROOT` is unset.
    pub fn from_env() -> crate::Result<Self> {
        let root = std::env::var_os("VOST_ROOT")
            .ok_or_else(|| crate::Error::invalid_path("VOST_ROOT is not set"))?;
        let mut config = Self::new(root);
        if let Ok(committer) = std::env::var("VOST_COMMITTER") {
            config.committer = committer;
        }
        if let Ok(excluded) = std::env::var("VOST_EXCLUDED") {
            config.excluded = excluded;
        }
        Ok(config)
    }
}
