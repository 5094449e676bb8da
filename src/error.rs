use std::path::PathBuf;

/// All errors produced by the backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path outside repository root: {0}")]
    OutsideRoot(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("directory not empty: {0}")]
    NotEmpty(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("repository error: {0}")]
    Repository(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("unknown backend type: {0}")]
    UnknownBackend(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl Error {
    pub fn outside_root(path: impl Into<String>) -> Self {
        Self::OutsideRoot(path.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    pub fn not_empty(path: impl Into<String>) -> Self {
        Self::NotEmpty(path.into())
    }

    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    pub fn unsupported(op: impl Into<String>) -> Self {
        Self::Unsupported(op.into())
    }

    pub fn repository(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Repository(Box::new(err))
    }

    pub fn repository_msg(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into().into())
    }

    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.into().display(), err),
        ))
    }

    /// Map an I/O error on a lookup to `NotFound` when the target is absent,
    /// and to `Io` otherwise.
    pub(crate) fn lookup(path: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(path)
        } else {
            Self::io(path, err)
        }
    }

    /// `true` when the local mutation was applied but the version-control
    /// collaborator failed to record it.
    pub fn is_repository_failure(&self) -> bool {
        matches!(self, Self::Repository(_))
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Self::repository(err)
    }
}
