use std::collections::BTreeMap;

use crate::backend::{FileSystemBackend, VersionedBackend};
use crate::error::{Error, Result};
use crate::logged::Logged;
use crate::types::BackendConfig;

/// Constructor for a named backend type.
pub type BackendConstructor = fn(&BackendConfig) -> Result<Box<dyn FileSystemBackend>>;

/// Maps backend type names to constructors.
///
/// Owned by whoever instantiates backends and passed to them explicitly;
/// there is no process-wide table.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    constructors: BTreeMap<String, BackendConstructor>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `"git"` backend.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("git", open_git);
        registry
    }

    /// Register `ctor` under `name`, replacing and returning any previous one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        ctor: BackendConstructor,
    ) -> Option<BackendConstructor> {
        self.constructors.insert(name.into(), ctor)
    }

    pub fn unregister(&mut self, name: &str) -> Option<BackendConstructor> {
        self.constructors.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Instantiate backend type `name`, wrapped in call logging.
    ///
    /// # Errors
    /// [`Error::UnknownBackend`] if nothing is registered under `name`, or
    /// whatever the constructor returns.
    pub fn create(&self, name: &str, config: &BackendConfig) -> Result<Box<dyn FileSystemBackend>> {
        let ctor = self
            .constructors
            .get(name)
            .ok_or_else(|| Error::UnknownBackend(name.to_string()))?;
        let backend = ctor(config)?;
        log::info!("created '{}' backend at {}", name, config.root.display());
        Ok(Box::new(Logged::new(backend)))
    }
}

fn open_git(config: &BackendConfig) -> Result<Box<dyn FileSystemBackend>> {
    Ok(Box::new(VersionedBackend::open_git(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing(_: &BackendConfig) -> Result<Box<dyn FileSystemBackend>> {
        Err(Error::unsupported("test backend"))
    }

    #[test]
    fn builtins_include_git() {
        let r = BackendRegistry::with_builtins();
        assert!(r.contains("git"));
        assert_eq!(r.names(), vec!["git"]);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let r = BackendRegistry::new();
        let err = r.create("svn", &BackendConfig::new("/tmp")).err().unwrap();
        assert!(matches!(err, Error::UnknownBackend(ref n) if n == "svn"));
    }

    #[test]
    fn register_replaces_and_unregister_removes() {
        let mut r = BackendRegistry::with_builtins();
        assert!(r.register("git", failing).is_some());
        assert!(matches!(
            r.create("git", &BackendConfig::new("/tmp")).err().unwrap(),
            Error::Unsupported(_)
        ));
        assert!(r.unregister("git").is_some());
        assert!(!r.contains("git"));
    }

    #[test]
    fn git_backend_created_over_repository() {
        let dir = tempfile::tempdir().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        let r = BackendRegistry::with_builtins();
        let backend = r.create("git", &BackendConfig::new(dir.path())).unwrap();
        backend.write("/a.txt", b"hello", Default::default()).unwrap();
        assert_eq!(backend.read("/a.txt").unwrap(), b"hello");
    }
}
