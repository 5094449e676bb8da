use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::exclude::ExcludeFilter;
use crate::types::PROFILES_SUFFIX;

/// Metadata directory of the version-control collaborator. Never
/// addressable, whatever the configured exclusions say.
pub const METADATA_DIR: &str = ".git";

// ---------------------------------------------------------------------------
// ResolvedPath
// ---------------------------------------------------------------------------

/// A virtual path resolved against the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Absolute local path, guaranteed to lie under the canonical root.
    pub real: PathBuf,
    /// Root-relative, slash-separated path used for staging.
    pub rel: String,
}

impl ResolvedPath {
    /// Returns `true` for the repository root itself.
    pub fn is_root(&self) -> bool {
        self.rel.is_empty()
    }

    /// Fail with [`Error::InvalidPath`] when this is the root, which can
    /// never be a primary file.
    pub fn require_entry(self) -> Result<Self> {
        if self.is_root() {
            return Err(Error::invalid_path("operation not allowed on repository root"));
        }
        Ok(self)
    }

    /// Local path of the profiles sidecar directory.
    pub fn sidecar_real(&self) -> PathBuf {
        with_suffix(&self.real, PROFILES_SUFFIX)
    }

    /// Root-relative path of the profiles sidecar directory.
    pub fn sidecar_rel(&self) -> String {
        format!("{}{}", self.rel, PROFILES_SUFFIX)
    }
}

// ---------------------------------------------------------------------------
// PathResolver
// ---------------------------------------------------------------------------

/// Maps virtual paths onto the local tree, confined to the repository root.
///
/// Every call re-checks containment; nothing is cached between calls.
/// Paths with a segment matching the exclusion filter (or naming
/// [`METADATA_DIR`]) are refused.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    excluded: ExcludeFilter,
}

impl PathResolver {
    /// Create a resolver for `root`, which must be an existing directory.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if `root` does not exist and
    /// [`Error::NotADirectory`] if it is not a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|e| Error::lookup(&root.display().to_string(), e))?;
        if !canonical.is_dir() {
            return Err(Error::not_a_directory(canonical.display().to_string()));
        }
        Ok(Self {
            root: canonical,
            excluded: ExcludeFilter::new(),
        })
    }

    /// Also refuse paths through entries matching `filter`.
    pub fn with_exclusions(mut self, filter: ExcludeFilter) -> Self {
        self.excluded = filter;
        self
    }

    /// The canonical repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `virtual_path` to a real path under the root.
    ///
    /// `.` segments and repeated slashes are collapsed, `..` pops a segment,
    /// and symlinks along the existing part of the path are followed. A
    /// leading `/` is optional.
    ///
    /// # Errors
    /// Returns [`Error::OutsideRoot`] when the path escapes the root, either
    /// lexically (too many `..`) or through a symlink, and
    /// [`Error::InvalidPath`] when it passes through an excluded entry.
    pub fn resolve(&self, virtual_path: &str) -> Result<ResolvedPath> {
        let segments = normalize_segments(virtual_path)?;

        let mut candidate = self.root.clone();
        for seg in &segments {
            candidate.push(seg);
        }

        let real = self.canonicalize_lenient(&candidate, virtual_path)?;
        let rel = match real.strip_prefix(&self.root) {
            Ok(rel) => rel_to_string(rel),
            Err(_) => {
                log::warn!(
                    "attempted to handle a path that is not under the repository ({}), ignoring",
                    real.display()
                );
                return Err(Error::outside_root(virtual_path));
            }
        };

        self.check_excluded(&rel, &real)?;
        Ok(ResolvedPath { real, rel })
    }

    /// Checked on the resolved path so a symlink cannot alias an excluded
    /// entry. Only the last segment can be a file.
    fn check_excluded(&self, rel: &str, real: &Path) -> Result<()> {
        let segments: Vec<&str> = rel.split('/').filter(|s| !s.is_empty()).collect();
        let last = segments.len().saturating_sub(1);
        for (i, seg) in segments.iter().enumerate() {
            let is_dir = i < last || real.is_dir();
            if *seg == METADATA_DIR || self.excluded.is_excluded(seg, is_dir) {
                log::warn!("refusing path through excluded entry '{}': {}", seg, rel);
                return Err(Error::invalid_path(format!(
                    "{} is excluded from version control",
                    rel
                )));
            }
        }
        Ok(())
    }

    /// Resolve a path that names a primary file (anything but the root).
    pub fn resolve_entry(&self, virtual_path: &str) -> Result<ResolvedPath> {
        self.resolve(virtual_path)?.require_entry()
    }

    /// Resolve the profile `name` belonging to the file at `virtual_path`.
    ///
    /// Returns the resolved primary file and the resolved profile path.
    pub fn resolve_profile(
        &self,
        virtual_path: &str,
        name: &str,
    ) -> Result<(ResolvedPath, ResolvedPath)> {
        validate_profile_name(name)?;
        let primary = self.resolve_entry(virtual_path)?;
        let profile = self.resolve(&format!("{}/{}", primary.sidecar_rel(), name))?;
        Ok((primary, profile))
    }

    /// Canonicalize the longest existing prefix of `candidate` and re-append
    /// the missing tail.
    fn canonicalize_lenient(&self, candidate: &Path, virtual_path: &str) -> Result<PathBuf> {
        let mut existing = candidate.to_path_buf();
        let mut tail: Vec<OsString> = Vec::new();

        let base = loop {
            match existing.canonicalize() {
                Ok(c) => break c,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    if existing.symlink_metadata().is_ok() {
                        // A dangling symlink could point anywhere once created.
                        return Err(Error::outside_root(virtual_path));
                    }
                    let name = match existing.file_name() {
                        Some(n) => n.to_os_string(),
                        None => return Err(Error::outside_root(virtual_path)),
                    };
                    tail.push(name);
                    if !existing.pop() {
                        return Err(Error::outside_root(virtual_path));
                    }
                }
                Err(e) => return Err(Error::io(&existing, e)),
            }
        };

        let mut real = base;
        for name in tail.into_iter().rev() {
            real.push(name);
        }
        Ok(real)
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Split a virtual path into normalized segments.
///
/// Empty and `.` segments are dropped; `..` removes the previous segment.
/// This is purely lexical and happens before any symlink is followed, so
/// `alias/../x` is `x` even when `alias` is a symlink into another
/// directory (unlike `realpath`). Containment is unaffected.
///
/// # Errors
/// Returns [`Error::OutsideRoot`] if `..` climbs above the root.
pub fn normalize_segments(path: &str) -> Result<Vec<&str>> {
    let mut segments: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::outside_root(path));
                }
            }
            _ => segments.push(seg),
        }
    }
    Ok(segments)
}

/// Compute the virtual path of a rename target.
///
/// `new_name` is taken relative to the directory holding `rel`; a leading
/// `/` on `new_name` is ignored.
pub fn sibling_path(rel: &str, new_name: &str) -> String {
    let new_name = new_name.trim_start_matches('/');
    match rel.rsplit_once('/') {
        Some((parent, _)) => format!("{}/{}", parent, new_name),
        None => new_name.to_string(),
    }
}

/// Check that `name` is usable as a single profile file name.
///
/// # Errors
/// Returns [`Error::InvalidPath`] for empty names, `.`/`..`, or names
/// containing a slash.
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::invalid_path(format!("invalid profile name '{}'", name)));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(Error::invalid_path(format!(
            "profile name '{}' must be a single path segment",
            name
        )));
    }
    Ok(())
}

/// Append `suffix` to the final component of `path` (`a/b` → `a/b.backup`).
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn rel_to_string(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> (tempfile::TempDir, PathResolver) {
        let dir = tempfile::tempdir().unwrap();
        let r = PathResolver::new(dir.path()).unwrap();
        (dir, r)
    }

    #[test]
    fn normalize_strips_slashes_and_dots() {
        assert_eq!(normalize_segments("/a/./b//c/").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn normalize_pops_dotdot() {
        assert_eq!(normalize_segments("a/b/../c").unwrap(), vec!["a", "c"]);
        assert!(normalize_segments("/").unwrap().is_empty());
    }

    #[test]
    fn normalize_rejects_escape() {
        assert!(matches!(normalize_segments("/../../etc/passwd"), Err(Error::OutsideRoot(_))));
        assert!(matches!(normalize_segments("a/../../b"), Err(Error::OutsideRoot(_))));
    }

    #[test]
    fn resolve_nonexistent_path_under_root() {
        let (_dir, r) = resolver();
        let p = r.resolve("/tests/foo.ats").unwrap();
        assert_eq!(p.rel, "tests/foo.ats");
        assert_eq!(p.real, r.root().join("tests").join("foo.ats"));
    }

    #[test]
    fn resolve_root() {
        let (_dir, r) = resolver();
        let p = r.resolve("/").unwrap();
        assert!(p.is_root());
        assert_eq!(p.real, r.root());
        assert!(r.resolve_entry("/").is_err());
    }

    #[test]
    fn resolve_rejects_traversal() {
        let (_dir, r) = resolver();
        assert!(matches!(r.resolve("/../../etc/passwd"), Err(Error::OutsideRoot(_))));
        assert!(matches!(r.resolve(".."), Err(Error::OutsideRoot(_))));
    }

    #[test]
    fn resolve_allows_inner_dotdot() {
        let (_dir, r) = resolver();
        let p = r.resolve("/a/b/../c.txt").unwrap();
        assert_eq!(p.rel, "a/c.txt");
    }

    #[cfg(unix)]
    #[test]
    fn resolve_rejects_symlink_escape() {
        let (dir, r) = resolver();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        assert!(matches!(r.resolve("/link/secret"), Err(Error::OutsideRoot(_))));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_follows_inner_symlink() {
        let (dir, r) = resolver();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();
        let p = r.resolve("/alias/file.txt").unwrap();
        assert_eq!(p.rel, "real/file.txt");
    }

    #[cfg(unix)]
    #[test]
    fn resolve_rejects_dangling_symlink() {
        let (dir, r) = resolver();
        std::os::unix::fs::symlink("/nonexistent/target", dir.path().join("dangling")).unwrap();
        assert!(matches!(r.resolve("/dangling"), Err(Error::OutsideRoot(_))));
    }

    #[test]
    fn resolve_profile_paths() {
        let (_dir, r) = resolver();
        let (primary, profile) = r.resolve_profile("/tests/foo.ats", "default").unwrap();
        assert_eq!(primary.sidecar_rel(), "tests/foo.ats.profiles");
        assert_eq!(profile.rel, "tests/foo.ats.profiles/default");
    }

    #[test]
    fn new_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PathResolver::new(dir.path().join("missing")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn sibling_path_uses_parent() {
        assert_eq!(sibling_path("tests/foo.ats", "bar.ats"), "tests/bar.ats");
        assert_eq!(sibling_path("tests/foo.ats", "/bar.ats"), "tests/bar.ats");
        assert_eq!(sibling_path("foo.ats", "bar.ats"), "bar.ats");
    }

    #[test]
    fn profile_name_validation() {
        assert!(validate_profile_name("default").is_ok());
        assert!(validate_profile_name("").is_err());
        assert!(validate_profile_name("..").is_err());
        assert!(validate_profile_name("a/b").is_err());
    }

    #[test]
    fn metadata_dir_is_never_resolvable() {
        let (_dir, r) = resolver();
        assert!(matches!(r.resolve("/.git/HEAD"), Err(Error::InvalidPath(_))));
        assert!(matches!(r.resolve("a/.git"), Err(Error::InvalidPath(_))));
        assert!(matches!(
            r.resolve_profile("/a.txt", ".git"),
            Err(Error::InvalidPath(_))
        ));
        assert!(r.resolve("/.gitignore").is_ok());
    }

    #[test]
    fn configured_exclusions_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("build")).unwrap();
        let r = PathResolver::new(dir.path())
            .unwrap()
            .with_exclusions(ExcludeFilter::parse("*.pyc build/"));
        assert!(matches!(r.resolve("/mod.pyc"), Err(Error::InvalidPath(_))));
        assert!(matches!(r.resolve("/build/out.txt"), Err(Error::InvalidPath(_))));
        assert!(matches!(r.resolve("/build"), Err(Error::InvalidPath(_))));
        // Directory-only pattern does not hit a file of that name elsewhere.
        assert!(r.resolve("/src/build").is_ok());
        assert!(r.resolve("/mod.py").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_metadata_dir_is_refused() {
        let (dir, r) = resolver();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::os::unix::fs::symlink(dir.path().join(".git"), dir.path().join("meta")).unwrap();
        assert!(matches!(r.resolve("/meta/HEAD"), Err(Error::InvalidPath(_))));
    }

    #[cfg(unix)]
    #[test]
    fn dotdot_is_lexical_before_symlinks() {
        let (dir, r) = resolver();
        std::fs::create_dir_all(dir.path().join("real/sub")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real/sub"), dir.path().join("alias")).unwrap();
        assert_eq!(r.resolve("/alias/../x").unwrap().rel, "x");
    }

    #[test]
    fn with_suffix_appends_to_name() {
        assert_eq!(with_suffix(Path::new("/r/a.txt"), ".backup"), PathBuf::from("/r/a.txt.backup"));
    }
}
