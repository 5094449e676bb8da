//! Call logging around any [`FileSystemBackend`].
//!
//! [`Logged`] logs every call at `debug` with its arguments, and every
//! failure at `warn` with the elapsed time. Content is logged by size only.

use std::fmt::Display;
use std::time::Instant;

use crate::backend::{FileSystemBackend, WriteOptions};
use crate::error::Result;
use crate::types::{Attributes, DirEntry, Revision};

/// Instrumentation wrapper applied at the facade boundary.
#[derive(Debug)]
pub struct Logged<B> {
    inner: B,
    target: &'static str,
}

impl<B: FileSystemBackend> Logged<B> {
    pub fn new(inner: B) -> Self {
        Self::with_target(inner, "vost_backend::calls")
    }

    /// Wrap `inner`, logging under the given `log` target.
    pub fn with_target(inner: B, target: &'static str) -> Self {
        Self { inner, target }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }

    fn call<T>(&self, desc: impl FnOnce() -> String, f: impl FnOnce(&B) -> Result<T>) -> Result<T> {
        let desc = if log::log_enabled!(target: self.target, log::Level::Warn) {
            Some(desc())
        } else {
            None
        };
        if let Some(d) = &desc {
            log::debug!(target: self.target, ":: {}", d);
        }

        let start = Instant::now();
        let result = f(&self.inner);
        if let (Err(e), Some(d)) = (&result, &desc) {
            log::warn!(
                target: self.target,
                "{} failed after {:?}: {}",
                d,
                start.elapsed(),
                e
            );
        }
        result
    }
}

fn opt(v: Option<&str>) -> String {
    match v {
        Some(s) => format!("{:?}", s),
        None => "None".into(),
    }
}

fn bytes(content: &[u8]) -> impl Display {
    format!("{} bytes", content.len())
}

impl<B: FileSystemBackend> FileSystemBackend for Logged<B> {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.call(|| format!("read({:?})", path), |b| b.read(path))
    }

    fn write(&self, path: &str, content: &[u8], opts: WriteOptions) -> Result<Revision> {
        self.call(
            || {
                format!(
                    "write({:?}, {}, reason={})",
                    path,
                    bytes(content),
                    opt(opts.reason.as_deref())
                )
            },
            |b| b.write(path, content, opts.clone()),
        )
    }

    fn rename(&self, path: &str, new_name: &str, reason: Option<&str>) -> Result<Revision> {
        self.call(
            || format!("rename({:?}, {:?}, reason={})", path, new_name, opt(reason)),
            |b| b.rename(path, new_name, reason),
        )
    }

    fn unlink(&self, path: &str, reason: Option<&str>) -> Result<Revision> {
        self.call(
            || format!("unlink({:?}, reason={})", path, opt(reason)),
            |b| b.unlink(path, reason),
        )
    }

    fn getdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.call(|| format!("getdir({:?})", path), |b| b.getdir(path))
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        self.call(|| format!("mkdir({:?})", path), |b| b.mkdir(path))
    }

    fn rmdir(&self, path: &str) -> Result<()> {
        self.call(|| format!("rmdir({:?})", path), |b| b.rmdir(path))
    }

    fn renamedir(&self, path: &str, new_name: &str) -> Result<()> {
        self.call(
            || format!("renamedir({:?}, {:?})", path, new_name),
            |b| b.renamedir(path, new_name),
        )
    }

    fn attributes(&self, path: &str) -> Result<Attributes> {
        self.call(|| format!("attributes({:?})", path), |b| b.attributes(path))
    }

    fn revisions(&self, path: &str) -> Result<Vec<Revision>> {
        self.call(|| format!("revisions({:?})", path), |b| b.revisions(path))
    }

    fn isdir(&self, path: &str) -> Result<bool> {
        self.call(|| format!("isdir({:?})", path), |b| b.isdir(path))
    }

    fn isfile(&self, path: &str) -> Result<bool> {
        self.call(|| format!("isfile({:?})", path), |b| b.isfile(path))
    }

    fn get_profiles(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.call(|| format!("get_profiles({:?})", path), |b| b.get_profiles(path))
    }

    fn read_profile(&self, path: &str, name: &str) -> Result<Vec<u8>> {
        self.call(
            || format!("read_profile({:?}, {:?})", path, name),
            |b| b.read_profile(path, name),
        )
    }

    fn write_profile(&self, path: &str, name: &str, content: &[u8]) -> Result<Revision> {
        self.call(
            || format!("write_profile({:?}, {:?}, {})", path, name, bytes(content)),
            |b| b.write_profile(path, name, content),
        )
    }

    fn unlink_profile(&self, path: &str, name: &str) -> Result<Revision> {
        self.call(
            || format!("unlink_profile({:?}, {:?})", path, name),
            |b| b.unlink_profile(path, name),
        )
    }

    fn profile_attributes(&self, path: &str, name: &str) -> Result<Attributes> {
        self.call(
            || format!("profile_attributes({:?}, {:?})", path, name),
            |b| b.profile_attributes(path, name),
        )
    }
}
