use std::fs::OpenOptions;
use std::path::Path;

use fs2::FileExt;

use crate::error::{Error, Result};

/// Hold an exclusive advisory lock on `lock_path` while running `f`.
///
/// Serializes local-mutate + commit sequences across processes that share
/// one repository. The lock file is created if missing and left in place.
/// Blocks until the lock is available.
///
/// # Errors
/// Returns [`Error::Io`] if the lock file cannot be opened or locked, or
/// whatever `f` returns.
pub fn with_file_lock<F, T>(lock_path: &Path, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)
        .map_err(|e| Error::io(lock_path, e))?;
    file.lock_exclusive().map_err(|e| Error::io(lock_path, e))?;

    let result = f();

    if let Err(e) = FileExt::unlock(&file) {
        log::warn!("unable to release lock {}: {}", lock_path.display(), e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn runs_closure_and_returns_value() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("x.lock");
        let v = with_file_lock(&lock, || Ok(42)).unwrap();
        assert_eq!(v, 42);
        assert!(lock.exists());
    }

    #[test]
    fn propagates_closure_error() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("x.lock");
        let err = with_file_lock::<_, ()>(&lock, || Err(Error::not_found("x"))).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        // Released: can be taken again.
        assert!(with_file_lock(&lock, || Ok(())).is_ok());
    }

    #[test]
    fn serializes_threads() {
        let dir = tempfile::tempdir().unwrap();
        let lock = Arc::new(dir.path().join("x.lock"));
        let inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let inside = Arc::clone(&inside);
                std::thread::spawn(move || {
                    with_file_lock(&lock, || {
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
