mod common;

use std::fs;

use vost_backend::*;

// ---------------------------------------------------------------------------
// mkdir
// ---------------------------------------------------------------------------

#[test]
fn mkdir_creates_intermediate_directories() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, rec) = common::recording_backend(dir.path());
    backend.mkdir("/a/b/c").unwrap();
    assert!(dir.path().join("a/b/c").is_dir());
    assert!(backend.isdir("/a/b").unwrap());
    assert_eq!(rec.stage_calls(), 0);
}

#[test]
fn mkdir_existing_is_already_exists() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, rec) = common::recording_backend(dir.path());
    backend.write("/f", b"x", Default::default()).unwrap();
    backend.mkdir("/d").unwrap();

    assert!(matches!(backend.mkdir("/d"), Err(Error::AlreadyExists(_))));
    assert!(matches!(backend.mkdir("/f"), Err(Error::AlreadyExists(_))));
    assert_eq!(rec.commit_count(), 1);
}

#[test]
fn mkdir_root_and_outside_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, _rec) = common::recording_backend(dir.path());
    assert!(matches!(backend.mkdir("/"), Err(Error::InvalidPath(_))));
    assert!(matches!(backend.mkdir("/../d"), Err(Error::OutsideRoot(_))));
}

// ---------------------------------------------------------------------------
// rmdir
// ---------------------------------------------------------------------------

#[test]
fn rmdir_removes_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, rec) = common::recording_backend(dir.path());
    backend.mkdir("/d").unwrap();
    backend.rmdir("/d").unwrap();
    assert!(!dir.path().join("d").exists());
    assert_eq!(rec.stage_calls(), 0);
}

#[test]
fn rmdir_non_empty_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, rec) = common::recording_backend(dir.path());
    backend.write("/d/a.txt", b"a", Default::default()).unwrap();

    assert!(matches!(backend.rmdir("/d"), Err(Error::NotEmpty(_))));
    assert!(dir.path().join("d/a.txt").is_file());
    assert_eq!(rec.commit_count(), 1);
}

#[test]
fn rmdir_counts_hidden_entries() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, _rec) = common::recording_backend(dir.path());
    fs::create_dir_all(dir.path().join("d/.git")).unwrap();
    assert!(backend.getdir("/d").unwrap().is_empty());
    assert!(matches!(backend.rmdir("/d"), Err(Error::NotEmpty(_))));
}

#[test]
fn rmdir_errors() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, _rec) = common::recording_backend(dir.path());
    backend.write("/f", b"x", Default::default()).unwrap();
    assert!(matches!(backend.rmdir("/missing"), Err(Error::NotFound(_))));
    assert!(matches!(backend.rmdir("/f"), Err(Error::NotADirectory(_))));
    assert!(matches!(backend.rmdir("/"), Err(Error::InvalidPath(_))));
}
