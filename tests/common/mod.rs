use std::path::Path;
use std::sync::{Arc, Mutex};

use vost_backend::*;

/// One commit seen by [`RecordingVcs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    pub staged: Vec<String>,
    pub message: String,
    pub author: String,
}

#[derive(Default)]
struct State {
    pending: Vec<String>,
    commits: Vec<RecordedCommit>,
    stage_calls: usize,
    fail_commits: bool,
}

/// Shared view of everything a [`RecordingVcs`] was asked to do.
#[derive(Clone, Default)]
pub struct Recorder {
    state: Arc<Mutex<State>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.state.lock().unwrap().commits.clone()
    }

    pub fn commit_count(&self) -> usize {
        self.state.lock().unwrap().commits.len()
    }

    pub fn stage_calls(&self) -> usize {
        self.state.lock().unwrap().stage_calls
    }

    pub fn last(&self) -> RecordedCommit {
        self.commits().pop().expect("no commit recorded")
    }

    pub fn fail_commits(&self, fail: bool) {
        self.state.lock().unwrap().fail_commits = fail;
    }
}

/// Collaborator double: records staged paths and yields `r1`, `r2`, ...
pub struct RecordingVcs {
    recorder: Recorder,
}

impl VersionControl for RecordingVcs {
    fn stage(&mut self, paths: &[String]) -> Result<()> {
        let mut state = self.recorder.state.lock().unwrap();
        state.stage_calls += 1;
        state.pending.extend(paths.iter().cloned());
        Ok(())
    }

    fn commit(&mut self, message: &str, author: &str) -> Result<Revision> {
        let mut state = self.recorder.state.lock().unwrap();
        let staged = std::mem::take(&mut state.pending);
        if state.fail_commits {
            return Err(Error::repository_msg("collaborator unavailable"));
        }
        state.commits.push(RecordedCommit {
            staged,
            message: message.to_string(),
            author: author.to_string(),
        });
        Ok(Revision::new(format!("r{}", state.commits.len())))
    }
}

/// Backend over `dir` recording into a fresh [`RecordingVcs`].
#[allow(dead_code)]
pub fn recording_backend(dir: &Path) -> (VersionedBackend, Recorder) {
    recording_backend_with(&BackendConfig::new(dir))
}

#[allow(dead_code)]
pub fn recording_backend_with(config: &BackendConfig) -> (VersionedBackend, Recorder) {
    let recorder = Recorder::default();
    let vcs = RecordingVcs {
        recorder: recorder.clone(),
    };
    let backend = VersionedBackend::new(config, Box::new(vcs)).unwrap();
    (backend, recorder)
}

/// Backend over a freshly initialized git repository in `dir`.
#[allow(dead_code)]
pub fn git_backend(dir: &Path) -> VersionedBackend {
    git2::Repository::init(dir).unwrap();
    VersionedBackend::open_git(&BackendConfig::new(dir).committer("Tester <tester@example.com>"))
        .unwrap()
}

/// Sorted blob paths in the tree at HEAD.
#[allow(dead_code)]
pub fn head_files(dir: &Path) -> Vec<String> {
    let repo = git2::Repository::open(dir).unwrap();
    let tree = repo.head().unwrap().peel_to_tree().unwrap();
    let mut out = Vec::new();
    tree.walk(git2::TreeWalkMode::PreOrder, |parent, entry| {
        if entry.kind() == Some(git2::ObjectType::Blob) {
            out.push(format!("{}{}", parent, entry.name().unwrap()));
        }
        git2::TreeWalkResult::Ok
    })
    .unwrap();
    out.sort();
    out
}

/// Content of `path` in the tree at HEAD.
#[allow(dead_code)]
pub fn head_blob(dir: &Path, path: &str) -> Vec<u8> {
    let repo = git2::Repository::open(dir).unwrap();
    let tree = repo.head().unwrap().peel_to_tree().unwrap();
    let entry = tree.get_path(Path::new(path)).unwrap();
    let blob = repo.find_blob(entry.id()).unwrap();
    blob.content().to_vec()
}

#[allow(dead_code)]
pub fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
}
