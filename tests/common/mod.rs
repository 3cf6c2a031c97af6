//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use git_commitai::llm::ChatRequest;
use git_commitai::{CompletionClient, EditorError, EditorLauncher, ProviderError, SystemGit};

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository on `main` in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        repo.set_head("refs/heads/main").expect("Failed to point HEAD at main");

        let mut config = repo.config().expect("Failed to open repo config");
        config.set_str("user.name", "Test User").expect("Failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Failed to set user.email");
        config.set_bool("commit.gpgsign", false).expect("Failed to set commit.gpgsign");

        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git_dir(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }

    /// Runner operating in this repository.
    pub fn git(&self) -> SystemGit {
        SystemGit::new(self.path())
    }

    /// Write a file relative to the repository root.
    pub fn write(&self, path: &str, content: impl AsRef<[u8]>) {
        let full = self.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(full, content).expect("Failed to write test file");
    }

    /// Add a path to the index.
    pub fn stage(&self, path: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index.read(true).expect("Failed to read index");
        index.add_path(Path::new(path)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Remove a path from the index and the working tree.
    pub fn stage_removal(&self, path: &str) {
        std::fs::remove_file(self.path().join(path)).expect("Failed to remove file");
        let mut index = self.repo.index().expect("Failed to get index");
        index.read(true).expect("Failed to read index");
        index.remove_path(Path::new(path)).expect("Failed to remove from index");
        index.write().expect("Failed to write index");
    }

    /// Write and stage a file.
    pub fn add(&self, path: &str, content: impl AsRef<[u8]>) {
        self.write(path, content);
        self.stage(path);
    }

    /// Commit the current index. Returns the commit OID.
    pub fn commit(&self, message: &str) -> Oid {
        let sig = Signature::now("Test User", "test@example.com").expect("Failed to create signature");

        let mut index = self.repo.index().expect("Failed to get index");
        index.read(true).expect("Failed to read index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Write, stage and commit a single file.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> Oid {
        self.add(path, content);
        self.commit(message)
    }

    /// Full message of HEAD, if there is a HEAD.
    pub fn head_message(&self) -> Option<String> {
        let repo = Repository::open(self.path()).expect("Failed to reopen repo");
        let head = repo.head().ok()?.peel_to_commit().ok()?;
        head.message().map(str::to_string)
    }

    pub fn commit_count(&self) -> usize {
        let repo = Repository::open(self.path()).expect("Failed to reopen repo");
        let Ok(head) = repo.head() else {
            return 0;
        };
        let mut walk = repo.revwalk().expect("Failed to walk history");
        walk.push(head.target().expect("HEAD has no target"))
            .expect("Failed to push HEAD");
        walk.count()
    }

    /// Paths and blob ids currently in the index, as written on disk.
    pub fn index_snapshot(&self) -> Vec<(String, Oid)> {
        let repo = Repository::open(self.path()).expect("Failed to reopen repo");
        let index = repo.index().expect("Failed to get index");
        index
            .iter()
            .map(|e| (String::from_utf8_lossy(&e.path).to_string(), e.id))
            .collect()
    }
}

/// Provider stand-in that returns a fixed draft and records requests.
pub struct StubClient {
    reply: Option<String>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl StubClient {
    pub fn replying(draft: &str) -> Self {
        Self {
            reply: Some(draft.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers with no content.
    pub fn empty() -> Self {
        Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// User message of the last request.
    pub fn last_prompt(&self) -> String {
        let requests = self.requests.lock().unwrap();
        let request = requests.last().expect("No request was sent");
        request.messages.last().expect("Request has no messages").content.clone()
    }
}

#[async_trait]
impl CompletionClient for StubClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone().ok_or(ProviderError::EmptyResponse)
    }
}

/// Editor stand-in that records the buffer and optionally rewrites it.
pub struct StubEditor {
    rewrite: Option<String>,
    exit_code: i32,
    pub buffer: Mutex<Option<String>>,
}

impl StubEditor {
    /// Save the buffer unchanged.
    pub fn accepting() -> Self {
        Self {
            rewrite: None,
            exit_code: 0,
            buffer: Mutex::new(None),
        }
    }

    /// Replace the buffer with `text`.
    pub fn rewriting(text: &str) -> Self {
        Self {
            rewrite: Some(text.to_string()),
            exit_code: 0,
            buffer: Mutex::new(None),
        }
    }

    /// Exit with `code` without touching the buffer.
    pub fn failing(code: i32) -> Self {
        Self {
            rewrite: None,
            exit_code: code,
            buffer: Mutex::new(None),
        }
    }

    /// Buffer contents as the editor saw them.
    pub fn seen(&self) -> String {
        self.buffer.lock().unwrap().clone().expect("Editor was not launched")
    }

    pub fn was_launched(&self) -> bool {
        self.buffer.lock().unwrap().is_some()
    }
}

#[async_trait]
impl EditorLauncher for StubEditor {
    async fn edit(&self, path: &Path) -> Result<i32, EditorError> {
        let text = std::fs::read_to_string(path).map_err(EditorError::BufferWrite)?;
        *self.buffer.lock().unwrap() = Some(text);
        if let Some(rewrite) = &self.rewrite {
            std::fs::write(path, rewrite).map_err(EditorError::BufferWrite)?;
        }
        Ok(self.exit_code)
    }

    fn name(&self) -> String {
        "stub".to_string()
    }
}
