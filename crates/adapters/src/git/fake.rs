// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake git adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Git, GitError, WorkStatus};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded git call
#[derive(Debug, Clone)]
pub enum GitCall {
    WorktreeAdd {
        repo: PathBuf,
        path: PathBuf,
        branch: String,
        base: String,
    },
    WorktreeRemove {
        path: PathBuf,
        force: bool,
    },
    UncommittedWork {
        path: PathBuf,
    },
    VerifyWorktree {
        path: PathBuf,
    },
}

struct FakeGitState {
    worktrees: HashMap<PathBuf, WorkStatus>,
    calls: Vec<GitCall>,
    /// Next worktree_add silently fails to materialize (spawner
    /// rollback seam).
    silent_add_failure: bool,
    fail_add: bool,
}

/// In-memory git adapter recording every call.
#[derive(Clone)]
pub struct FakeGit {
    inner: Arc<Mutex<FakeGitState>>,
}

impl Default for FakeGit {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeGitState {
                worktrees: HashMap::new(),
                calls: Vec::new(),
                silent_add_failure: false,
                fail_add: false,
            })),
        }
    }
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GitCall> {
        self.inner.lock().calls.clone()
    }

    pub fn has_worktree(&self, path: &Path) -> bool {
        self.inner.lock().worktrees.contains_key(path)
    }

    /// Pretend a worktree already exists with the given status.
    pub fn add_worktree(&self, path: &Path, status: WorkStatus) {
        self.inner.lock().worktrees.insert(path.to_path_buf(), status);
    }

    pub fn set_status(&self, path: &Path, status: WorkStatus) {
        self.inner.lock().worktrees.insert(path.to_path_buf(), status);
    }

    /// The next worktree_add reports success but creates nothing.
    pub fn silent_add_failure(&self) {
        self.inner.lock().silent_add_failure = true;
    }

    /// worktree_add fails loudly.
    pub fn fail_add(&self) {
        self.inner.lock().fail_add = true;
    }
}

#[async_trait]
impl Git for FakeGit {
    async fn worktree_add(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> Result<(), GitError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::WorktreeAdd {
            repo: repo.to_path_buf(),
            path: path.to_path_buf(),
            branch: branch.to_string(),
            base: base.to_string(),
        });
        if inner.fail_add {
            return Err(GitError::CommandFailed("worktree add failed".to_string()));
        }
        if inner.silent_add_failure {
            inner.silent_add_failure = false;
            return Ok(());
        }
        inner
            .worktrees
            .insert(path.to_path_buf(), WorkStatus::default());
        Ok(())
    }

    async fn worktree_remove(
        &self,
        _repo: &Path,
        path: &Path,
        force: bool,
    ) -> Result<(), GitError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::WorktreeRemove {
            path: path.to_path_buf(),
            force,
        });
        let status = inner.worktrees.get(path).copied().unwrap_or_default();
        if !force && !status.is_clean() {
            return Err(GitError::CommandFailed(format!(
                "worktree at {} is dirty",
                path.display()
            )));
        }
        inner.worktrees.remove(path);
        Ok(())
    }

    async fn uncommitted_work(&self, path: &Path) -> Result<WorkStatus, GitError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::UncommittedWork {
            path: path.to_path_buf(),
        });
        inner
            .worktrees
            .get(path)
            .copied()
            .ok_or_else(|| GitError::WorktreeMissing(path.to_path_buf()))
    }

    async fn verify_worktree(&self, path: &Path) -> Result<(), GitError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::VerifyWorktree {
            path: path.to_path_buf(),
        });
        if inner.worktrees.contains_key(path) {
            Ok(())
        } else {
            Err(GitError::WorktreeMissing(path.to_path_buf()))
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
