// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git adapter: worktrees and uncommitted-work checks.

mod cli;

pub use cli::GitCli;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeGit, GitCall};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("git command failed: {0}")]
    CommandFailed(String),
    #[error("worktree missing or incomplete at {0}")]
    WorktreeMissing(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counts of uncommitted work in a workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkStatus {
    pub modified: u32,
    pub untracked: u32,
    pub stashed: u32,
    pub unpushed: u32,
}

impl WorkStatus {
    /// Clean iff every counter is zero.
    pub fn is_clean(&self) -> bool {
        self.modified == 0 && self.untracked == 0 && self.stashed == 0 && self.unpushed == 0
    }

    /// Itemized one-line report for shutdown refusals.
    pub fn report(&self) -> String {
        format!(
            "{} modified, {} untracked, {} stashed, {} unpushed",
            self.modified, self.untracked, self.stashed, self.unpushed
        )
    }
}

/// Adapter for the external git binary.
#[async_trait]
pub trait Git: Clone + Send + Sync + 'static {
    /// Create a worktree of `repo` at `path` on a new `branch` forked
    /// from `base`.
    async fn worktree_add(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> Result<(), GitError>;

    /// Remove the worktree at `path`.
    async fn worktree_remove(
        &self,
        repo: &Path,
        path: &Path,
        force: bool,
    ) -> Result<(), GitError>;

    /// Count modified/untracked/stashed/unpushed work under `path`.
    async fn uncommitted_work(&self, path: &Path) -> Result<WorkStatus, GitError>;

    /// Insist the worktree exists: directory plus its `.git` marker
    /// (file or directory). Catches silent worktree-create failures.
    async fn verify_worktree(&self, path: &Path) -> Result<(), GitError>;
}

/// Filesystem check shared by the real and fake adapters' defaults.
pub(crate) fn worktree_marker_present(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    let marker = path.join(".git");
    marker.is_file() || marker.is_dir()
}
