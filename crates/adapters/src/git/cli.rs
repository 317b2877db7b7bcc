// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git adapter shelling out to the `git` binary.

use super::{worktree_marker_present, Git, GitError, WorkStatus};
use crate::subprocess::{run_with_timeout, GIT_STATUS_TIMEOUT, GIT_WORKTREE_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Production git adapter.
#[derive(Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    async fn run(
        &self,
        cwd: &Path,
        args: &[&str],
        timeout: Duration,
    ) -> Result<std::process::Output, GitError> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(cwd);
        run_with_timeout(cmd, timeout, "git").await.map_err(GitError::CommandFailed)
    }

    async fn run_ok(
        &self,
        cwd: &Path,
        args: &[&str],
        timeout: Duration,
    ) -> Result<String, GitError> {
        let output = self.run(cwd, args, timeout).await?;
        if !output.status.success() {
            return Err(GitError::CommandFailed(format!(
                "git {}: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl Git for GitCli {
    async fn worktree_add(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> Result<(), GitError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let path_str = path.display().to_string();
        self.run_ok(
            repo,
            &["worktree", "add", "-b", branch, &path_str, base],
            GIT_WORKTREE_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    async fn worktree_remove(
        &self,
        repo: &Path,
        path: &Path,
        force: bool,
    ) -> Result<(), GitError> {
        let path_str = path.display().to_string();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path_str);
        let result = self.run_ok(repo, &args, GIT_WORKTREE_TIMEOUT).await;
        // Prune bookkeeping even when the directory is already gone.
        let _ = self
            .run(repo, &["worktree", "prune"], GIT_WORKTREE_TIMEOUT)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(_) if !path.exists() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn uncommitted_work(&self, path: &Path) -> Result<WorkStatus, GitError> {
        let porcelain = self
            .run_ok(path, &["status", "--porcelain"], GIT_STATUS_TIMEOUT)
            .await?;
        let mut status = WorkStatus::default();
        for line in porcelain.lines() {
            if line.starts_with("??") {
                status.untracked += 1;
            } else if !line.trim().is_empty() {
                status.modified += 1;
            }
        }

        let stash = self
            .run_ok(path, &["stash", "list"], GIT_STATUS_TIMEOUT)
            .await
            .unwrap_or_default();
        status.stashed = stash.lines().filter(|l| !l.trim().is_empty()).count() as u32;

        // Unpushed commits relative to upstream; a branch with no
        // upstream counts its whole cherry as unpushed only when it has
        // commits, which `@{u}` cannot tell us; treat as zero.
        if let Ok(out) = self
            .run_ok(
                path,
                &["rev-list", "--count", "@{u}..HEAD"],
                GIT_STATUS_TIMEOUT,
            )
            .await
        {
            status.unpushed = out.trim().parse().unwrap_or(0);
        }

        Ok(status)
    }

    async fn verify_worktree(&self, path: &Path) -> Result<(), GitError> {
        if worktree_marker_present(path) {
            Ok(())
        } else {
            Err(GitError::WorktreeMissing(path.to_path_buf()))
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
