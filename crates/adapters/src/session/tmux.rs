// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux session adapter

use super::{
    RuntimeConfig, SessionError, SessionInfo, Sessions, PASTE_SETTLE, POLL_INTERVAL,
    UNKNOWN_AGENT_READY_DELAY,
};
use crate::subprocess::{run_with_timeout, TMUX_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Tmux-based session adapter.
#[derive(Clone, Default)]
pub struct TmuxSessions;

impl TmuxSessions {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output, SessionError> {
        let mut cmd = Command::new("tmux");
        cmd.args(args);
        run_with_timeout(cmd, TMUX_TIMEOUT, "tmux")
            .await
            .map_err(SessionError::CommandFailed)
    }

    /// Map a failed tmux invocation to the right terminal error.
    fn failure(target: &str, output: &std::process::Output) -> SessionError {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("no server running") || stderr.contains("error connecting to") {
            SessionError::NoServer
        } else {
            SessionError::NotFound(target.to_string())
        }
    }
}

#[async_trait]
impl Sessions for TmuxSessions {
    async fn has_session(&self, name: &str) -> Result<bool, SessionError> {
        let output = self.run(&["has-session", "-t", name]).await?;
        Ok(output.status.success())
    }

    async fn new_session_with_command(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<(), SessionError> {
        // Precondition: cwd must exist
        if !cwd.exists() {
            return Err(SessionError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }

        let mut tmux_cmd = Command::new("tmux");
        tmux_cmd
            .arg("new-session")
            .arg("-d")
            .arg("-s")
            .arg(name)
            .arg("-c")
            .arg(cwd);

        for (key, value) in env {
            tmux_cmd.arg("-e").arg(format!("{}={}", key, value));
        }

        tmux_cmd.arg(cmd);

        let output = run_with_timeout(tmux_cmd, TMUX_TIMEOUT, "tmux new-session")
            .await
            .map_err(SessionError::SpawnFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(session = name, stderr = %stderr, "tmux spawn failed");
            return Err(SessionError::SpawnFailed(stderr.to_string()));
        }

        // Log stderr even on success - may contain useful warnings
        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(session = name, stderr = %stderr, "tmux spawn stderr (non-fatal)");
        }

        Ok(())
    }

    async fn kill_session(&self, name: &str) -> Result<(), SessionError> {
        let _ = self.run(&["kill-session", "-t", name]).await?;
        // Session might already be dead, which is fine
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, SessionError> {
        let output = self
            .run(&["list-sessions", "-F", "#{session_name} #{session_created}"])
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // No server means no sessions, not an error for listing.
            if stderr.contains("no server running") || stderr.contains("error connecting to") {
                return Ok(Vec::new());
            }
            return Err(SessionError::CommandFailed(stderr.to_string()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut sessions = Vec::new();
        for line in stdout.lines() {
            let mut parts = line.split_whitespace();
            let (Some(name), Some(created)) = (parts.next(), parts.next()) else {
                continue;
            };
            sessions.push(SessionInfo {
                name: name.to_string(),
                created_unix: created.parse().unwrap_or(0),
            });
        }
        Ok(sessions)
    }

    async fn created_unix(&self, name: &str) -> Result<i64, SessionError> {
        let output = self
            .run(&[
                "display-message",
                "-t",
                name,
                "-p",
                "#{session_created}",
            ])
            .await?;
        if !output.status.success() {
            return Err(Self::failure(name, &output));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse()
            .map_err(|_| SessionError::CommandFailed(format!("bad session_created: {stdout}")))
    }

    async fn nudge_session(&self, name: &str, text: &str) -> Result<(), SessionError> {
        self.nudge_pane(name, text).await
    }

    async fn nudge_pane(&self, pane: &str, text: &str) -> Result<(), SessionError> {
        // Phase 1: literal paste. -l = literal mode, -- = end of options
        // (handles text starting with -).
        let output = self
            .run(&["send-keys", "-t", pane, "-l", "--", text])
            .await?;
        if !output.status.success() {
            return Err(Self::failure(pane, &output));
        }

        // Phase 2: let the runtime's paste handling settle.
        tokio::time::sleep(PASTE_SETTLE).await;

        // Phase 3: Enter as a separate key event.
        let output = self.run(&["send-keys", "-t", pane, "Enter"]).await?;
        if !output.status.success() {
            return Err(Self::failure(pane, &output));
        }
        Ok(())
    }

    async fn capture_pane(&self, name: &str, lines: u32) -> Result<String, SessionError> {
        let start = format!("-{}", lines);
        let output = self
            .run(&["capture-pane", "-t", name, "-p", "-S", &start])
            .await?;
        if !output.status.success() {
            return Err(Self::failure(name, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn wait_for_idle(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<bool, SessionError> {
        // Idle = pane content stable across two polls.
        let deadline = Instant::now() + timeout;
        let mut previous = self.capture_pane(name, 40).await?;
        loop {
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            let current = self.capture_pane(name, 40).await?;
            if current == previous {
                return Ok(true);
            }
            previous = current;
        }
    }

    async fn wait_for_runtime_ready(
        &self,
        name: &str,
        runtime: &RuntimeConfig,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let deadline = Instant::now() + timeout;

        // Tier 0: wait for the agent process to replace the shell.
        loop {
            if !self.has_session(name).await? {
                return Err(SessionError::NotFound(name.to_string()));
            }
            if self.is_agent_running(name, &runtime.process_name).await? {
                break;
            }
            if Instant::now() >= deadline {
                return Err(SessionError::Timeout(format!(
                    "agent process in {}",
                    name
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        match &runtime.ready_prompt_prefix {
            // Tier 1: known preset: poll for the ready prompt.
            Some(prefix) => loop {
                let pane = self.capture_pane(name, 40).await?;
                if pane.lines().any(|l| l.trim_start().starts_with(prefix)) {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    return Err(SessionError::Timeout(format!(
                        "ready prompt in {}",
                        name
                    )));
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            },
            // Tier 2: unknown agent: fixed post-shell delay.
            None => {
                tokio::time::sleep(UNKNOWN_AGENT_READY_DELAY).await;
                Ok(())
            }
        }
    }

    async fn is_agent_running(
        &self,
        name: &str,
        process_name: &str,
    ) -> Result<bool, SessionError> {
        // Get the pane PID
        let output = self
            .run(&["list-panes", "-t", name, "-F", "#{pane_pid}"])
            .await?;
        if !output.status.success() {
            return Err(Self::failure(name, &output));
        }

        let pane_pid = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if pane_pid.is_empty() {
            return Ok(false);
        }

        // Check both the pane process itself and its children:
        // - ps: tmux may exec the command directly
        // - pgrep: the command may run under a shell
        let mut ps = Command::new("ps");
        ps.args(["-p", &pane_pid, "-o", "command="]);
        let ps_output = run_with_timeout(ps, TMUX_TIMEOUT, "ps")
            .await
            .map_err(SessionError::CommandFailed)?;
        if ps_output.status.success()
            && String::from_utf8_lossy(&ps_output.stdout).contains(process_name)
        {
            return Ok(true);
        }

        let mut pgrep = Command::new("pgrep");
        pgrep.args(["-P", &pane_pid, "-f", process_name]);
        let pgrep_output = run_with_timeout(pgrep, TMUX_TIMEOUT, "pgrep")
            .await
            .map_err(SessionError::CommandFailed)?;
        Ok(pgrep_output.status.success())
    }

    async fn accept_bypass_permissions_warning(
        &self,
        name: &str,
    ) -> Result<(), SessionError> {
        let pane = self.capture_pane(name, 40).await?;
        if pane.contains("Bypass Permissions") || pane.contains("bypass permissions") {
            // The warning dialog accepts on "2" (Yes, I accept).
            let output = self.run(&["send-keys", "-t", name, "2"]).await?;
            if !output.status.success() {
                return Err(Self::failure(name, &output));
            }
        }
        Ok(())
    }

    async fn get_environment(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<String>, SessionError> {
        let output = self.run(&["show-environment", "-t", name, key]).await?;
        if !output.status.success() {
            // Unset variables exit non-zero; distinguish from a dead session.
            if self.has_session(name).await? {
                return Ok(None);
            }
            return Err(Self::failure(name, &output));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .trim()
            .strip_prefix(&format!("{}=", key))
            .map(str::to_string))
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
