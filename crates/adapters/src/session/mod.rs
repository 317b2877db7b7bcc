// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal-multiplexer session adapters.
//!
//! Sessions host interactive LLM agents. Text delivery into a pane goes
//! through [`Sessions::nudge_session`] exclusively: literal send, paste
//! settle, then Enter as a separate key event; any other path glitches
//! interactive agents mid-paste.

mod tmux;

pub use tmux::TmuxSessions;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSession, FakeSessions, SessionCall};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Delay between the literal paste and the Enter key event.
pub const PASTE_SETTLE: Duration = Duration::from_millis(500);

/// Poll interval for readiness and idle detection.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Post-shell delay for agents without a configured ready prompt.
pub const UNKNOWN_AGENT_READY_DELAY: Duration = Duration::from_secs(1);

/// Errors from session operations.
///
/// `NotFound` and `NoServer` are terminal: the session cannot receive
/// anything, so callers must not queue or retry against it.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("no tmux server running")]
    NoServer,
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("timed out waiting for {0}")]
    Timeout(String),
}

impl SessionError {
    /// Terminal errors: the target can never receive delivery.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionError::NotFound(_) | SessionError::NoServer)
    }
}

/// One live session as reported by the multiplexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub name: String,
    pub created_unix: i64,
}

/// Runtime configuration for the agent process inside a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Startup command line for the agent.
    pub command: String,
    /// Pane-content prefix that marks the agent's ready prompt. When
    /// absent, readiness falls back to a fixed post-shell delay.
    pub ready_prompt_prefix: Option<String>,
    /// Process name to look for inside the pane.
    pub process_name: String,
}

/// Adapter for terminal-multiplexer sessions.
#[async_trait]
pub trait Sessions: Clone + Send + Sync + 'static {
    async fn has_session(&self, name: &str) -> Result<bool, SessionError>;

    async fn new_session_with_command(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<(), SessionError>;

    async fn kill_session(&self, name: &str) -> Result<(), SessionError>;

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, SessionError>;

    /// Creation time of a session, in Unix seconds.
    async fn created_unix(&self, name: &str) -> Result<i64, SessionError>;

    /// Deliver text to a session: literal paste, settle, Enter.
    async fn nudge_session(&self, name: &str, text: &str) -> Result<(), SessionError>;

    /// Same delivery primitive, addressed to an explicit pane.
    async fn nudge_pane(&self, pane: &str, text: &str) -> Result<(), SessionError>;

    /// Capture the last `lines` lines of the session's pane.
    async fn capture_pane(&self, name: &str, lines: u32) -> Result<String, SessionError>;

    /// Poll until the pane looks idle. `Ok(true)` = idle, `Ok(false)` =
    /// still busy at timeout.
    async fn wait_for_idle(&self, name: &str, timeout: Duration)
        -> Result<bool, SessionError>;

    /// Block until the agent runtime inside the session is ready for
    /// input, or time out.
    async fn wait_for_runtime_ready(
        &self,
        name: &str,
        runtime: &RuntimeConfig,
        timeout: Duration,
    ) -> Result<(), SessionError>;

    /// Whether the agent process is running inside the session.
    async fn is_agent_running(
        &self,
        name: &str,
        process_name: &str,
    ) -> Result<bool, SessionError>;

    /// Dismiss the runtime's bypass-permissions warning prompt if it is
    /// showing.
    async fn accept_bypass_permissions_warning(&self, name: &str)
        -> Result<(), SessionError>;

    /// Read an environment variable from the session.
    async fn get_environment(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<String>, SessionError>;
}
