// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake session adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{RuntimeConfig, SessionError, SessionInfo, Sessions};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Recorded session call
#[derive(Debug, Clone)]
pub enum SessionCall {
    HasSession { name: String },
    Spawn {
        name: String,
        cwd: PathBuf,
        cmd: String,
        env: Vec<(String, String)>,
    },
    Kill { name: String },
    Nudge { target: String, text: String },
    WaitForIdle { name: String },
    WaitForReady { name: String },
    AcceptBypass { name: String },
}

/// Fake session state
#[derive(Debug, Clone)]
pub struct FakeSession {
    pub name: String,
    pub cwd: PathBuf,
    pub cmd: String,
    pub env: Vec<(String, String)>,
    pub pane: Vec<String>,
    pub alive: bool,
    pub created_unix: i64,
    pub idle: bool,
    pub agent_running: bool,
}

struct FakeSessionsState {
    sessions: HashMap<String, FakeSession>,
    calls: Vec<SessionCall>,
    server_up: bool,
    now_unix: i64,
}

/// Fake session adapter for testing
#[derive(Clone)]
pub struct FakeSessions {
    inner: Arc<Mutex<FakeSessionsState>>,
}

impl Default for FakeSessions {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeSessionsState {
                sessions: HashMap::new(),
                calls: Vec::new(),
                server_up: true,
                now_unix: 1_700_000_000,
            })),
        }
    }
}

impl FakeSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SessionCall> {
        self.inner.lock().calls.clone()
    }

    /// Nudge texts delivered to a target, in order.
    pub fn nudges_for(&self, target: &str) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SessionCall::Nudge { target: t, text } if t == target => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn get_session(&self, name: &str) -> Option<FakeSession> {
        self.inner.lock().sessions.get(name).cloned()
    }

    /// Add a pre-existing session (for liveness checks).
    pub fn add_session(&self, name: &str, alive: bool) {
        let now = self.inner.lock().now_unix;
        self.add_session_created(name, alive, now);
    }

    /// Add a session with an explicit creation time.
    pub fn add_session_created(&self, name: &str, alive: bool, created_unix: i64) {
        self.inner.lock().sessions.insert(
            name.to_string(),
            FakeSession {
                name: name.to_string(),
                cwd: PathBuf::new(),
                cmd: String::new(),
                env: Vec::new(),
                pane: Vec::new(),
                alive,
                created_unix,
                idle: true,
                agent_running: alive,
            },
        );
    }

    pub fn set_pane(&self, name: &str, lines: Vec<String>) {
        if let Some(session) = self.inner.lock().sessions.get_mut(name) {
            session.pane = lines;
        }
    }

    pub fn set_idle(&self, name: &str, idle: bool) {
        if let Some(session) = self.inner.lock().sessions.get_mut(name) {
            session.idle = idle;
        }
    }

    pub fn set_agent_running(&self, name: &str, running: bool) {
        if let Some(session) = self.inner.lock().sessions.get_mut(name) {
            session.agent_running = running;
        }
    }

    /// Simulate the tmux server being down.
    pub fn stop_server(&self) {
        let mut inner = self.inner.lock();
        inner.server_up = false;
        inner.sessions.clear();
    }

    /// Advance the fake clock used for session creation times.
    pub fn advance_clock(&self, secs: i64) {
        self.inner.lock().now_unix += secs;
    }

    pub fn now_unix(&self) -> i64 {
        self.inner.lock().now_unix
    }

    fn check_server(&self) -> Result<(), SessionError> {
        if self.inner.lock().server_up {
            Ok(())
        } else {
            Err(SessionError::NoServer)
        }
    }
}

#[async_trait]
impl Sessions for FakeSessions {
    async fn has_session(&self, name: &str) -> Result<bool, SessionError> {
        self.check_server()?;
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::HasSession {
            name: name.to_string(),
        });
        Ok(inner.sessions.get(name).map(|s| s.alive).unwrap_or(false))
    }

    async fn new_session_with_command(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<(), SessionError> {
        self.check_server()?;
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Spawn {
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            cmd: cmd.to_string(),
            env: env.to_vec(),
        });
        let created_unix = inner.now_unix;
        inner.sessions.insert(
            name.to_string(),
            FakeSession {
                name: name.to_string(),
                cwd: cwd.to_path_buf(),
                cmd: cmd.to_string(),
                env: env.to_vec(),
                pane: Vec::new(),
                alive: true,
                created_unix,
                idle: true,
                agent_running: true,
            },
        );
        Ok(())
    }

    async fn kill_session(&self, name: &str) -> Result<(), SessionError> {
        self.check_server()?;
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Kill {
            name: name.to_string(),
        });
        if let Some(session) = inner.sessions.get_mut(name) {
            session.alive = false;
            session.agent_running = false;
        }
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, SessionError> {
        if !self.inner.lock().server_up {
            return Ok(Vec::new());
        }
        let inner = self.inner.lock();
        let mut sessions: Vec<SessionInfo> = inner
            .sessions
            .values()
            .filter(|s| s.alive)
            .map(|s| SessionInfo {
                name: s.name.clone(),
                created_unix: s.created_unix,
            })
            .collect();
        sessions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sessions)
    }

    async fn created_unix(&self, name: &str) -> Result<i64, SessionError> {
        self.check_server()?;
        let inner = self.inner.lock();
        inner
            .sessions
            .get(name)
            .filter(|s| s.alive)
            .map(|s| s.created_unix)
            .ok_or_else(|| SessionError::NotFound(name.to_string()))
    }

    async fn nudge_session(&self, name: &str, text: &str) -> Result<(), SessionError> {
        self.nudge_pane(name, text).await
    }

    async fn nudge_pane(&self, pane: &str, text: &str) -> Result<(), SessionError> {
        self.check_server()?;
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Nudge {
            target: pane.to_string(),
            text: text.to_string(),
        });
        match inner.sessions.get_mut(pane) {
            Some(session) if session.alive => {
                session.pane.push(text.to_string());
                Ok(())
            }
            _ => Err(SessionError::NotFound(pane.to_string())),
        }
    }

    async fn capture_pane(&self, name: &str, lines: u32) -> Result<String, SessionError> {
        self.check_server()?;
        let inner = self.inner.lock();
        match inner.sessions.get(name) {
            Some(session) if session.alive => {
                let start = session.pane.len().saturating_sub(lines as usize);
                Ok(session.pane[start..].join("\n"))
            }
            _ => Err(SessionError::NotFound(name.to_string())),
        }
    }

    async fn wait_for_idle(
        &self,
        name: &str,
        _timeout: Duration,
    ) -> Result<bool, SessionError> {
        self.check_server()?;
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::WaitForIdle {
            name: name.to_string(),
        });
        match inner.sessions.get(name) {
            Some(session) if session.alive => Ok(session.idle),
            _ => Err(SessionError::NotFound(name.to_string())),
        }
    }

    async fn wait_for_runtime_ready(
        &self,
        name: &str,
        _runtime: &RuntimeConfig,
        _timeout: Duration,
    ) -> Result<(), SessionError> {
        self.check_server()?;
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::WaitForReady {
            name: name.to_string(),
        });
        match inner.sessions.get(name) {
            Some(session) if session.alive && session.agent_running => Ok(()),
            Some(_) => Err(SessionError::Timeout(format!("agent process in {name}"))),
            None => Err(SessionError::NotFound(name.to_string())),
        }
    }

    async fn is_agent_running(
        &self,
        name: &str,
        _process_name: &str,
    ) -> Result<bool, SessionError> {
        self.check_server()?;
        let inner = self.inner.lock();
        Ok(inner
            .sessions
            .get(name)
            .map(|s| s.alive && s.agent_running)
            .unwrap_or(false))
    }

    async fn accept_bypass_permissions_warning(
        &self,
        name: &str,
    ) -> Result<(), SessionError> {
        self.check_server()?;
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::AcceptBypass {
            name: name.to_string(),
        });
        if !inner.sessions.contains_key(name) {
            return Err(SessionError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn get_environment(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<String>, SessionError> {
        self.check_server()?;
        let inner = self.inner.lock();
        match inner.sessions.get(name) {
            Some(session) if session.alive => Ok(session
                .env
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())),
            _ => Err(SessionError::NotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
