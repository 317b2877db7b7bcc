// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-worker identity lock.
//!
//! A worker (polecat, crew) takes an exclusive flock on a lock file in
//! its workspace before completing the prime handshake. A second
//! claimant with a live holder is an identity collision and fails fast
//! with the holder's diagnostics; stale-lock repair is an operator
//! command, not automatic.

use crate::error::EngineError;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = ".gt-identity.lock";

/// Who holds (or held) an identity lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub session_id: String,
    pub acquired_at: String,
}

/// A held identity lock. Released on drop.
#[derive(Debug)]
pub struct IdentityLock {
    file: File,
    path: PathBuf,
}

impl IdentityLock {
    /// Acquire the identity lock for a workspace.
    pub fn acquire(workspace: &Path, session_id: &str) -> Result<Self, EngineError> {
        std::fs::create_dir_all(workspace)?;
        let path = workspace.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            // Identity collision: read the holder for diagnostics.
            let mut content = String::new();
            let _ = file.read_to_string(&mut content);
            let holder = serde_json::from_str::<LockInfo>(&content)
                .map(|info| {
                    format!(
                        "pid {} (session {}, since {})",
                        info.pid, info.session_id, info.acquired_at
                    )
                })
                .unwrap_or_else(|_| "unknown holder".to_string());
            return Err(EngineError::IdentityCollision { holder });
        }

        let info = LockInfo {
            pid: std::process::id(),
            session_id: session_id.to_string(),
            acquired_at: gt_core::time_fmt::format_utc_now(),
        };
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        let json = serde_json::to_string_pretty(&info).map_err(std::io::Error::other)?;
        file.write_all(json.as_bytes())?;
        file.flush()?;

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the recorded holder of a workspace's lock file, if any.
    /// Does not say whether the lock is currently held.
    pub fn holder(workspace: &Path) -> Option<LockInfo> {
        let content = std::fs::read_to_string(workspace.join(LOCK_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Operator repair: remove a lock file outright. Only safe once the
    /// holder is known dead.
    pub fn repair(workspace: &Path) -> Result<(), EngineError> {
        let path = workspace.join(LOCK_FILE);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}

impl Drop for IdentityLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
