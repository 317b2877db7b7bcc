// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the engine.
//!
//! Primary mutations propagate; observational operations (heartbeat,
//! idle labels, slot sets) warn and continue at their call sites.

use gt_adapters::{GitError, SessionError, TrackerError};
use gt_core::address::AddressError;
use gt_core::role::RoleContextError;
use gt_core::town::TownError;
use thiserror::Error;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bead, rig, or session missing. Surfaced, not retried.
    #[error("not found: {0}")]
    NotFound(String),
    /// Existing molecule without force, or a stale hook on a live
    /// agent. Surfaced, not retried.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Tracker init/schema/connection problem. Fatal; retries
    /// short-circuit.
    #[error("configuration error: {0}")]
    Config(String),
    /// Store still failing after the retry budget.
    #[error("store error: {0}")]
    Store(String),
    /// tmux session gone or no server. Propagated, never queued.
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Git(#[from] GitError),
    /// Shutdown refused; user action required.
    #[error("uncommitted work in {workspace}: {report}")]
    UncommittedWork { workspace: String, report: String },
    /// Another process holds the worker identity lock.
    #[error("identity collision: lock held by {holder}")]
    IdentityCollision { holder: String },
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    RoleContext(#[from] RoleContextError),
    #[error(transparent)]
    Town(#[from] TownError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Invalid(String),
}

impl From<TrackerError> for EngineError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotFound(msg) => EngineError::NotFound(msg),
            TrackerError::Config(msg) => EngineError::Config(msg),
            TrackerError::Transient(msg) => EngineError::Store(msg),
            TrackerError::CommandFailed(msg) | TrackerError::Parse(msg) => {
                EngineError::Store(msg)
            }
        }
    }
}

impl EngineError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}
