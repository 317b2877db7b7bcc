// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracker adapter: every read and mutation of the durable store.
//!
//! The store is the external `bd` binary over a shared database. The
//! trait surface mirrors bd's documented argument surface; routing picks
//! the store directory from the bead-id prefix via the routes table.

mod bd;
mod routes;

pub use bd::BdTracker;
pub use routes::{append_route, load_routes, remove_route, Route};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTracker, TrackerCall};

use async_trait::async_trait;
use gt_core::bead::{Bead, BeadStatus, BeadType, DepDirection, DepType, Dependency};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Bead does not exist. Surfaced, never retried.
    #[error("bead not found: {0}")]
    NotFound(String),
    /// Tracker reports an init/schema/connection problem. Fatal; callers
    /// short-circuit their retry loops.
    #[error("tracker configuration error: {0}")]
    Config(String),
    /// Retryable store condition ("database out of sync" and friends).
    #[error("transient tracker error: {0}")]
    Transient(String),
    /// Could not run the tracker binary at all.
    #[error("tracker invocation failed: {0}")]
    CommandFailed(String),
    /// Tracker produced output the client could not understand.
    #[error("unparseable tracker output: {0}")]
    Parse(String),
}

impl TrackerError {
    /// Classify a failure message from the tracker.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if gt_core::retry::is_config_error(&message) {
            TrackerError::Config(message)
        } else if lower.contains("not found") || lower.contains("no such issue") {
            TrackerError::NotFound(message)
        } else {
            TrackerError::Transient(message)
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackerError::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackerError::NotFound(_))
    }
}

/// Filter for [`Tracker::list`]. `None` fields do not constrain; a
/// status of `"all"` is normalized to no status filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub parent: Option<String>,
    pub bead_type: Option<BeadType>,
    pub priority: Option<u32>,
}

impl ListFilter {
    pub fn status(mut self, status: impl Into<String>) -> Self {
        let status = status.into();
        self.status = if status == "all" { None } else { Some(status) };
        self
    }

    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn bead_type(mut self, bead_type: BeadType) -> Self {
        self.bead_type = Some(bead_type);
        self
    }
}

/// Options for [`Tracker::create`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateOptions {
    /// Explicit id; the tracker mints one when absent.
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub bead_type: BeadType,
    pub labels: Vec<String>,
    pub priority: Option<u32>,
    pub assignee: Option<String>,
    pub parent: Option<String>,
    /// Do not export to the durable journal.
    pub ephemeral: bool,
}

/// Patch for [`Tracker::update`]. Applied atomically per bead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePatch {
    pub status: Option<BeadStatus>,
    pub assignee: Option<String>,
    pub description: Option<String>,
    pub labels_add: Vec<String>,
    pub labels_remove: Vec<String>,
    pub labels_set: Option<Vec<String>>,
}

impl UpdatePatch {
    pub fn status(mut self, status: BeadStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn add_label(mut self, label: impl Into<String>) -> Self {
        self.labels_add.push(label.into());
        self
    }

    pub fn remove_label(mut self, label: impl Into<String>) -> Self {
        self.labels_remove.push(label.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Adapter for the external issue tracker.
#[async_trait]
pub trait Tracker: Clone + Send + Sync + 'static {
    /// Fetch one bead. With `allow_stale`, bypass the database-sync
    /// check; existence checks that must succeed mid-flush use this.
    async fn show(&self, id: &str, allow_stale: bool) -> Result<Bead, TrackerError>;

    /// Fetch several beads; missing ids are absent from the map.
    async fn show_many(&self, ids: &[String]) -> Result<HashMap<String, Bead>, TrackerError>;

    async fn list(&self, filter: &ListFilter) -> Result<Vec<Bead>, TrackerError>;

    /// Atomic per-bead update.
    async fn update(&self, id: &str, patch: &UpdatePatch) -> Result<(), TrackerError>;

    async fn create(&self, opts: &CreateOptions) -> Result<Bead, TrackerError>;

    /// Close a bead; `force` closes regardless of open children.
    async fn close(&self, id: &str, force: bool) -> Result<(), TrackerError>;

    async fn dep_add(&self, from: &str, to: &str, dep_type: DepType)
        -> Result<(), TrackerError>;

    async fn dep_list(
        &self,
        id: &str,
        direction: DepDirection,
        dep_type: Option<DepType>,
    ) -> Result<Vec<Dependency>, TrackerError>;

    /// Ensure a formula template is materialized in the store routed by
    /// `route` (a bead id whose prefix picks the working directory).
    async fn formula_cook(&self, formula: &str, route: &str) -> Result<(), TrackerError>;

    /// Instantiate a formula into an ephemeral wisp; returns the wisp
    /// root (epic) id.
    async fn molecule_wisp(
        &self,
        formula: &str,
        vars: &[(String, String)],
        route: &str,
    ) -> Result<String, TrackerError>;

    /// Bond a wisp onto a target bead; returns the compound root id.
    async fn molecule_bond(&self, wisp_root: &str, target: &str)
        -> Result<String, TrackerError>;

    /// Point an agent bead's hook slot at a work bead (or clear it).
    async fn set_hook_slot(
        &self,
        agent_bead: &str,
        work_bead: Option<&str>,
    ) -> Result<(), TrackerError>;

    /// Touch the agent bead's last-activity timestamp.
    async fn heartbeat(&self, agent_bead: &str) -> Result<(), TrackerError>;
}
