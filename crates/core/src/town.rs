// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Town-root discovery and canonical path resolution.
//!
//! The town root is the directory containing `mayor/town.json` (the
//! primary marker). Every (role, rig, name) tuple resolves to exactly
//! one path under the root; nothing else in the codebase concatenates
//! town paths by hand.

use crate::address::AgentAddress;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Relative path of the primary marker.
const TOWN_MARKER: &str = "mayor/town.json";

#[derive(Debug, Error)]
pub enum TownError {
    #[error("not inside a town (no {TOWN_MARKER} above {0})")]
    NotFound(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolver for every path the orchestrator touches under a town root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TownPaths {
    root: PathBuf,
}

impl TownPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn marker(&self) -> PathBuf {
        self.root.join(TOWN_MARKER)
    }

    pub fn town_config(&self) -> PathBuf {
        self.marker()
    }

    pub fn rigs_file(&self) -> PathBuf {
        self.root.join("mayor/rigs.json")
    }

    pub fn channels_file(&self) -> PathBuf {
        self.root.join("mayor/channels.json")
    }

    pub fn events_file(&self) -> PathBuf {
        self.root.join(".events.jsonl")
    }

    pub fn warrants_dir(&self) -> PathBuf {
        self.root.join("warrants")
    }

    pub fn warrant_file(&self, target: &str) -> PathBuf {
        // Addresses contain slashes; flatten for the filename.
        let flat = target.replace('/', "-");
        self.warrants_dir().join(format!("{}.warrant.json", flat))
    }

    pub fn beads_dir(&self) -> PathBuf {
        self.root.join(".beads")
    }

    pub fn routes_file(&self) -> PathBuf {
        self.beads_dir().join("routes.jsonl")
    }

    pub fn nudge_queue_root(&self) -> PathBuf {
        self.root.join(".nudges")
    }

    pub fn nudge_queue_dir(&self, session: &str) -> PathBuf {
        self.nudge_queue_root().join(session)
    }

    pub fn rig_dir(&self, rig: &str) -> PathBuf {
        self.root.join(rig)
    }

    pub fn rig_config(&self, rig: &str) -> PathBuf {
        self.rig_dir(rig).join("config.json")
    }

    /// The rig's bare clone that worktrees hang off.
    pub fn rig_repo(&self, rig: &str) -> PathBuf {
        self.rig_dir(rig).join(".repo.git")
    }

    pub fn witness_dir(&self, rig: &str) -> PathBuf {
        self.rig_dir(rig).join("witness")
    }

    pub fn refinery_dir(&self, rig: &str) -> PathBuf {
        self.rig_dir(rig).join("refinery").join("rig")
    }

    pub fn polecat_home(&self, rig: &str, name: &str) -> PathBuf {
        self.rig_dir(rig).join("polecats").join(name)
    }

    /// The polecat's isolated worktree (its working clone).
    pub fn polecat_worktree(&self, rig: &str, name: &str) -> PathBuf {
        self.polecat_home(rig, name).join("rig")
    }

    pub fn polecats_dir(&self, rig: &str) -> PathBuf {
        self.rig_dir(rig).join("polecats")
    }

    pub fn crew_dir(&self, rig: &str, name: &str) -> PathBuf {
        self.rig_dir(rig).join("crew").join(name)
    }

    pub fn dog_home(&self, name: &str) -> PathBuf {
        self.root.join("deacon").join("dogs").join(name)
    }

    /// A dog's per-rig worktree.
    pub fn dog_worktree(&self, name: &str, rig: &str) -> PathBuf {
        self.dog_home(name).join(rig)
    }

    pub fn mayor_dir(&self) -> PathBuf {
        self.root.join("mayor")
    }

    pub fn deacon_dir(&self) -> PathBuf {
        self.root.join("deacon")
    }

    /// Home directory for an agent identity.
    pub fn agent_dir(&self, addr: &AgentAddress) -> PathBuf {
        match addr {
            AgentAddress::Mayor => self.mayor_dir(),
            AgentAddress::Deacon => self.deacon_dir(),
            AgentAddress::Witness { rig } => self.witness_dir(rig),
            AgentAddress::Refinery { rig } => self.refinery_dir(rig),
            AgentAddress::Polecat { rig, name } => self.polecat_worktree(rig, name),
            AgentAddress::Crew { rig, name } => self.crew_dir(rig, name),
            AgentAddress::Dog { name } => self.dog_home(name),
        }
    }
}

/// Walk up from `start` until a directory containing the primary marker
/// is found.
pub fn find_town_root(start: &Path) -> Result<TownPaths, TownError> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(TOWN_MARKER).is_file() {
            return Ok(TownPaths::new(dir));
        }
        current = dir.parent();
    }
    Err(TownError::NotFound(start.to_path_buf()))
}

#[cfg(test)]
#[path = "town_tests.rs"]
mod tests;
