// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tracker's unit of work, as marshaled from `bd --json` output.
//!
//! Beads are owned by the external tracker; these are transient copies.
//! Unknown JSON fields are ignored so the core stays compatible across
//! tracker versions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a bead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeadStatus {
    #[default]
    Open,
    Hooked,
    InProgress,
    Closed,
    Deferred,
}

impl BeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeadStatus::Open => "open",
            BeadStatus::Hooked => "hooked",
            BeadStatus::InProgress => "in_progress",
            BeadStatus::Closed => "closed",
            BeadStatus::Deferred => "deferred",
        }
    }

    /// Statuses that still demand attention from an agent.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            BeadStatus::Open | BeadStatus::Hooked | BeadStatus::InProgress
        )
    }
}

impl fmt::Display for BeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of record a bead holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeadType {
    #[default]
    Task,
    Agent,
    Rig,
    Convoy,
    Epic,
    Message,
}

impl BeadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeadType::Task => "task",
            BeadType::Agent => "agent",
            BeadType::Rig => "rig",
            BeadType::Convoy => "convoy",
            BeadType::Epic => "epic",
            BeadType::Message => "message",
        }
    }
}

impl fmt::Display for BeadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a dependency edge between beads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepType {
    #[default]
    Blocks,
    ParentChild,
    Tracks,
}

impl DepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepType::Blocks => "blocks",
            DepType::ParentChild => "parent-child",
            DepType::Tracks => "tracks",
        }
    }
}

/// Direction for dependency listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepDirection {
    /// Dependencies this bead points at.
    Up,
    /// Beads pointing at this one.
    Down,
}

impl DepDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepDirection::Up => "up",
            DepDirection::Down => "down",
        }
    }
}

/// One dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    #[serde(rename = "type", default)]
    pub dep_type: DepType,
}

/// A tracker work record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bead {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: BeadStatus,
    #[serde(rename = "issue_type", default)]
    pub bead_type: BeadType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_bead: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

/// Description markers that mean "deferred" even when the status field
/// has not caught up.
const DEFERRED_MARKERS: &[&str] = &[
    "deferred to post-launch",
    "deferred to post launch",
    "status: deferred",
];

impl Bead {
    /// Value of a `key:value` label, e.g. `label_value("idle")` over
    /// `["idle:3"]` yields `Some("3")`.
    pub fn label_value(&self, key: &str) -> Option<&str> {
        let prefix = format!("{}:", key);
        self.labels
            .iter()
            .find_map(|l| l.strip_prefix(prefix.as_str()))
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Deferral guard: status or a known description marker.
    pub fn is_deferred(&self) -> bool {
        if self.status == BeadStatus::Deferred {
            return true;
        }
        let lower = self.description.to_lowercase();
        DEFERRED_MARKERS.iter().any(|m| lower.contains(m))
    }

    /// Ids of attached molecule wisps: blocks-dependencies whose id
    /// contains `-wisp-`, unioned with the `attached_molecule` field
    /// parsed from the description.
    pub fn attached_wisps(&self) -> Vec<String> {
        let mut wisps: Vec<String> = self
            .dependencies
            .iter()
            .filter(|d| d.dep_type == DepType::Blocks)
            .map(|d| crate::id::extract_issue_id(&d.id).to_string())
            .filter(|id| id.contains("-wisp-"))
            .collect();
        if let Some(molecule) = crate::fields::AttachmentFields::parse(&self.description)
            .attached_molecule
        {
            if !wisps.contains(&molecule) {
                wisps.push(molecule);
            }
        }
        wisps
    }
}

#[cfg(test)]
#[path = "bead_tests.rs"]
mod tests;
