// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Town and rig configuration records.
//!
//! `mayor/town.json` is also the primary marker for town-root discovery.
//! `mayor/rigs.json` is the rigs registry; each rig additionally carries
//! its own `<rig>/config.json` with pipeline commands and local state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// `mayor/town.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl TownConfig {
    pub fn load(path: &Path) -> io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(io::Error::other)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// One registry entry in `mayor/rigs.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigEntry {
    pub prefix: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// `mayor/rigs.json`: rig name → entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigsFile {
    #[serde(default)]
    pub rigs: BTreeMap<String, RigEntry>,
}

impl RigsFile {
    pub fn load(path: &Path) -> io::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(io::Error::other)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Build the prefix map the identity resolver consumes.
    pub fn prefix_map(&self) -> crate::address::PrefixMap {
        let mut map = crate::address::PrefixMap::new();
        for (rig, entry) in &self.rigs {
            map.insert(rig.clone(), entry.prefix.trim_end_matches('-').to_string());
        }
        map
    }
}

/// Local lifecycle state of a rig.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RigState {
    #[default]
    Active,
    /// Deliberately stopped; starts are skipped with a notice.
    Parked,
    /// Detached from the fleet; starts are skipped with a notice.
    Docked,
}

impl RigState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RigState::Active => "active",
            RigState::Parked => "parked",
            RigState::Docked => "docked",
        }
    }

    pub fn is_held(&self) -> bool {
        matches!(self, RigState::Parked | RigState::Docked)
    }
}

/// Optional per-rig pipeline commands, injected into formula variables
/// at hook time when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineCommands {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typecheck: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

impl PipelineCommands {
    /// `(name_command, value)` pairs for every configured command.
    pub fn as_vars(&self) -> Vec<(String, String)> {
        let mut vars = Vec::new();
        let mut add = |key: &str, value: &Option<String>| {
            if let Some(v) = value {
                vars.push((format!("{}_command", key), v.clone()));
            }
        };
        add("setup", &self.setup);
        add("typecheck", &self.typecheck);
        add("lint", &self.lint);
        add("test", &self.test);
        add("build", &self.build);
        vars
    }
}

/// `<rig>/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigConfig {
    pub name: String,
    pub prefix: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub state: RigState,
    #[serde(default)]
    pub commands: PipelineCommands,
}

impl RigConfig {
    pub fn load(path: &Path) -> io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(io::Error::other)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
