// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loaded town context shared by every engine component.

use crate::error::EngineError;
use gt_core::address::PrefixMap;
use gt_core::config::{RigConfig, RigsFile, TownConfig};
use gt_core::town::TownPaths;

/// The resolved town: paths, name, rig registry, and the prefix map the
/// identity resolver consumes.
#[derive(Debug, Clone)]
pub struct TownCtx {
    paths: TownPaths,
    name: String,
    rigs: RigsFile,
    prefixes: PrefixMap,
}

impl TownCtx {
    /// Load the town rooted at `paths`.
    pub fn load(paths: TownPaths) -> Result<Self, EngineError> {
        let config = TownConfig::load(&paths.town_config())?;
        let rigs = RigsFile::load(&paths.rigs_file())?;
        let prefixes = rigs.prefix_map();
        Ok(Self {
            paths,
            name: config.name,
            rigs,
            prefixes,
        })
    }

    /// Discover the town from a working directory and load it.
    pub fn discover(cwd: &std::path::Path) -> Result<Self, EngineError> {
        let paths = gt_core::town::find_town_root(cwd)?;
        Self::load(paths)
    }

    pub fn paths(&self) -> &TownPaths {
        &self.paths
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rigs(&self) -> &RigsFile {
        &self.rigs
    }

    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    pub fn has_rig(&self, rig: &str) -> bool {
        self.rigs.rigs.contains_key(rig)
    }

    pub fn rig_names(&self) -> Vec<String> {
        self.rigs.rigs.keys().cloned().collect()
    }

    /// The rig owning a bead id, via its prefix.
    pub fn rig_for_bead(&self, bead_id: &str) -> Option<&str> {
        let prefix = gt_core::id::extract_prefix(bead_id)?;
        self.prefixes.rig_for(prefix.trim_end_matches('-'))
    }

    /// Per-rig config; tolerates a missing file by synthesizing from the
    /// registry entry.
    pub fn rig_config(&self, rig: &str) -> Result<RigConfig, EngineError> {
        let path = self.paths.rig_config(rig);
        if path.is_file() {
            return Ok(RigConfig::load(&path)?);
        }
        let entry = self
            .rigs
            .rigs
            .get(rig)
            .ok_or_else(|| EngineError::NotFound(format!("rig {rig}")))?;
        Ok(RigConfig {
            name: rig.to_string(),
            prefix: entry.prefix.clone(),
            default_branch: entry.default_branch.clone(),
            state: Default::default(),
            commands: Default::default(),
        })
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn for_tests(paths: TownPaths, name: &str, rigs: RigsFile) -> Self {
        let prefixes = rigs.prefix_map();
        Self {
            paths,
            name: name.to_string(),
            rigs,
            prefixes,
        }
    }
}
