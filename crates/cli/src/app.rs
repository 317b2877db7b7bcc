// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loaded application context: the town plus production adapters.

use anyhow::{Context, Result};
use gt_adapters::tracker::load_routes;
use gt_adapters::{BdTracker, GitCli, RuntimeConfig, TmuxSessions};
use gt_engine::TownCtx;

/// Everything a command needs: the town and the three adapters.
pub struct App {
    pub town: TownCtx,
    pub tracker: BdTracker,
    pub sessions: TmuxSessions,
    pub git: GitCli,
}

impl App {
    /// Discover the town from the working directory and wire the
    /// production adapters.
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot read working directory")?;
        let town = TownCtx::discover(&cwd)?;
        let routes = load_routes(&town.paths().routes_file())
            .context("cannot load the routes table")?;
        let tracker = BdTracker::new(town.paths().root(), routes).with_actor(crate::env::actor());
        Ok(Self {
            town,
            tracker,
            sessions: TmuxSessions::new(),
            git: GitCli::new(),
        })
    }

    /// The default interactive-runtime preset for spawned agents.
    pub fn default_runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            command: std::env::var("GT_RUNTIME_CMD")
                .unwrap_or_else(|_| "claude --dangerously-skip-permissions".to_string()),
            ready_prompt_prefix: None,
            process_name: "claude".to_string(),
        }
    }
}
