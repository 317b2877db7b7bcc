// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gt sling` - dispatch work to an agent

use crate::app::App;
use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use gt_core::fields::{MergeStrategy, WorkMode};
use gt_engine::{Dispatcher, SlingRequest};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Normal,
    Ralph,
}

impl From<ModeArg> for WorkMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Normal => WorkMode::Normal,
            ModeArg::Ralph => WorkMode::Ralph,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MergeStrategyArg {
    Direct,
    Mr,
    Local,
}

impl From<MergeStrategyArg> for MergeStrategy {
    fn from(strategy: MergeStrategyArg) -> Self {
        match strategy {
            MergeStrategyArg::Direct => MergeStrategy::Direct,
            MergeStrategyArg::Mr => MergeStrategy::Mr,
            MergeStrategyArg::Local => MergeStrategy::Local,
        }
    }
}

#[derive(Args)]
pub struct SlingArgs {
    /// Bead id, rig name, agent address, or formula name (with --on)
    pub target: String,

    /// Work bead when the target is a formula
    #[arg(long, value_name = "BEAD")]
    pub on: Option<String>,

    /// Formula variables (repeatable)
    #[arg(long = "var", value_name = "K=V")]
    pub vars: Vec<String>,

    /// Free-text args recorded on the hook
    #[arg(long)]
    pub args: Option<String>,

    /// Burn an existing molecule / steal a live hook
    #[arg(long)]
    pub force: bool,

    /// Print the plan without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Disable auto-convoy grouping
    #[arg(long)]
    pub no_convoy: bool,

    /// Skip the merge queue when the work completes
    #[arg(long)]
    pub no_merge: bool,

    /// Execution mode for the hooked agent
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// How completed work reaches the default branch
    #[arg(long, value_enum)]
    pub merge_strategy: Option<MergeStrategyArg>,

    /// Account handle for the spawned runtime
    #[arg(long)]
    pub account: Option<String>,

    /// Dispatch to this agent instead of demand-spawning
    #[arg(long)]
    pub agent: Option<String>,
}

/// Split repeated `--var k=v` flags.
pub fn parse_vars(raw: &[String]) -> Result<Vec<(String, String)>> {
    let mut vars = Vec::with_capacity(raw.len());
    for pair in raw {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("bad --var {:?} (expected k=v)", pair);
        };
        vars.push((key.to_string(), value.to_string()));
    }
    Ok(vars)
}

pub async fn handle(args: SlingArgs) -> Result<()> {
    let app = App::load()?;
    let request = SlingRequest {
        target: args.target.clone(),
        on: args.on.clone(),
        vars: parse_vars(&args.vars)?,
        args: args.args.clone(),
        force: args.force,
        dry_run: args.dry_run,
        no_convoy: args.no_convoy,
        no_merge: args.no_merge,
        mode: args.mode.map(Into::into),
        merge_strategy: args.merge_strategy.map(Into::into),
        agent: args.agent.clone(),
        account: args.account.clone(),
        runtime: app.default_runtime(),
        caller: crate::env::role_context(),
    };

    let dispatcher = Dispatcher::new(
        app.tracker.clone(),
        app.sessions.clone(),
        app.git.clone(),
        app.town.clone(),
    );
    let outcome = dispatcher.sling(&request).await?;

    if outcome.dry_run {
        println!("dry run; would:");
        for line in &outcome.plan {
            println!("  {}", line);
        }
        return Ok(());
    }

    if let Some(spawned) = &outcome.spawned {
        println!(
            "spawned {} in {} ({})",
            spawned.address, spawned.rig, spawned.session
        );
    }
    match (&outcome.bead, &outcome.hook) {
        (Some(bead), Some(hook)) => {
            println!("hooked {} to {}", bead, outcome.agent);
            if let Some(wisp) = &hook.wisp_root {
                println!("molecule {}", wisp);
            }
            for burned in &hook.burned {
                println!("burned stale molecule {}", burned);
            }
        }
        _ => {
            if outcome.nudged {
                println!("nudged {}", outcome.agent);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "sling_tests.rs"]
mod tests;
