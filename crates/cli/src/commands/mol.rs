// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gt mol` - molecule operations for the current agent

use crate::app::App;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use gt_adapters::Tracker;
use gt_core::address::AgentAddress;
use gt_core::bead::{BeadStatus, DepDirection, DepType};
use gt_core::fields::AttachmentFields;
use gt_core::time_fmt::parse_duration;
use gt_engine::{await_signal, AttachOptions, AwaitOptions, AwaitReason, HookEngine};

#[derive(Args)]
pub struct MolArgs {
    #[command(subcommand)]
    pub command: MolCommand,
}

#[derive(Subcommand)]
pub enum MolCommand {
    /// Show the molecule attached to the current agent's hook
    Status,
    /// Print just the current molecule id
    Current,
    /// Hook a bead (optionally with a formula) to the current agent
    Attach {
        /// Work bead
        bead: String,
        /// Formula to instantiate onto it
        #[arg(long)]
        formula: Option<String>,
        /// Formula variables (repeatable)
        #[arg(long = "var", value_name = "K=V")]
        vars: Vec<String>,
        /// Burn an existing molecule
        #[arg(long)]
        force: bool,
    },
    /// Detach the current molecule, with audit
    Detach,
    /// Detach and force-close the current molecule
    Burn,
    /// Compress the molecule into a digest and close it
    Squash {
        /// Random pre-sleep up to this duration (e.g. 30s)
        #[arg(long)]
        jitter: Option<String>,
        /// One-line summary recorded in the digest
        #[arg(long)]
        summary: Option<String>,
    },
    /// Molecule step operations
    Step {
        #[command(subcommand)]
        command: StepCommand,
    },
    /// Bootstrap the caller's patrol molecule if none is active
    Patrol,
    /// Wait for activity-feed traffic with idle backoff
    AwaitSignal(AwaitSignalArgs),
}

#[derive(Subcommand)]
pub enum StepCommand {
    /// Close one molecule step
    Done {
        /// Step bead id
        id: String,
    },
}

#[derive(Args)]
pub struct AwaitSignalArgs {
    /// Flat timeout when no backoff is configured (e.g. 60s)
    #[arg(long, default_value = "60s")]
    pub timeout: String,

    /// Backoff base; enables idle backoff (e.g. 30s)
    #[arg(long)]
    pub backoff_base: Option<String>,

    /// Backoff multiplier
    #[arg(long, default_value_t = 2.0)]
    pub backoff_mult: f64,

    /// Backoff ceiling (e.g. 5m)
    #[arg(long)]
    pub backoff_max: Option<String>,

    /// Agent bead carrying the idle/backoff labels
    #[arg(long)]
    pub agent_bead: Option<String>,

    /// Suppress progress logging
    #[arg(long)]
    pub quiet: bool,

    /// Emit the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// The caller's own agent address; molecule commands are agent
/// self-service.
fn caller_address() -> Result<AgentAddress> {
    let ctx = crate::env::role_context();
    AgentAddress::from_role_context(&ctx)
        .context("not inside an agent shell (GT_ROLE/GT_RIG are unset)")
}

/// The bead currently on the caller's hook.
async fn hooked_bead(app: &App, addr: &AgentAddress) -> Result<String> {
    let agent_bead = addr.bead_id(app.town.prefixes())?;
    let bead = app.tracker.show(&agent_bead, true).await?;
    bead.hook_bead
        .clone()
        .with_context(|| format!("{} has nothing on its hook", addr))
}

pub async fn handle(command: MolCommand) -> Result<()> {
    match command {
        MolCommand::Status => status().await,
        MolCommand::Current => current().await,
        MolCommand::Attach {
            bead,
            formula,
            vars,
            force,
        } => attach(&bead, formula.as_deref(), &vars, force).await,
        MolCommand::Detach => detach(false).await,
        MolCommand::Burn => detach(true).await,
        MolCommand::Squash { jitter, summary } => squash(jitter.as_deref(), summary.as_deref()).await,
        MolCommand::Step { command } => match command {
            StepCommand::Done { id } => step_done(&id).await,
        },
        MolCommand::Patrol => patrol().await,
        MolCommand::AwaitSignal(args) => handle_await_signal(args).await,
    }
}

async fn patrol() -> Result<()> {
    let app = App::load()?;
    let addr = caller_address()?;
    match gt_engine::ensure_patrol(&app.tracker, &app.town, &addr).await? {
        Some(wisp) => println!("patrol molecule {} hooked to {}", wisp, addr),
        None => println!("patrol already active"),
    }
    Ok(())
}

async fn status() -> Result<()> {
    let app = App::load()?;
    let addr = caller_address()?;
    let work = hooked_bead(&app, &addr).await?;
    let bead = app.tracker.show(&work, true).await?;
    println!("hook: {} ({})", work, bead.status);

    let fields = AttachmentFields::parse(&bead.description);
    let Some(molecule) = fields.attached_molecule else {
        println!("no molecule attached");
        return Ok(());
    };

    let steps = app
        .tracker
        .dep_list(&molecule, DepDirection::Down, Some(DepType::ParentChild))
        .await?;
    let mut done = 0;
    for step in &steps {
        if let Ok(step_bead) = app.tracker.show(&step.id, true).await {
            if step_bead.status == BeadStatus::Closed {
                done += 1;
            }
        }
    }
    println!("molecule: {} ({}/{} steps done)", molecule, done, steps.len());
    Ok(())
}

async fn current() -> Result<()> {
    let app = App::load()?;
    let addr = caller_address()?;
    let work = hooked_bead(&app, &addr).await?;
    let bead = app.tracker.show(&work, true).await?;
    match AttachmentFields::parse(&bead.description).attached_molecule {
        Some(molecule) => println!("{}", molecule),
        None => bail!("no molecule attached to {}", work),
    }
    Ok(())
}

async fn attach(
    bead: &str,
    formula: Option<&str>,
    vars: &[String],
    force: bool,
) -> Result<()> {
    let app = App::load()?;
    let addr = caller_address()?;
    let engine = HookEngine::new(app.tracker.clone(), app.sessions.clone(), app.town.clone());
    let opts = AttachOptions {
        formula: formula.map(str::to_string),
        vars: super::sling::parse_vars(vars)?,
        force,
        dispatcher: crate::env::actor(),
        ..Default::default()
    };
    let outcome = engine.attach_work(&addr, bead, &opts).await?;
    println!("hooked {} to {}", bead, addr);
    if let Some(wisp) = outcome.wisp_root {
        println!("molecule {}", wisp);
    }
    Ok(())
}

async fn detach(burn: bool) -> Result<()> {
    let app = App::load()?;
    let addr = caller_address()?;
    let work = hooked_bead(&app, &addr).await?;
    let bead = app.tracker.show(&work, true).await?;
    let molecule = AttachmentFields::parse(&bead.description).attached_molecule;

    let engine = HookEngine::new(app.tracker.clone(), app.sessions.clone(), app.town.clone());
    let reason = if burn { "burn" } else { "manual detach" };
    engine
        .detach_molecule_with_audit(&work, reason, &crate::env::actor())
        .await?;

    if burn {
        if let Some(molecule) = &molecule {
            let closed = engine.force_close(molecule).await;
            println!("burned {} ({} beads closed)", molecule, closed);
            return Ok(());
        }
    }
    println!("detached molecule from {}", work);
    Ok(())
}

async fn squash(jitter: Option<&str>, summary: Option<&str>) -> Result<()> {
    let app = App::load()?;
    let addr = caller_address()?;
    let work = hooked_bead(&app, &addr).await?;

    let jitter = jitter
        .map(parse_duration)
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let engine = HookEngine::new(app.tracker.clone(), app.sessions.clone(), app.town.clone());
    let digest = engine
        .squash(&work, &crate::env::actor(), summary, jitter)
        .await?;
    println!("squashed into digest {}", digest);
    Ok(())
}

async fn step_done(id: &str) -> Result<()> {
    let app = App::load()?;
    app.tracker.close(id, false).await?;
    println!("step {} done", id);
    Ok(())
}

pub async fn handle_await_signal(args: AwaitSignalArgs) -> Result<()> {
    let app = App::load()?;

    let opts = AwaitOptions {
        timeout: parse_duration(&args.timeout).map_err(anyhow::Error::msg)?,
        backoff_base: args
            .backoff_base
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(anyhow::Error::msg)?,
        backoff_mult: args.backoff_mult,
        backoff_max: args
            .backoff_max
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(anyhow::Error::msg)?,
        agent_bead: args.agent_bead.clone(),
        quiet: args.quiet,
    };

    let outcome = await_signal(&app.tracker, &app.town, &opts).await?;
    if args.json {
        crate::output::print_json(&serde_json::json!({
            "reason": outcome.reason.as_str(),
            "signal": outcome.signal,
            "effective_timeout_secs": outcome.effective_timeout.as_secs(),
        }))?;
    } else {
        match outcome.reason {
            AwaitReason::Signal => {
                println!("signal: {}", outcome.signal.unwrap_or_default())
            }
            AwaitReason::Timeout => println!("timeout"),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "mol_tests.rs"]
mod tests;
