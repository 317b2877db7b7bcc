// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gt rig` - rig registry and lifecycle

use crate::app::App;
use crate::output::updown;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use gt_adapters::tracker::{append_route, remove_route, Route};
use gt_core::config::{RigConfig, RigEntry};
use gt_engine::{IdentityLock, RigLifecycle, ShutdownOptions};

#[derive(Args)]
pub struct RigArgs {
    #[command(subcommand)]
    pub command: RigCommand,
}

#[derive(Subcommand)]
pub enum RigCommand {
    /// Register a rig (registry entry, routes entry, config)
    Add {
        name: String,
        /// Tracker prefix (e.g. gt)
        #[arg(long)]
        prefix: String,
        /// Default branch
        #[arg(long, default_value = "main")]
        default_branch: String,
    },
    /// List registered rigs
    List,
    /// Unregister a rig (leaves the directory alone)
    Remove { name: String },
    /// Re-register a rig directory that already has a config
    Adopt { name: String },
    /// Clear stale coordination state for a rig
    Reset {
        name: String,
        /// Clear singleton hook slots
        #[arg(long)]
        handoff: bool,
        /// Clear queued nudges for the rig's sessions
        #[arg(long)]
        mail: bool,
        /// Remove stale identity locks in polecat workspaces
        #[arg(long)]
        stale: bool,
        /// Show what would be cleared
        #[arg(long)]
        dry_run: bool,
    },
    /// Start the rig's monitor singletons (idempotent)
    Boot { name: String },
    /// Stop the rig (refuses on uncommitted work)
    Shutdown {
        name: String,
        #[arg(long)]
        force: bool,
        /// Skip the uncommitted-work check. Loses work.
        #[arg(long)]
        nuclear: bool,
    },
    /// Shutdown then boot
    Reboot { name: String },
    /// Boot several rigs
    Start { names: Vec<String> },
    /// Shutdown several rigs
    Stop {
        names: Vec<String>,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        nuclear: bool,
    },
    /// Reboot several rigs
    Restart { names: Vec<String> },
    /// Show one rig (or all)
    Status { name: Option<String> },
}

fn lifecycle(app: &App) -> RigLifecycle<gt_adapters::BdTracker, gt_adapters::TmuxSessions, gt_adapters::GitCli> {
    RigLifecycle::new(
        app.tracker.clone(),
        app.sessions.clone(),
        app.git.clone(),
        app.town.clone(),
        app.default_runtime(),
    )
}

fn all_rigs_or(app: &App, names: Vec<String>) -> Vec<String> {
    if names.is_empty() {
        app.town.rig_names()
    } else {
        names
    }
}

fn print_status(status: &gt_engine::RigStatus) {
    println!(
        "{} [{}] witness {} refinery {} polecats {}",
        status.rig,
        status.state.as_str(),
        updown(status.witness_up),
        updown(status.refinery_up),
        if status.polecats.is_empty() {
            "-".to_string()
        } else {
            status.polecats.join(",")
        }
    );
}

fn print_results(results: Vec<(String, Result<gt_engine::RigStatus, gt_engine::EngineError>)>) -> Result<()> {
    let mut failed = false;
    for (rig, result) in results {
        match result {
            Ok(status) => print_status(&status),
            Err(err) => {
                failed = true;
                eprintln!("{}: {}", rig, err);
            }
        }
    }
    if failed {
        bail!("some rigs failed");
    }
    Ok(())
}

pub async fn handle(command: RigCommand) -> Result<()> {
    let app = App::load()?;
    match command {
        RigCommand::Add {
            name,
            prefix,
            default_branch,
        } => add(&app, &name, &prefix, &default_branch),
        RigCommand::List => list(&app),
        RigCommand::Remove { name } => remove(&app, &name),
        RigCommand::Adopt { name } => adopt(&app, &name),
        RigCommand::Reset {
            name,
            handoff,
            mail,
            stale,
            dry_run,
        } => reset(&app, &name, handoff, mail, stale, dry_run).await,
        RigCommand::Boot { name } => {
            print_status(&lifecycle(&app).boot(&name).await?);
            Ok(())
        }
        RigCommand::Shutdown {
            name,
            force,
            nuclear,
        } => {
            let opts = ShutdownOptions { force, nuclear };
            print_status(&lifecycle(&app).shutdown(&name, opts).await?);
            Ok(())
        }
        RigCommand::Reboot { name } => {
            print_status(
                &lifecycle(&app)
                    .reboot(&name, ShutdownOptions::default())
                    .await?,
            );
            Ok(())
        }
        RigCommand::Start { names } => {
            let rigs = all_rigs_or(&app, names);
            print_results(lifecycle(&app).start_many(&rigs).await)
        }
        RigCommand::Stop {
            names,
            force,
            nuclear,
        } => {
            let rigs = all_rigs_or(&app, names);
            let opts = ShutdownOptions { force, nuclear };
            print_results(lifecycle(&app).stop_many(&rigs, opts).await)
        }
        RigCommand::Restart { names } => {
            let rigs = all_rigs_or(&app, names);
            print_results(
                lifecycle(&app)
                    .restart_many(&rigs, ShutdownOptions::default())
                    .await,
            )
        }
        RigCommand::Status { name } => {
            let rigs = all_rigs_or(&app, name.into_iter().collect());
            for rig in rigs {
                print_status(&lifecycle(&app).status(&rig).await?);
            }
            Ok(())
        }
    }
}

fn add(app: &App, name: &str, prefix: &str, default_branch: &str) -> Result<()> {
    if app.town.has_rig(name) {
        bail!("rig {} is already registered", name);
    }
    let prefix = prefix.trim_end_matches('-');

    let mut rigs = app.town.rigs().clone();
    rigs.rigs.insert(
        name.to_string(),
        RigEntry {
            prefix: prefix.to_string(),
            default_branch: default_branch.to_string(),
        },
    );
    rigs.save(&app.town.paths().rigs_file())?;

    append_route(
        &app.town.paths().routes_file(),
        &Route::new(format!("{}-", prefix), name),
    )
    .context("routes table")?;

    let config = RigConfig {
        name: name.to_string(),
        prefix: prefix.to_string(),
        default_branch: default_branch.to_string(),
        state: Default::default(),
        commands: Default::default(),
    };
    config.save(&app.town.paths().rig_config(name))?;

    println!(
        "registered rig {} (prefix {}-); seed its clone at {}",
        name,
        prefix,
        app.town.paths().rig_repo(name).display()
    );
    Ok(())
}

fn list(app: &App) -> Result<()> {
    if app.town.rigs().rigs.is_empty() {
        println!("no rigs registered");
        return Ok(());
    }
    for (name, entry) in &app.town.rigs().rigs {
        println!("{} (prefix {}-, branch {})", name, entry.prefix, entry.default_branch);
    }
    Ok(())
}

fn remove(app: &App, name: &str) -> Result<()> {
    if !app.town.has_rig(name) {
        bail!("rig {} is not registered", name);
    }
    let prefix = app
        .town
        .prefixes()
        .prefix_for(name)
        .unwrap_or_default()
        .to_string();

    let mut rigs = app.town.rigs().clone();
    rigs.rigs.remove(name);
    rigs.save(&app.town.paths().rigs_file())?;
    remove_route(&app.town.paths().routes_file(), &format!("{}-", prefix))?;

    println!("unregistered rig {} (directory left in place)", name);
    Ok(())
}

fn adopt(app: &App, name: &str) -> Result<()> {
    if app.town.has_rig(name) {
        bail!("rig {} is already registered", name);
    }
    let config_path = app.town.paths().rig_config(name);
    let config = RigConfig::load(&config_path)
        .with_context(|| format!("no adoptable config at {}", config_path.display()))?;

    let mut rigs = app.town.rigs().clone();
    rigs.rigs.insert(
        name.to_string(),
        RigEntry {
            prefix: config.prefix.clone(),
            default_branch: config.default_branch.clone(),
        },
    );
    rigs.save(&app.town.paths().rigs_file())?;
    append_route(
        &app.town.paths().routes_file(),
        &Route::new(format!("{}-", config.prefix), name),
    )?;
    println!("adopted rig {}", name);
    Ok(())
}

async fn reset(
    app: &App,
    name: &str,
    handoff: bool,
    mail: bool,
    stale: bool,
    dry_run: bool,
) -> Result<()> {
    use gt_adapters::Tracker;
    use gt_core::address::AgentAddress;

    if !app.town.has_rig(name) {
        bail!("rig {} is not registered", name);
    }
    // No selector means everything.
    let all = !(handoff || mail || stale);

    if handoff || all {
        for addr in [
            AgentAddress::Witness {
                rig: name.to_string(),
            },
            AgentAddress::Refinery {
                rig: name.to_string(),
            },
        ] {
            let bead = addr.bead_id(app.town.prefixes())?;
            if dry_run {
                println!("would clear hook slot of {}", bead);
            } else if let Err(err) = app.tracker.set_hook_slot(&bead, None).await {
                tracing::warn!(agent = %addr, error = %err, "handoff reset failed");
            } else {
                println!("cleared hook slot of {}", bead);
            }
        }
    }

    if mail || all {
        let queue_root = app.town.paths().nudge_queue_root();
        if queue_root.is_dir() {
            let session_prefix = format!("gt-{}-", name);
            for entry in std::fs::read_dir(&queue_root)? {
                let path = entry?.path();
                let is_rig_session = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&session_prefix));
                if !is_rig_session {
                    continue;
                }
                if dry_run {
                    println!("would clear nudge queue {}", path.display());
                } else {
                    std::fs::remove_dir_all(&path)?;
                    println!("cleared nudge queue {}", path.display());
                }
            }
        }
    }

    if stale || all {
        let polecats_dir = app.town.paths().polecats_dir(name);
        if polecats_dir.is_dir() {
            for entry in std::fs::read_dir(&polecats_dir)? {
                let workspace = entry?.path().join("rig");
                if IdentityLock::holder(&workspace).is_none() {
                    continue;
                }
                if dry_run {
                    println!("would remove identity lock in {}", workspace.display());
                } else {
                    IdentityLock::repair(&workspace)?;
                    println!("removed identity lock in {}", workspace.display());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "rig_tests.rs"]
mod tests;
