// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gt dog` - the cross-rig dog pool

use crate::app::App;
use crate::output::print_json;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use gt_engine::{DogManager, NudgeMode, NudgePipeline, NudgeRequest};

#[derive(Args)]
pub struct DogArgs {
    #[command(subcommand)]
    pub command: DogCommand,
}

#[derive(Subcommand)]
pub enum DogCommand {
    /// Add a dog with worktrees into every rig
    Add { name: String },
    /// Remove dogs
    Remove {
        name: Option<String>,
        /// Remove even a working dog
        #[arg(long)]
        force: bool,
        /// Remove every dog
        #[arg(long)]
        all: bool,
    },
    /// List the pool
    List {
        #[arg(long)]
        json: bool,
    },
    /// Wake dogs up for duty
    Call {
        name: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Return a dog to the idle pool
    Done { name: String },
    /// Show one dog
    Status { name: String },
    /// Dispatch a plugin run to an idle dog
    Dispatch {
        #[arg(long)]
        plugin: String,
        #[arg(long)]
        rig: Option<String>,
        #[arg(long)]
        dog: Option<String>,
        /// Create a dog when none is idle
        #[arg(long)]
        create: bool,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        dry_run: bool,
    },
}

fn manager(app: &App) -> DogManager<gt_adapters::BdTracker, gt_adapters::TmuxSessions, gt_adapters::GitCli> {
    DogManager::new(
        app.tracker.clone(),
        app.sessions.clone(),
        app.git.clone(),
        app.town.clone(),
    )
}

pub async fn handle(command: DogCommand) -> Result<()> {
    let app = App::load()?;
    let dogs = manager(&app);
    match command {
        DogCommand::Add { name } => {
            dogs.add(&name).await?;
            println!("added dog {}", name);
            Ok(())
        }
        DogCommand::Remove { name, force, all } => {
            let names: Vec<String> = if all {
                dogs.list().await?.into_iter().map(|d| d.name).collect()
            } else {
                match name {
                    Some(name) => vec![name],
                    None => bail!("pass a dog name or --all"),
                }
            };
            for name in names {
                dogs.remove(&name, force).await?;
                println!("removed dog {}", name);
            }
            Ok(())
        }
        DogCommand::List { json } => {
            let pool = dogs.list().await?;
            if json {
                let rows: Vec<serde_json::Value> = pool
                    .iter()
                    .map(|d| {
                        serde_json::json!({
                            "name": d.name,
                            "state": if d.working { "working" } else { "idle" },
                            "work": d.work,
                        })
                    })
                    .collect();
                return print_json(&rows);
            }
            if pool.is_empty() {
                println!("no dogs");
            }
            for dog in pool {
                let state = if dog.working { "working" } else { "idle" };
                if dog.work.is_empty() {
                    println!("{} ({})", dog.name, state);
                } else {
                    println!("{} ({}, work {})", dog.name, state, dog.work);
                }
            }
            Ok(())
        }
        DogCommand::Call { name, all } => {
            let names: Vec<String> = if all {
                dogs.list().await?.into_iter().map(|d| d.name).collect()
            } else {
                match name {
                    Some(name) => vec![name],
                    None => bail!("pass a dog name or --all"),
                }
            };
            let pipeline = NudgePipeline::new(
                app.tracker.clone(),
                app.sessions.clone(),
                app.town.clone(),
            );
            let sender = crate::env::actor();
            for name in names {
                let request = NudgeRequest {
                    target: format!("deacon/dogs/{}", name),
                    message: "you're called up; check your mail".to_string(),
                    sender: sender.clone(),
                    mode: NudgeMode::Immediate,
                    ..Default::default()
                };
                match pipeline.deliver(&request).await {
                    Ok(_) => println!("called {}", name),
                    Err(err) => eprintln!("{}: {}", name, err),
                }
            }
            Ok(())
        }
        DogCommand::Done { name } => {
            dogs.done(&name).await?;
            println!("dog {} is idle", name);
            Ok(())
        }
        DogCommand::Status { name } => {
            let (status, bead) = dogs.status(&name).await?;
            let state = if status.working { "working" } else { "idle" };
            println!("{}: {}", status.name, state);
            if !status.work.is_empty() {
                println!("work: {}", status.work);
            }
            if let Some(last) = bead.last_activity {
                println!("last activity: {}", last);
            }
            Ok(())
        }
        DogCommand::Dispatch {
            plugin,
            rig,
            dog,
            create,
            json,
            dry_run,
        } => {
            if dry_run {
                println!(
                    "dry run; would dispatch plugin {} to {}",
                    plugin,
                    dog.as_deref().unwrap_or("first idle dog")
                );
                return Ok(());
            }
            let outcome = dogs
                .dispatch(&plugin, rig.as_deref(), dog.as_deref(), create)
                .await?;
            if json {
                return print_json(&serde_json::json!({
                    "dog": outcome.dog,
                    "work": outcome.work_bead,
                    "mail": outcome.mail_bead,
                    "created_dog": outcome.created_dog,
                }));
            }
            println!(
                "dispatched {} to {} (work {})",
                plugin, outcome.dog, outcome.work_bead
            );
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "dog_tests.rs"]
mod tests;
