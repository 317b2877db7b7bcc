// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gt - Gas Town CLI

mod app;
mod commands;
mod env;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{commit, dog, mol, nudge, rig, sling, warrant};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gt",
    version,
    about = "Gas Town - an agent fleet for your rigs"
)]
struct Cli {
    /// Change to <dir> before doing anything
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch work to an agent (spawning one if needed)
    Sling(sling::SlingArgs),
    /// Deliver a message into an agent's pane
    Nudge(nudge::NudgeArgs),
    /// Molecule operations for the current agent
    Mol(mol::MolArgs),
    /// Wait for activity-feed traffic (alias of `mol await-signal`)
    AwaitSignal(mol::AwaitSignalArgs),
    /// Rig lifecycle and registry
    Rig(rig::RigArgs),
    /// The cross-rig dog pool
    Dog(dog::DogArgs),
    /// Intents to terminate an agent
    Warrant(warrant::WarrantArgs),
    /// Commit with the current agent's git identity
    #[command(trailing_var_arg = true)]
    Commit(commit::CommitArgs),
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env("GT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sling(args) => sling::handle(args).await,
        Commands::Nudge(args) => nudge::handle(args).await,
        Commands::Mol(args) => mol::handle(args.command).await,
        Commands::AwaitSignal(args) => mol::handle_await_signal(args).await,
        Commands::Rig(args) => rig::handle(args.command).await,
        Commands::Dog(args) => dog::handle(args.command).await,
        Commands::Warrant(args) => warrant::handle(args.command).await,
        Commands::Commit(args) => commit::handle(args).await,
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_logging();
    let cli = Cli::parse();

    if let Some(dir) = &cli.directory {
        if let Err(err) = std::env::set_current_dir(dir) {
            eprintln!("gt: cannot change to {}: {}", dir.display(), err);
            return std::process::ExitCode::FAILURE;
        }
    }

    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("gt: {:#}", err);
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
