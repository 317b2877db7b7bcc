// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gt warrant` - intents to terminate an agent

use crate::app::App;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use gt_engine::{execute_warrant, file_warrant, list_warrants};
use std::io::Read;

#[derive(Args)]
pub struct WarrantArgs {
    #[command(subcommand)]
    pub command: WarrantCommand,
}

#[derive(Subcommand)]
pub enum WarrantCommand {
    /// File a warrant against an agent
    File {
        /// Agent address
        target: String,
        /// Why the agent must go
        #[arg(long)]
        reason: Option<String>,
        /// Read the reason from stdin
        #[arg(long, conflicts_with = "reason")]
        stdin: bool,
    },
    /// List warrants (pending by default)
    List {
        /// Include executed warrants
        #[arg(long)]
        all: bool,
    },
    /// Execute a filed warrant
    Execute {
        target: String,
        #[arg(long)]
        force: bool,
    },
}

/// Resolve the reason from the flag or captured stdin. Empty input is
/// rejected either way.
pub fn resolve_reason(reason: Option<String>, stdin_text: Option<String>) -> Result<String> {
    let reason = match (reason, stdin_text) {
        (Some(reason), _) => reason,
        (None, Some(buf)) => buf.trim().to_string(),
        (None, None) => bail!("pass --reason <r> or --stdin"),
    };
    if reason.is_empty() {
        bail!("empty reason");
    }
    Ok(reason)
}

pub async fn handle(command: WarrantCommand) -> Result<()> {
    let app = App::load()?;
    match command {
        WarrantCommand::File {
            target,
            reason,
            stdin,
        } => {
            let stdin_text = if stdin {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                Some(buf)
            } else {
                None
            };
            let reason = resolve_reason(reason, stdin_text)?;
            let warrant = file_warrant(&app.town, &target, &reason, &crate::env::actor())?;
            println!("filed warrant {} against {}", warrant.id, target);
            Ok(())
        }
        WarrantCommand::List { all } => {
            let warrants = list_warrants(&app.town, all)?;
            if warrants.is_empty() {
                println!("no warrants");
                return Ok(());
            }
            for w in warrants {
                let state = if w.executed {
                    format!("executed {}", w.executed_at.as_deref().unwrap_or("?"))
                } else {
                    "pending".to_string()
                };
                println!(
                    "{}: {} ({}; filed by {} at {})",
                    w.target, w.reason, state, w.filed_by, w.filed_at
                );
            }
            Ok(())
        }
        WarrantCommand::Execute { target, force } => {
            let warrant = execute_warrant(&app.town, &app.sessions, &target, force).await?;
            println!(
                "executed warrant against {} at {}",
                target,
                warrant.executed_at.as_deref().unwrap_or("?")
            );
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "warrant_tests.rs"]
mod tests;
