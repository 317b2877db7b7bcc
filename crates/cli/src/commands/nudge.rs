// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gt nudge` - deliver a message into an agent's pane

use crate::app::App;
use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use gt_engine::{DeliveryOutcome, NudgeMode, NudgePipeline, NudgePriority, NudgeRequest};
use std::io::Read;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum ModeArg {
    #[default]
    Immediate,
    Queue,
    WaitIdle,
}

impl From<ModeArg> for NudgeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Immediate => NudgeMode::Immediate,
            ModeArg::Queue => NudgeMode::Queue,
            ModeArg::WaitIdle => NudgeMode::WaitIdle,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum PriorityArg {
    #[default]
    Normal,
    Urgent,
}

impl From<PriorityArg> for NudgePriority {
    fn from(priority: PriorityArg) -> Self {
        match priority {
            PriorityArg::Normal => NudgePriority::Normal,
            PriorityArg::Urgent => NudgePriority::Urgent,
        }
    }
}

#[derive(Args)]
pub struct NudgeArgs {
    /// Agent address, `rig/name` short form, or `channel:<name>`
    pub target: String,

    /// Message text
    #[arg(short, long)]
    pub message: Option<String>,

    /// Read the message from stdin
    #[arg(long, conflicts_with = "message")]
    pub stdin: bool,

    /// Bypass do-not-disturb
    #[arg(long)]
    pub force: bool,

    /// Suppress unless the caller's session is fresh
    #[arg(long)]
    pub if_fresh: bool,

    /// Delivery mode
    #[arg(long, value_enum, default_value_t)]
    pub mode: ModeArg,

    /// Message priority
    #[arg(long, value_enum, default_value_t)]
    pub priority: PriorityArg,
}

pub async fn handle(args: NudgeArgs) -> Result<()> {
    let message = match (&args.message, args.stdin) {
        (Some(message), _) => message.clone(),
        (None, true) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf.trim_end().to_string()
        }
        (None, false) => bail!("pass -m <msg> or --stdin"),
    };
    if message.is_empty() {
        bail!("empty message");
    }

    let app = App::load()?;
    let caller = crate::env::role_context();
    let caller_session = gt_core::address::AgentAddress::from_role_context(&caller)
        .map(|addr| addr.session_name(app.town.name()));

    let request = NudgeRequest {
        target: args.target.clone(),
        message,
        sender: caller.actor(),
        mode: args.mode.into(),
        priority: args.priority.into(),
        force: args.force,
        if_fresh: args.if_fresh,
        caller_session,
        rig_context: crate::env::rig_context(),
    };

    let pipeline = NudgePipeline::new(app.tracker.clone(), app.sessions.clone(), app.town.clone());
    match pipeline.deliver(&request).await? {
        DeliveryOutcome::Delivered => println!("delivered to {}", args.target),
        DeliveryOutcome::Queued => println!("queued for {}", args.target),
        DeliveryOutcome::DndSkipped => println!("{} is muted; not delivered", args.target),
        DeliveryOutcome::Suppressed => println!("suppressed (--if-fresh)"),
        DeliveryOutcome::Channel(results) => {
            for (target, outcome) in results {
                let verb = match outcome {
                    DeliveryOutcome::Delivered => "delivered",
                    DeliveryOutcome::Queued => "queued",
                    DeliveryOutcome::DndSkipped => "muted",
                    _ => "skipped",
                };
                println!("{}: {}", target, verb);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "nudge_tests.rs"]
mod tests;
