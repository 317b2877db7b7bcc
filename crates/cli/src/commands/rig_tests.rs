// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::Parser;

#[derive(Parser)]
struct Harness {
    #[command(subcommand)]
    command: RigCommand,
}

#[test]
fn shutdown_flags_parse() {
    let harness = Harness::parse_from(["rig", "shutdown", "gastown", "--nuclear"]);
    let RigCommand::Shutdown {
        name,
        force,
        nuclear,
    } = harness.command
    else {
        panic!("expected shutdown");
    };
    assert_eq!(name, "gastown");
    assert!(!force);
    assert!(nuclear);
}

#[test]
fn reset_selectors_parse() {
    let harness = Harness::parse_from([
        "rig", "reset", "gastown", "--mail", "--stale", "--dry-run",
    ]);
    let RigCommand::Reset {
        name,
        handoff,
        mail,
        stale,
        dry_run,
    } = harness.command
    else {
        panic!("expected reset");
    };
    assert_eq!(name, "gastown");
    assert!(!handoff && mail && stale && dry_run);
}

#[test]
fn start_accepts_many_rigs() {
    let harness = Harness::parse_from(["rig", "start", "gastown", "bartertown"]);
    let RigCommand::Start { names } = harness.command else {
        panic!("expected start");
    };
    assert_eq!(names, vec!["gastown", "bartertown"]);
}
