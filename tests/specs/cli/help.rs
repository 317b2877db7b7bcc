//! CLI help output specs
//!
//! Verify help text displays for the command surface.

use crate::prelude::*;

#[test]
fn gt_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn gt_sling_help_shows_flags() {
    cli()
        .args(&["sling", "--help"])
        .passes()
        .stdout_has("--on")
        .stdout_has("--dry-run")
        .stdout_has("--no-merge")
        .stdout_has("--force");
}

#[test]
fn gt_nudge_help_shows_modes() {
    cli()
        .args(&["nudge", "--help"])
        .passes()
        .stdout_has("--mode")
        .stdout_has("--if-fresh")
        .stdout_has("--priority");
}

#[test]
fn gt_mol_help_shows_subcommands() {
    cli()
        .args(&["mol", "--help"])
        .passes()
        .stdout_has("status")
        .stdout_has("squash")
        .stdout_has("await-signal");
}

#[test]
fn gt_rig_help_shows_lifecycle() {
    cli()
        .args(&["rig", "--help"])
        .passes()
        .stdout_has("boot")
        .stdout_has("shutdown")
        .stdout_has("status");
}

#[test]
fn gt_dog_help_shows_pool_commands() {
    cli()
        .args(&["dog", "--help"])
        .passes()
        .stdout_has("dispatch")
        .stdout_has("call")
        .stdout_has("done");
}

#[test]
fn gt_warrant_help_shows_subcommands() {
    cli()
        .args(&["warrant", "--help"])
        .passes()
        .stdout_has("file")
        .stdout_has("execute");
}

#[test]
fn gt_version_prints() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}
