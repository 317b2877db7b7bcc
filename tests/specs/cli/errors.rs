//! Error-path specs: exit codes and diagnostics.

use crate::prelude::*;

#[test]
fn outside_a_town_fails_with_diagnostic() {
    let dir = tempfile::TempDir::new().unwrap();
    cli()
        .args(&["rig", "list"])
        .pwd(dir.path())
        .fails()
        .stderr_has("not inside a town");
}

#[test]
fn unknown_subcommand_fails() {
    cli().args(&["warboys"]).fails();
}

#[test]
fn nudge_without_message_fails() {
    let town = make_town();
    cli()
        .args(&["nudge", "gastown/witness"])
        .town(&town)
        .fails()
        .stderr_has("-m");
}

#[test]
fn warrant_file_without_reason_fails() {
    let town = make_town();
    cli()
        .args(&["warrant", "file", "gastown/polecats/nux"])
        .town(&town)
        .fails()
        .stderr_has("--reason");
}

#[test]
fn rig_boot_of_unknown_rig_fails() {
    let town = make_town();
    cli()
        .args(&["rig", "boot", "wasteland"])
        .town(&town)
        .fails()
        .stderr_has("not found");
}

#[test]
fn sling_bad_var_fails() {
    let town = make_town();
    cli()
        .args(&["sling", "gt-abc12", "--var", "noequals"])
        .town(&town)
        .fails()
        .stderr_has("k=v");
}
