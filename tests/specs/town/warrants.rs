//! Warrant lifecycle specs (pure filesystem, no external binaries).

use crate::prelude::*;

#[test]
fn file_list_execute_round_trip() {
    let town = make_town();

    cli()
        .args(&[
            "warrant",
            "file",
            "gastown/polecats/nux",
            "--reason",
            "stuck in a loop",
        ])
        .town(&town)
        .passes()
        .stdout_has("filed warrant");

    cli()
        .args(&["warrant", "list"])
        .town(&town)
        .passes()
        .stdout_has("gastown/polecats/nux")
        .stdout_has("stuck in a loop")
        .stdout_has("pending");

    // No session exists for the target; execution still completes.
    cli()
        .args(&["warrant", "execute", "gastown/polecats/nux"])
        .town(&town)
        .passes()
        .stdout_has("executed warrant");

    // Executed warrants leave the default listing but survive --all.
    cli()
        .args(&["warrant", "list"])
        .town(&town)
        .passes()
        .stdout_has("no warrants");
    cli()
        .args(&["warrant", "list", "--all"])
        .town(&town)
        .passes()
        .stdout_has("executed");
}

#[test]
fn duplicate_pending_warrant_is_refused() {
    let town = make_town();
    cli()
        .args(&["warrant", "file", "mayor", "--reason", "coup"])
        .town(&town)
        .passes();
    cli()
        .args(&["warrant", "file", "mayor", "--reason", "another coup"])
        .town(&town)
        .fails()
        .stderr_has("already filed");
}

#[test]
fn executing_an_unfiled_warrant_fails() {
    let town = make_town();
    cli()
        .args(&["warrant", "execute", "gastown/witness"])
        .town(&town)
        .fails()
        .stderr_has("not found");
}

#[test]
fn warrant_record_is_json_on_disk() {
    let town = make_town();
    cli()
        .args(&["warrant", "file", "deacon", "--reason", "asleep"])
        .town(&town)
        .passes();

    let path = town.root().join("warrants/deacon.warrant.json");
    let content = std::fs::read_to_string(path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["target"], "deacon");
    assert_eq!(value["reason"], "asleep");
    assert_eq!(value["executed"], false);
    assert_eq!(value["filed_by"], "mayor");
}
