//! Nudge delivery specs.
//!
//! Direct delivery needs a live tmux server, so these specs stay on the
//! failure paths and the queue filesystem contract; happy paths run in
//! the engine's unit tests against the fake session adapter.

use crate::prelude::*;

#[test]
fn queue_for_missing_session_exits_nonzero() {
    let town = make_town();
    town.stub_bd(r#"{"id":"gt-gastown-witness","status":"open"}"#);

    // Whether tmux is absent or simply has no such session, enqueueing
    // for an undeliverable target is an error, not a silent write.
    cli()
        .args(&[
            "nudge",
            "gastown/witness",
            "-m",
            "check queue",
            "--mode",
            "queue",
        ])
        .town(&town)
        .fails();

    let queue_dir = town.root().join(".nudges/gt-gastown-witness");
    assert!(
        !queue_dir.exists(),
        "no queue entry may be written for a dead session"
    );
}

#[test]
fn unknown_channel_is_not_found() {
    let town = make_town();
    cli()
        .args(&["nudge", "channel:ghost", "-m", "hi"])
        .town(&town)
        .fails()
        .stderr_has("channel");
}

#[test]
fn empty_message_is_rejected() {
    let town = make_town();
    cli()
        .args(&["nudge", "gastown/witness", "-m", ""])
        .town(&town)
        .fails()
        .stderr_has("empty message");
}
