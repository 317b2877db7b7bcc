//! Dispatch specs over a stubbed tracker.

use crate::prelude::*;

#[test]
fn dry_run_prints_the_plan_and_writes_nothing() {
    let town = make_town();
    town.stub_bd(r#"{"id":"gt-abc12","title":"Fix bug","status":"open"}"#);

    cli()
        .args(&["sling", "gt-abc12", "--dry-run"])
        .town(&town)
        .passes()
        .stdout_has("dry run")
        .stdout_has("spawn polecat in gastown")
        .stdout_has("hook gt-abc12");

    // No activity event, no worktree, no session side effects.
    assert!(!town.events_file().exists() || {
        std::fs::read_to_string(town.events_file()).unwrap().is_empty()
    });
    assert!(!town.root().join("gastown/polecats").exists());
}

#[test]
fn dry_run_surfaces_missing_beads() {
    let town = make_town();
    // Stub bd fails: unknown bead.
    let bin = town.stub_bin();
    std::fs::create_dir_all(&bin).unwrap();
    let script = "#!/bin/sh\necho 'issue not found' >&2\nexit 1\n";
    std::fs::write(bin.join("bd"), script).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(bin.join("bd"), std::fs::Permissions::from_mode(0o755))
            .unwrap();
    }

    cli()
        .args(&["sling", "gt-zzzzz", "--dry-run"])
        .town(&town)
        .fails()
        .stderr_has("not found");
}

#[test]
fn deferred_bead_is_refused() {
    let town = make_town();
    town.stub_bd(
        r#"{"id":"gt-abc12","title":"Later","status":"open","description":"deferred to post-launch"}"#,
    );

    cli()
        .args(&["sling", "gt-abc12", "--dry-run"])
        .town(&town)
        .fails()
        .stderr_has("deferred");
}

#[test]
fn unrouted_prefix_is_rejected() {
    let town = make_town();
    town.stub_bd(r#"{"id":"zz-abc12","status":"open"}"#);

    cli()
        .args(&["sling", "zz-abc12"])
        .town(&town)
        .fails()
        .stderr_has("no rig routes");
}

#[test]
fn formula_target_without_on_is_a_usage_error() {
    let town = make_town();
    cli()
        .args(&["sling", "build_and_test"])
        .town(&town)
        .fails()
        .stderr_has("--on");
}
