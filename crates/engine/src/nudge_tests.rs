// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::TownCtx;
use gt_adapters::{FakeSessions, FakeTracker};
use gt_core::config::{RigEntry, RigsFile};
use gt_core::test_support::{scaffold_town, BeadBuilder};
use gt_core::town::TownPaths;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    pipeline: NudgePipeline<FakeTracker, FakeSessions>,
    tracker: FakeTracker,
    sessions: FakeSessions,
    town: TownCtx,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    scaffold_town(dir.path(), "citadel");
    let mut rigs = RigsFile::default();
    rigs.rigs.insert(
        "gastown".to_string(),
        RigEntry {
            prefix: "gt".to_string(),
            default_branch: "main".to_string(),
        },
    );
    let town = TownCtx::for_tests(TownPaths::new(dir.path()), "citadel", rigs);
    let tracker = FakeTracker::new();
    let sessions = FakeSessions::new();
    let pipeline = NudgePipeline::new(tracker.clone(), sessions.clone(), town.clone());
    Fixture {
        _dir: dir,
        pipeline,
        tracker,
        sessions,
        town,
    }
}

fn request(target: &str, mode: NudgeMode) -> NudgeRequest {
    NudgeRequest {
        target: target.to_string(),
        message: "check queue".to_string(),
        sender: "mayor".to_string(),
        mode,
        ..Default::default()
    }
}

#[tokio::test]
async fn immediate_prefixes_sender_once() {
    let f = fixture();
    f.sessions.add_session("gt-gastown-witness", true);

    let outcome = f
        .pipeline
        .deliver(&request("gastown/witness", NudgeMode::Immediate))
        .await
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::Delivered);

    let nudges = f.sessions.nudges_for("gt-gastown-witness");
    assert_eq!(nudges, vec!["[from mayor] check queue".to_string()]);
}

#[tokio::test]
async fn queue_mode_writes_structured_entry() {
    let f = fixture();
    f.sessions.add_session("gt-gastown-witness", true);

    let outcome = f
        .pipeline
        .deliver(&request("gastown/witness", NudgeMode::Queue))
        .await
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::Queued);

    // Nothing hit the pane.
    assert!(f.sessions.nudges_for("gt-gastown-witness").is_empty());

    // One structured entry; the sender is a field, not a prefix.
    let entries = f.pipeline.drain_queue("gt-gastown-witness").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].sender, "mayor");
    assert_eq!(entries[0].message, "check queue");
    assert_eq!(entries[0].priority, NudgePriority::Normal);

    // Drain consumed the entries.
    assert!(f.pipeline.drain_queue("gt-gastown-witness").unwrap().is_empty());
}

#[tokio::test]
async fn queue_for_dead_session_errors() {
    let f = fixture();
    let err = f
        .pipeline
        .deliver(&request("gastown/witness", NudgeMode::Queue))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Session(SessionError::NotFound(_))
    ));

    // No queue directory was created for the dead session.
    assert!(f
        .pipeline
        .drain_queue("gt-gastown-witness")
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn wait_idle_delivers_when_idle() {
    let f = fixture();
    f.sessions.add_session("gt-gastown-witness", true);
    f.sessions.set_idle("gt-gastown-witness", true);

    let outcome = f
        .pipeline
        .deliver(&request("gastown/witness", NudgeMode::WaitIdle))
        .await
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::Delivered);
    assert_eq!(f.sessions.nudges_for("gt-gastown-witness").len(), 1);
}

#[tokio::test]
async fn wait_idle_enqueues_on_busy() {
    let f = fixture();
    f.sessions.add_session("gt-gastown-witness", true);
    f.sessions.set_idle("gt-gastown-witness", false);

    let outcome = f
        .pipeline
        .deliver(&request("gastown/witness", NudgeMode::WaitIdle))
        .await
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::Queued);
    assert!(f.sessions.nudges_for("gt-gastown-witness").is_empty());
}

#[tokio::test]
async fn wait_idle_propagates_terminal_errors() {
    let f = fixture();
    // Session does not exist: wait_for_idle reports NotFound.
    let err = f
        .pipeline
        .deliver(&request("gastown/witness", NudgeMode::WaitIdle))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Session(e) if e.is_terminal()));
}

#[tokio::test]
async fn dnd_skips_muted_targets() {
    let f = fixture();
    f.sessions.add_session("gt-gastown-witness", true);
    f.tracker.insert(
        BeadBuilder::new("gt-gastown-witness")
            .description("notification_level: muted")
            .build(),
    );

    let outcome = f
        .pipeline
        .deliver(&request("gastown/witness", NudgeMode::Immediate))
        .await
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::DndSkipped);
    assert!(f.sessions.nudges_for("gt-gastown-witness").is_empty());
}

#[tokio::test]
async fn force_bypasses_dnd() {
    let f = fixture();
    f.sessions.add_session("gt-gastown-witness", true);
    f.tracker.insert(
        BeadBuilder::new("gt-gastown-witness")
            .description("notification_level: muted")
            .build(),
    );

    let mut req = request("gastown/witness", NudgeMode::Immediate);
    req.force = true;
    let outcome = f.pipeline.deliver(&req).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Delivered);
}

#[tokio::test]
async fn dnd_fails_open_when_bead_missing() {
    let f = fixture();
    f.sessions.add_session("gt-gastown-witness", true);
    // No agent bead in the tracker at all.
    let outcome = f
        .pipeline
        .deliver(&request("gastown/witness", NudgeMode::Immediate))
        .await
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::Delivered);
}

#[tokio::test]
async fn if_fresh_suppresses_old_callers() {
    let f = fixture();
    f.sessions.add_session("gt-gastown-witness", true);
    // Caller session created 120s in the past.
    let created = gt_core::time_fmt::unix_now() as i64 - 120;
    f.sessions.add_session_created("gt-gastown-nux", true, created);

    let mut req = request("gastown/witness", NudgeMode::Immediate);
    req.if_fresh = true;
    req.caller_session = Some("gt-gastown-nux".to_string());
    let outcome = f.pipeline.deliver(&req).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Suppressed);
    assert!(f.sessions.nudges_for("gt-gastown-witness").is_empty());
}

#[tokio::test]
async fn if_fresh_allows_fresh_callers() {
    let f = fixture();
    f.sessions.add_session("gt-gastown-witness", true);
    let created = gt_core::time_fmt::unix_now() as i64 - 5;
    f.sessions.add_session_created("gt-gastown-nux", true, created);

    let mut req = request("gastown/witness", NudgeMode::Immediate);
    req.if_fresh = true;
    req.caller_session = Some("gt-gastown-nux".to_string());
    let outcome = f.pipeline.deliver(&req).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Delivered);
}

#[tokio::test]
async fn channel_fans_out_to_matching_live_sessions() {
    let f = fixture();
    std::fs::write(
        f.town.paths().channels_file(),
        r#"{"monitors":["*/witness","mayor"],"cats":["gastown/polecats/*"]}"#,
    )
    .unwrap();
    f.sessions.add_session("gt-gastown-witness", true);
    f.sessions.add_session("gt-mayor", true);
    f.sessions.add_session("gt-gastown-nux", true);

    let outcome = f
        .pipeline
        .deliver(&request("channel:monitors", NudgeMode::Immediate))
        .await
        .unwrap();
    let DeliveryOutcome::Channel(results) = outcome else {
        panic!("expected channel outcome");
    };
    let mut targets: Vec<&str> = results.iter().map(|(t, _)| t.as_str()).collect();
    targets.sort_unstable();
    assert_eq!(targets, vec!["gastown/witness", "mayor"]);

    // The polecat channel matches the wildcard.
    let outcome = f
        .pipeline
        .deliver(&request("channel:cats", NudgeMode::Immediate))
        .await
        .unwrap();
    let DeliveryOutcome::Channel(results) = outcome else {
        panic!("expected channel outcome");
    };
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "gastown/polecats/nux");
}

#[tokio::test]
async fn unknown_channel_is_not_found() {
    let f = fixture();
    std::fs::write(f.town.paths().channels_file(), "{}").unwrap();
    let err = f
        .pipeline
        .deliver(&request("channel:ghost", NudgeMode::Immediate))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn nudge_appends_activity_event() {
    let f = fixture();
    f.sessions.add_session("gt-gastown-witness", true);
    f.pipeline
        .deliver(&request("gastown/witness", NudgeMode::Immediate))
        .await
        .unwrap();

    let feed = std::fs::read_to_string(f.town.paths().events_file()).unwrap();
    assert_eq!(feed.lines().filter(|l| l.contains("\"nudge\"")).count(), 1);
}
