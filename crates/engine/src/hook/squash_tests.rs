// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::TownCtx;
use gt_adapters::{FakeSessions, FakeTracker, TrackerCall};
use gt_core::bead::{BeadStatus, DepType};
use gt_core::config::RigsFile;
use gt_core::fields::AttachmentFields;
use gt_core::test_support::{scaffold_town, BeadBuilder};
use gt_core::town::TownPaths;
use std::time::Duration;
use tempfile::TempDir;

fn engine() -> (TempDir, HookEngine<FakeTracker, FakeSessions>, FakeTracker) {
    let dir = TempDir::new().unwrap();
    scaffold_town(dir.path(), "citadel");
    let town = TownCtx::for_tests(TownPaths::new(dir.path()), "citadel", RigsFile::default());
    let tracker = FakeTracker::new();
    let engine = HookEngine::new(tracker.clone(), FakeSessions::new(), town);
    (dir, engine, tracker)
}

async fn seed_molecule(tracker: &FakeTracker) {
    tracker.insert(
        BeadBuilder::new("gt-abc12")
            .description("attached_molecule: gt-wisp-001")
            .build(),
    );
    tracker.insert(BeadBuilder::new("gt-wisp-001").build());
    tracker.insert(
        BeadBuilder::new("gt-step1")
            .status(BeadStatus::Closed)
            .build(),
    );
    tracker.insert(BeadBuilder::new("gt-step2").build());
    tracker
        .dep_add("gt-step1", "gt-wisp-001", DepType::ParentChild)
        .await
        .unwrap();
    tracker
        .dep_add("gt-step2", "gt-wisp-001", DepType::ParentChild)
        .await
        .unwrap();
}

#[tokio::test]
async fn squash_writes_digest_and_detaches() {
    let (_dir, engine, tracker) = engine();
    seed_molecule(&tracker).await;

    let digest_id = engine
        .squash("gt-abc12", "gastown/witness", Some("routine patrol"), None)
        .await
        .unwrap();

    // Digest: task, digest label, P4, ephemeral, closed immediately.
    let digest = tracker.get(&digest_id).unwrap();
    assert!(digest.has_label("digest"));
    assert_eq!(digest.priority, Some(4));
    assert_eq!(digest.status, BeadStatus::Closed);
    assert!(digest.description.contains("molecule: gt-wisp-001"));
    assert!(digest.description.contains("agent: gastown/witness"));
    assert!(digest.description.contains("steps: 1/2"));
    assert!(digest.description.contains("summary: routine patrol"));

    let created_ephemeral = tracker.calls().iter().any(|c| {
        matches!(c, TrackerCall::Create { opts } if opts.ephemeral && opts.priority == Some(4))
    });
    assert!(created_ephemeral);

    // Work bead is detached with audit; molecule closed.
    let bead = tracker.get("gt-abc12").unwrap();
    assert!(AttachmentFields::parse(&bead.description).is_empty());
    assert!(bead.description.contains("audit: detached gt-wisp-001 (squash)"));
    assert_eq!(tracker.get("gt-wisp-001").unwrap().status, BeadStatus::Closed);
}

#[tokio::test]
async fn squash_without_molecule_is_not_found() {
    let (_dir, engine, tracker) = engine();
    tracker.insert(BeadBuilder::new("gt-abc12").build());
    let err = engine
        .squash("gt-abc12", "gastown/witness", None, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn squash_jitter_is_bounded() {
    let (_dir, engine, tracker) = engine();
    seed_molecule(&tracker).await;

    let start = std::time::Instant::now();
    engine
        .squash(
            "gt-abc12",
            "gastown/witness",
            None,
            Some(Duration::from_millis(20)),
        )
        .await
        .unwrap();
    // Jitter sleeps at most the configured bound (plus scheduling slop).
    assert!(start.elapsed() < Duration::from_secs(2));
}
