// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::TownCtx;
use gt_adapters::{FakeSessions, FakeTracker};
use gt_core::bead::{BeadStatus, DepType};
use gt_core::config::RigsFile;
use gt_core::fields::AttachmentFields;
use gt_core::test_support::{scaffold_town, BeadBuilder};
use gt_core::town::TownPaths;
use tempfile::TempDir;

fn engine() -> (TempDir, HookEngine<FakeTracker, FakeSessions>, FakeTracker) {
    let dir = TempDir::new().unwrap();
    scaffold_town(dir.path(), "citadel");
    let town = TownCtx::for_tests(TownPaths::new(dir.path()), "citadel", RigsFile::default());
    let tracker = FakeTracker::new();
    let engine = HookEngine::new(tracker.clone(), FakeSessions::new(), town);
    (dir, engine, tracker)
}

#[tokio::test]
async fn detach_clears_fields_and_writes_audit() {
    let (_dir, engine, tracker) = engine();
    tracker.insert(
        BeadBuilder::new("gt-abc12")
            .description(
                "Fix the login flow\n\nattached_molecule: gt-wisp-prev\ndispatched_by: mayor",
            )
            .build(),
    );

    engine
        .detach_molecule_with_audit("gt-abc12", "force re-sling", "mayor")
        .await
        .unwrap();

    let bead = tracker.get("gt-abc12").unwrap();
    let fields = AttachmentFields::parse(&bead.description);
    assert!(fields.is_empty(), "fields must be cleared: {}", bead.description);
    // Body text survives; the audit line is appended.
    assert!(bead.description.starts_with("Fix the login flow"));
    assert!(bead
        .description
        .contains("audit: detached gt-wisp-prev (force re-sling) by mayor"));
}

#[tokio::test]
async fn detach_on_missing_bead_is_fatal() {
    let (_dir, engine, _tracker) = engine();
    assert!(engine
        .detach_molecule_with_audit("gt-zzzzz", "r", "mayor")
        .await
        .is_err());
}

#[tokio::test]
async fn force_close_sweeps_depth_first() {
    let (_dir, engine, tracker) = engine();
    // wisp ← step1 ← sub1, wisp ← step2
    tracker.insert(BeadBuilder::new("gt-wisp-001").build());
    tracker.insert(BeadBuilder::new("gt-step1").build());
    tracker.insert(BeadBuilder::new("gt-step2").build());
    tracker.insert(BeadBuilder::new("gt-sub1").build());
    tracker
        .dep_add("gt-step1", "gt-wisp-001", DepType::ParentChild)
        .await
        .unwrap();
    tracker
        .dep_add("gt-step2", "gt-wisp-001", DepType::ParentChild)
        .await
        .unwrap();
    tracker
        .dep_add("gt-sub1", "gt-step1", DepType::ParentChild)
        .await
        .unwrap();

    let closed = engine.force_close("gt-wisp-001").await;
    assert_eq!(closed, 4);
    for id in ["gt-wisp-001", "gt-step1", "gt-step2", "gt-sub1"] {
        assert_eq!(
            tracker.get(id).unwrap().status,
            BeadStatus::Closed,
            "{id} should be closed"
        );
    }
}

#[tokio::test]
async fn force_close_of_missing_wisp_reports_zero() {
    let (_dir, engine, _tracker) = engine();
    // Close failures are logged and counted, never propagated.
    assert_eq!(engine.force_close("gt-wisp-gone").await, 0);
}

#[tokio::test]
async fn force_close_tolerates_already_closed_children() {
    let (_dir, engine, tracker) = engine();
    tracker.insert(BeadBuilder::new("gt-wisp-001").build());
    tracker.insert(
        BeadBuilder::new("gt-step1")
            .status(BeadStatus::Closed)
            .build(),
    );
    tracker
        .dep_add("gt-step1", "gt-wisp-001", DepType::ParentChild)
        .await
        .unwrap();

    let closed = engine.force_close("gt-wisp-001").await;
    assert_eq!(closed, 2);
}
