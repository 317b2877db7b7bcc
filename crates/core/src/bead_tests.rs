// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn bead() -> Bead {
    Bead {
        id: "gt-abc12".to_string(),
        title: "Fix bug".to_string(),
        ..Default::default()
    }
}

#[test]
fn status_serde_uses_snake_case() {
    assert_eq!(
        serde_json::to_string(&BeadStatus::InProgress).unwrap(),
        "\"in_progress\""
    );
    let status: BeadStatus = serde_json::from_str("\"hooked\"").unwrap();
    assert_eq!(status, BeadStatus::Hooked);
}

#[test]
fn bead_deserializes_with_missing_fields() {
    let bead: Bead = serde_json::from_str(r#"{"id":"gt-abc12"}"#).unwrap();
    assert_eq!(bead.id, "gt-abc12");
    assert_eq!(bead.status, BeadStatus::Open);
    assert!(bead.assignee.is_none());
    assert!(bead.labels.is_empty());
}

#[test]
fn bead_ignores_unknown_fields() {
    let bead: Bead =
        serde_json::from_str(r#"{"id":"gt-abc12","created_at":"2026-01-01","foo":3}"#).unwrap();
    assert_eq!(bead.id, "gt-abc12");
}

#[test]
fn label_values() {
    let mut b = bead();
    b.labels = vec!["idle:3".to_string(), "digest".to_string()];
    assert_eq!(b.label_value("idle"), Some("3"));
    assert_eq!(b.label_value("backoff-until"), None);
    assert!(b.has_label("digest"));
    assert!(!b.has_label("idle"));
}

#[test]
fn deferred_by_status() {
    let mut b = bead();
    b.status = BeadStatus::Deferred;
    assert!(b.is_deferred());
}

#[test]
fn deferred_by_description_marker() {
    for marker in [
        "Deferred to post-launch cleanup",
        "deferred to post launch",
        "Status: deferred",
    ] {
        let mut b = bead();
        b.description = marker.to_string();
        assert!(b.is_deferred(), "marker not detected: {marker}");
    }
}

#[test]
fn open_plain_bead_is_not_deferred() {
    assert!(!bead().is_deferred());
}

#[test]
fn attached_wisps_unions_deps_and_description() {
    let mut b = bead();
    b.dependencies = vec![
        Dependency {
            id: "gt-wisp-aaa".to_string(),
            dep_type: DepType::Blocks,
        },
        Dependency {
            id: "gt-step-one".to_string(),
            dep_type: DepType::Blocks,
        },
        Dependency {
            id: "gt-wisp-parent".to_string(),
            dep_type: DepType::ParentChild,
        },
    ];
    b.description = "attached_molecule: gt-wisp-bbb".to_string();

    let wisps = b.attached_wisps();
    assert_eq!(wisps, vec!["gt-wisp-aaa".to_string(), "gt-wisp-bbb".to_string()]);
}

#[test]
fn attached_wisps_dedups_description_field() {
    let mut b = bead();
    b.dependencies = vec![Dependency {
        id: "gt-wisp-aaa".to_string(),
        dep_type: DepType::Blocks,
    }];
    b.description = "attached_molecule: gt-wisp-aaa".to_string();
    assert_eq!(b.attached_wisps(), vec!["gt-wisp-aaa".to_string()]);
}

#[test]
fn attached_wisps_unwraps_external_refs() {
    let mut b = bead();
    b.dependencies = vec![Dependency {
        id: "external:gt:gt-wisp-ccc".to_string(),
        dep_type: DepType::Blocks,
    }];
    assert_eq!(b.attached_wisps(), vec!["gt-wisp-ccc".to_string()]);
}
