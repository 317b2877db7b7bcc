// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn acquire_records_holder_info() {
    let dir = TempDir::new().unwrap();
    let lock = IdentityLock::acquire(dir.path(), "gt-gastown-nux").unwrap();
    assert!(lock.path().exists());

    let info = IdentityLock::holder(dir.path()).unwrap();
    assert_eq!(info.pid, std::process::id());
    assert_eq!(info.session_id, "gt-gastown-nux");
    assert!(!info.acquired_at.is_empty());
}

#[test]
fn second_claimant_collides_with_diagnostics() {
    let dir = TempDir::new().unwrap();
    let _held = IdentityLock::acquire(dir.path(), "gt-gastown-nux").unwrap();

    let err = IdentityLock::acquire(dir.path(), "gt-gastown-nux").unwrap_err();
    let EngineError::IdentityCollision { holder } = err else {
        panic!("expected identity collision");
    };
    assert!(
        holder.contains(&std::process::id().to_string()),
        "diagnostics name the holder: {holder}"
    );
    assert!(holder.contains("gt-gastown-nux"));
}

#[test]
fn drop_releases_the_lock() {
    let dir = TempDir::new().unwrap();
    {
        let _lock = IdentityLock::acquire(dir.path(), "first").unwrap();
    }
    // Reacquire after release.
    let second = IdentityLock::acquire(dir.path(), "second").unwrap();
    assert_eq!(
        IdentityLock::holder(dir.path()).unwrap().session_id,
        "second"
    );
    drop(second);
}

#[test]
fn repair_removes_the_lock_file() {
    let dir = TempDir::new().unwrap();
    {
        let _lock = IdentityLock::acquire(dir.path(), "stale").unwrap();
    }
    IdentityLock::repair(dir.path()).unwrap();
    assert!(IdentityLock::holder(dir.path()).is_none());
}
