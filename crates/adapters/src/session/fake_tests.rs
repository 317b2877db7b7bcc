// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn spawn_records_and_sessions_live() {
    let sessions = FakeSessions::new();
    sessions
        .new_session_with_command(
            "gt-gastown-nux",
            Path::new("/town/gastown/polecats/nux/rig"),
            "claude --dangerously-skip-permissions",
            &[("GT_ROLE".to_string(), "polecat".to_string())],
        )
        .await
        .unwrap();

    assert!(sessions.has_session("gt-gastown-nux").await.unwrap());
    assert_eq!(
        sessions
            .get_environment("gt-gastown-nux", "GT_ROLE")
            .await
            .unwrap()
            .as_deref(),
        Some("polecat")
    );
    assert!(matches!(
        sessions.calls().first(),
        Some(SessionCall::Spawn { name, .. }) if name == "gt-gastown-nux"
    ));
}

#[tokio::test]
async fn nudge_to_dead_session_errors() {
    let sessions = FakeSessions::new();
    sessions.add_session("gt-gastown-witness", false);
    let err = sessions
        .nudge_session("gt-gastown-witness", "wake up")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)));
}

#[tokio::test]
async fn no_server_propagates() {
    let sessions = FakeSessions::new();
    sessions.stop_server();
    let err = sessions.nudge_session("anything", "hi").await.unwrap_err();
    assert!(matches!(err, SessionError::NoServer));
    assert!(err.is_terminal());
    assert!(sessions.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn kill_marks_dead_and_listing_skips() {
    let sessions = FakeSessions::new();
    sessions.add_session("gt-mayor", true);
    sessions.kill_session("gt-mayor").await.unwrap();
    assert!(!sessions.has_session("gt-mayor").await.unwrap());
    assert!(sessions.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn created_unix_tracks_fake_clock() {
    let sessions = FakeSessions::new();
    let start = sessions.now_unix();
    sessions.advance_clock(120);
    sessions
        .new_session_with_command("gt-deacon", Path::new("/"), "sleep 1", &[])
        .await
        .unwrap();
    assert_eq!(
        sessions.created_unix("gt-deacon").await.unwrap(),
        start + 120
    );
}

#[tokio::test]
async fn runtime_ready_reflects_agent_state() {
    let sessions = FakeSessions::new();
    sessions.add_session("gt-gastown-nux", true);
    let runtime = RuntimeConfig::default();

    sessions
        .wait_for_runtime_ready("gt-gastown-nux", &runtime, Duration::from_secs(1))
        .await
        .unwrap();

    sessions.set_agent_running("gt-gastown-nux", false);
    let err = sessions
        .wait_for_runtime_ready("gt-gastown-nux", &runtime, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Timeout(_)));
}
