// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Warrants: filed intents to terminate an agent.
//!
//! Records are JSON files under `warrants/`, written atomically via
//! tmp-and-rename. Execution kills the target's session and marks the
//! warrant executed; `executed` never unsets.

use crate::activity::append_event;
use crate::context::TownCtx;
use crate::error::EngineError;
use crate::identity::IdentityResolver;
use gt_adapters::{SessionError, Sessions};
use gt_core::event::ActivityEvent;
use gt_core::warrant::Warrant;
use std::path::Path;

fn write_warrant(path: &Path, warrant: &Warrant) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(warrant).map_err(std::io::Error::other)?;
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn read_warrant(path: &Path) -> Result<Warrant, EngineError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content).map_err(std::io::Error::other)?)
}

/// File a warrant against a target. Refuses while an unexecuted warrant
/// for the same target exists.
pub fn file_warrant(
    town: &TownCtx,
    target: &str,
    reason: &str,
    filed_by: &str,
) -> Result<Warrant, EngineError> {
    let path = town.paths().warrant_file(target);
    if path.is_file() {
        let existing = read_warrant(&path)?;
        if !existing.executed {
            return Err(EngineError::Conflict(format!(
                "unexecuted warrant against {} already filed by {}",
                target, existing.filed_by
            )));
        }
    }
    let warrant = Warrant::file(target, reason, filed_by);
    write_warrant(&path, &warrant)?;

    let event = ActivityEvent::new(
        ActivityEvent::WARRANT,
        filed_by,
        serde_json::json!({ "target": target, "action": "filed" }),
    );
    if let Err(err) = append_event(town.paths(), &event) {
        tracing::warn!(error = %err, "failed to append warrant event");
    }
    Ok(warrant)
}

/// All warrants; pending ones only unless `all`.
pub fn list_warrants(town: &TownCtx, all: bool) -> Result<Vec<Warrant>, EngineError> {
    let dir = town.paths().warrants_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut warrants = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".warrant.json"))
        {
            continue;
        }
        match read_warrant(&path) {
            Ok(warrant) if all || !warrant.executed => warrants.push(warrant),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unreadable warrant");
            }
        }
    }
    warrants.sort_by(|a, b| a.filed_at.cmp(&b.filed_at));
    Ok(warrants)
}

/// Execute the warrant against `target`: kill its session (best
/// effort), mark executed. Re-running an already-executed warrant
/// requires `force` and never rewrites the original timestamp.
pub async fn execute_warrant<S: Sessions>(
    town: &TownCtx,
    sessions: &S,
    target: &str,
    force: bool,
) -> Result<Warrant, EngineError> {
    let path = town.paths().warrant_file(target);
    if !path.is_file() {
        return Err(EngineError::NotFound(format!("warrant for {}", target)));
    }
    let mut warrant = read_warrant(&path)?;
    if warrant.executed && !force {
        return Err(EngineError::Conflict(format!(
            "warrant against {} already executed at {}",
            target,
            warrant.executed_at.as_deref().unwrap_or("?")
        )));
    }

    let resolver = IdentityResolver::new(town, sessions);
    let addr = resolver.resolve(target, None).await?;
    let session = addr.session_name(town.name());
    match sessions.kill_session(&session).await {
        Ok(()) => {}
        Err(SessionError::NotFound(_)) | Err(SessionError::NoServer) => {
            // Nothing to kill; the warrant still completes.
        }
        Err(err) => {
            // The kill is best-effort: a multiplexer hiccup must not
            // leave the warrant half-executed forever.
            tracing::warn!(session, error = %err, "kill failed during warrant execution");
        }
    }

    warrant.mark_executed();
    write_warrant(&path, &warrant)?;

    let event = ActivityEvent::new(
        ActivityEvent::WARRANT,
        target,
        serde_json::json!({ "target": target, "action": "executed" }),
    );
    if let Err(err) = append_event(town.paths(), &event) {
        tracing::warn!(error = %err, "failed to append warrant event");
    }
    Ok(warrant)
}

#[cfg(test)]
#[path = "warrant_tests.rs"]
mod tests;
