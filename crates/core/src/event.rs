// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity-feed events.
//!
//! One JSON object per line in the town's `.events.jsonl`. The feed is
//! the single wake-signal source for patrol loops, so every dispatch,
//! spawn, and nudge appends exactly one line.

use serde::{Deserialize, Serialize};

/// One line of the town activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub actor: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub ts: String,
}

impl ActivityEvent {
    pub const SLING: &'static str = "sling";
    pub const SPAWN: &'static str = "spawn";
    pub const NUDGE: &'static str = "nudge";
    pub const WARRANT: &'static str = "warrant";

    pub fn new(kind: &str, actor: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.to_string(),
            actor: actor.into(),
            payload,
            ts: crate::time_fmt::format_utc_now(),
        }
    }
}
