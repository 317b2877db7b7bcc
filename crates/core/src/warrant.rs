// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Warrant records: an intent to terminate an agent.

use serde::{Deserialize, Serialize};

/// A filed intent-to-terminate. Stored as JSON under `warrants/`.
///
/// `executed` is monotonic: once set it is never unset, and
/// `executed_at` never changes after the first execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warrant {
    pub id: String,
    pub target: String,
    pub reason: String,
    pub filed_by: String,
    pub filed_at: String,
    #[serde(default)]
    pub executed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<String>,
}

impl Warrant {
    pub fn file(
        target: impl Into<String>,
        reason: impl Into<String>,
        filed_by: impl Into<String>,
    ) -> Self {
        let target = target.into();
        Self {
            id: format!("warrant-{}", crate::time_fmt::unix_now()),
            target,
            reason: reason.into(),
            filed_by: filed_by.into(),
            filed_at: crate::time_fmt::format_utc_now(),
            executed: false,
            executed_at: None,
        }
    }

    /// Mark executed. Idempotent: the first timestamp sticks.
    pub fn mark_executed(&mut self) {
        if !self.executed {
            self.executed = true;
            self.executed_at = Some(crate::time_fmt::format_utc_now());
        }
    }
}
