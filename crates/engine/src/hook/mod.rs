// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hook engine: atomic attach/detach of work to agents.
//!
//! A hook is the relation "agent A is responsible for bead B",
//! represented on both sides: B carries status `hooked`, the assignee,
//! and the attachment block; A's identity bead carries B in its
//! `hook_bead` slot. The engine writes both in a defined order and
//! verifies the primary write.

mod attach;
mod burn;
mod squash;

use crate::context::TownCtx;
use crate::error::EngineError;
use gt_adapters::{Sessions, Tracker, TrackerError, UpdatePatch};
use gt_core::address::AgentAddress;
use gt_core::bead::BeadStatus;
use gt_core::fields::{MergeStrategy, WorkMode};
use gt_core::retry::RetryPolicy;

/// Options for [`HookEngine::attach_work`].
#[derive(Debug, Clone, Default)]
pub struct AttachOptions {
    /// Formula to instantiate onto the bead (formula-on-bead).
    pub formula: Option<String>,
    /// User variables appended after the auto-injected `feature`/`issue`.
    pub vars: Vec<(String, String)>,
    /// Free-text args recorded in the attachment block.
    pub args: Option<String>,
    pub no_merge: bool,
    pub mode: Option<WorkMode>,
    pub convoy_id: Option<String>,
    pub merge_strategy: Option<MergeStrategy>,
    /// Burn an existing molecule / replace a live hook.
    pub force: bool,
    /// Plan only; no tracker writes.
    pub dry_run: bool,
    /// Who is dispatching (recorded as `dispatched_by`).
    pub dispatcher: String,
    /// Skip the formula cook step (already materialized).
    pub skip_cook: bool,
}

/// Result of a successful (or planned) attach.
#[derive(Debug, Clone)]
pub struct HookOutcome {
    pub bead: String,
    pub agent: AgentAddress,
    /// Wisp root when a formula was instantiated.
    pub wisp_root: Option<String>,
    /// Prior molecule wisps burned by force.
    pub burned: Vec<String>,
    pub dry_run: bool,
}

/// Atomic hook assignment over the tracker and session adapters.
#[derive(Clone)]
pub struct HookEngine<T: Tracker, S: Sessions> {
    pub(crate) tracker: T,
    pub(crate) sessions: S,
    pub(crate) town: TownCtx,
    pub(crate) policy: RetryPolicy,
}

impl<T: Tracker, S: Sessions> HookEngine<T, S> {
    pub fn new(tracker: T, sessions: S, town: TownCtx) -> Self {
        Self {
            tracker,
            sessions,
            town,
            policy: RetryPolicy::HOOK_UPDATE,
        }
    }

    /// Override the retry policy (tests shrink the delays).
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn town(&self) -> &TownCtx {
        &self.town
    }

    /// The atomic hook update: `status=hooked, assignee=<agent>` followed
    /// by a post-write verification read. Retries within the policy
    /// budget; configuration errors short-circuit.
    pub(crate) async fn atomic_hook_update(
        &self,
        bead_id: &str,
        assignee: &str,
    ) -> Result<(), EngineError> {
        let patch = UpdatePatch::default()
            .status(BeadStatus::Hooked)
            .assignee(assignee);

        let mut attempt = 1;
        loop {
            let reason = match self.tracker.update(bead_id, &patch).await {
                Err(TrackerError::Config(msg)) => return Err(EngineError::Config(msg)),
                Err(TrackerError::NotFound(msg)) => return Err(EngineError::NotFound(msg)),
                Err(err) => err.to_string(),
                Ok(()) => match self.tracker.show(bead_id, false).await {
                    Err(TrackerError::Config(msg)) => return Err(EngineError::Config(msg)),
                    Err(err) => err.to_string(),
                    Ok(bead)
                        if bead.status == BeadStatus::Hooked
                            && bead.assignee.as_deref() == Some(assignee) =>
                    {
                        return Ok(());
                    }
                    Ok(bead) => format!(
                        "verification mismatch: status={} assignee={:?}",
                        bead.status, bead.assignee
                    ),
                },
            };

            if attempt >= self.policy.attempts {
                return Err(EngineError::Store(format!(
                    "hook update failed after {} attempts: {}",
                    attempt, reason
                )));
            }
            let delay = self.policy.jittered_delay(attempt);
            tracing::debug!(
                bead = bead_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason,
                "retrying hook update"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
#[path = "burn_tests.rs"]
mod burn_tests;
#[cfg(test)]
#[path = "squash_tests.rs"]
mod squash_tests;
