// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Await-signal: the patrol loop primitive.
//!
//! Long-lived agents (witness, refinery, deacon) sleep on the activity
//! feed with exponential idle backoff. The wake time is persisted as a
//! `backoff-until` label so an interrupted wait resumes instead of
//! restarting: cumulative wait across interrupts equals one
//! uninterrupted wait.

use crate::activity::EventTail;
use crate::context::TownCtx;
use crate::error::EngineError;
use gt_adapters::{Tracker, UpdatePatch};
use gt_core::bead::Bead;
use gt_core::retry::RetryPolicy;
use std::time::Duration;

/// Poll interval over the events file.
const FEED_POLL: Duration = Duration::from_millis(200);

const IDLE_LABEL: &str = "idle";
const BACKOFF_LABEL: &str = "backoff-until";

/// Options for [`await_signal`].
#[derive(Debug, Clone)]
pub struct AwaitOptions {
    /// Flat timeout when no backoff is configured.
    pub timeout: Duration,
    /// Enables idle backoff: `min(base · mult^idle, max)`.
    pub backoff_base: Option<Duration>,
    pub backoff_mult: f64,
    pub backoff_max: Option<Duration>,
    /// Agent bead carrying the `idle:N` / `backoff-until:TS` labels.
    pub agent_bead: Option<String>,
    pub quiet: bool,
}

impl Default for AwaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            backoff_base: None,
            backoff_mult: 2.0,
            backoff_max: None,
            agent_bead: None,
            quiet: false,
        }
    }
}

/// Why the wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitReason {
    Signal,
    Timeout,
}

impl AwaitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AwaitReason::Signal => "signal",
            AwaitReason::Timeout => "timeout",
        }
    }
}

/// Result of one await cycle.
#[derive(Debug, Clone)]
pub struct AwaitOutcome {
    pub reason: AwaitReason,
    /// The feed line that woke us, on signal.
    pub signal: Option<String>,
    /// The wait actually configured for this cycle.
    pub effective_timeout: Duration,
}

/// Wait for activity-feed traffic or an (idle-backed-off) timeout.
pub async fn await_signal<T: Tracker>(
    tracker: &T,
    town: &TownCtx,
    opts: &AwaitOptions,
) -> Result<AwaitOutcome, EngineError> {
    let agent = match &opts.agent_bead {
        Some(id) => Some(tracker.show(id, true).await?),
        None => None,
    };

    let idle: u32 = agent
        .as_ref()
        .and_then(|b| b.label_value(IDLE_LABEL))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let full_timeout = match opts.backoff_base {
        Some(base) => RetryPolicy {
            base,
            mult: opts.backoff_mult,
            max: opts.backoff_max.unwrap_or(base.saturating_mul(64)),
            jitter_frac: 0.0,
            attempts: 1,
        }
        .backoff_timeout(idle),
        None => opts.timeout,
    };

    // Resume semantics: a persisted future wake time bounds the wait.
    let now = gt_core::time_fmt::unix_now();
    let persisted_until: Option<u64> = agent
        .as_ref()
        .and_then(|b| b.label_value(BACKOFF_LABEL))
        .and_then(|v| v.parse().ok());

    let effective = match persisted_until {
        Some(until) if until > now && until - now <= full_timeout.as_secs() => {
            Duration::from_secs(until - now)
        }
        _ => {
            if let (Some(bead), Some(_)) = (&agent, &opts.agent_bead) {
                persist_backoff_until(tracker, bead, now + full_timeout.as_secs()).await;
            }
            full_timeout
        }
    };

    if !opts.quiet {
        tracing::info!(
            idle,
            effective_secs = effective.as_secs(),
            "awaiting activity signal"
        );
    }

    // Tail the feed from its current end.
    let mut tail = EventTail::open(town.paths())?;
    let deadline = tokio::time::Instant::now() + effective;
    let signal = loop {
        if let Some(line) = tail.next_line()? {
            break Some(line);
        }
        if tokio::time::Instant::now() >= deadline {
            break None;
        }
        tokio::time::sleep(FEED_POLL).await;
    };

    let outcome = match signal {
        Some(line) => {
            if let Some(bead) = &agent {
                // Clear the persisted wake time; the caller resets idle.
                clear_labels(tracker, bead, &[BACKOFF_LABEL]).await;
                heartbeat(tracker, &bead.id).await;
            }
            AwaitOutcome {
                reason: AwaitReason::Signal,
                signal: Some(line),
                effective_timeout: effective,
            }
        }
        None => {
            if let Some(bead) = &agent {
                bump_idle(tracker, bead, idle).await;
                heartbeat(tracker, &bead.id).await;
            }
            AwaitOutcome {
                reason: AwaitReason::Timeout,
                signal: None,
                effective_timeout: effective,
            }
        }
    };
    Ok(outcome)
}

/// Reset an agent's idle counter (callers do this after handling a
/// signal).
pub async fn reset_idle<T: Tracker>(tracker: &T, agent_bead: &str) -> Result<(), EngineError> {
    let bead = tracker.show(agent_bead, true).await?;
    let mut patch = UpdatePatch::default().add_label(format!("{}:0", IDLE_LABEL));
    for label in existing_labels(&bead, IDLE_LABEL) {
        patch = patch.remove_label(label);
    }
    tracker.update(agent_bead, &patch).await?;
    Ok(())
}

fn existing_labels(bead: &Bead, key: &str) -> Vec<String> {
    let prefix = format!("{}:", key);
    bead.labels
        .iter()
        .filter(|l| l.starts_with(&prefix))
        .cloned()
        .collect()
}

/// Label writes on the agent bead are observational: warn and continue.
async fn persist_backoff_until<T: Tracker>(tracker: &T, bead: &Bead, until: u64) {
    let mut patch = UpdatePatch::default().add_label(format!("{}:{}", BACKOFF_LABEL, until));
    for label in existing_labels(bead, BACKOFF_LABEL) {
        patch = patch.remove_label(label);
    }
    if let Err(err) = tracker.update(&bead.id, &patch).await {
        tracing::warn!(agent = %bead.id, error = %err, "failed to persist backoff-until");
    }
}

async fn clear_labels<T: Tracker>(tracker: &T, bead: &Bead, keys: &[&str]) {
    let mut patch = UpdatePatch::default();
    for key in keys {
        for label in existing_labels(bead, key) {
            patch = patch.remove_label(label);
        }
    }
    if patch.is_empty() {
        return;
    }
    if let Err(err) = tracker.update(&bead.id, &patch).await {
        tracing::warn!(agent = %bead.id, error = %err, "failed to clear patrol labels");
    }
}

async fn bump_idle<T: Tracker>(tracker: &T, bead: &Bead, idle: u32) {
    let mut patch = UpdatePatch::default()
        .add_label(format!("{}:{}", IDLE_LABEL, idle.saturating_add(1)));
    for label in existing_labels(bead, IDLE_LABEL) {
        patch = patch.remove_label(label);
    }
    for label in existing_labels(bead, BACKOFF_LABEL) {
        patch = patch.remove_label(label);
    }
    if let Err(err) = tracker.update(&bead.id, &patch).await {
        tracing::warn!(agent = %bead.id, error = %err, "failed to bump idle counter");
    }
}

async fn heartbeat<T: Tracker>(tracker: &T, agent_bead: &str) {
    if let Err(err) = tracker.heartbeat(agent_bead).await {
        tracing::warn!(agent = agent_bead, error = %err, "heartbeat failed");
    }
}

/// Patrol bootstrap for a self-driving agent.
///
/// When the agent has no active patrol wisp: close stale patrol
/// molecules (open, but with nothing active underneath), cook the
/// role's patrol formula, wisp it, bond it to the agent bead, and hook
/// it to the agent. Subsequent cycles observe `hooked` and resume.
/// Returns the new wisp root, or `None` when a patrol is already
/// active.
pub async fn ensure_patrol<T: Tracker>(
    tracker: &T,
    town: &TownCtx,
    agent: &gt_core::address::AgentAddress,
) -> Result<Option<String>, EngineError> {
    use gt_core::bead::{BeadStatus, BeadType, DepDirection, DepType};

    let agent_bead_id = agent.bead_id(town.prefixes())?;
    let agent_bead = tracker.show(&agent_bead_id, true).await?;

    // An active patrol on the hook means nothing to do.
    if let Some(hooked) = &agent_bead.hook_bead {
        if let Ok(wisp) = tracker.show(hooked, true).await {
            if wisp.status.is_active() && wisp.status != BeadStatus::Open {
                return Ok(None);
            }
        }
    }

    // Reap stale patrol molecules: open epics assigned to this agent
    // with no open/hooked/in-progress children.
    let filter = gt_adapters::ListFilter::default()
        .status("open")
        .assignee(agent.to_string())
        .bead_type(BeadType::Epic);
    for stale in tracker.list(&filter).await? {
        let children = tracker
            .dep_list(&stale.id, DepDirection::Down, Some(DepType::ParentChild))
            .await?;
        let mut any_active = false;
        for child in &children {
            if let Ok(bead) = tracker.show(&child.id, true).await {
                if bead.status.is_active() {
                    any_active = true;
                    break;
                }
            }
        }
        if !any_active {
            tracing::info!(molecule = %stale.id, "closing stale patrol molecule");
            if let Err(err) = tracker.close(&stale.id, true).await {
                tracing::warn!(molecule = %stale.id, error = %err, "stale patrol close failed");
            }
        }
    }

    let formula = format!("mol-{}-patrol", agent.role().as_str());
    tracker.formula_cook(&formula, &agent_bead_id).await?;
    let wisp = tracker
        .molecule_wisp(&formula, &[], &agent_bead_id)
        .await?;
    tracker.molecule_bond(&wisp, &agent_bead_id).await?;
    tracker
        .update(
            &wisp,
            &UpdatePatch::default()
                .status(BeadStatus::Hooked)
                .assignee(agent.to_string()),
        )
        .await?;
    tracker.set_hook_slot(&agent_bead_id, Some(&wisp)).await?;
    Ok(Some(wisp))
}

#[cfg(test)]
#[path = "patrol_tests.rs"]
mod tests;
