// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The nudge pipeline: three-mode message delivery into agent panes.
//!
//! One `deliver` dispatcher over three strategies rather than three
//! copy-pasted paths. Direct delivery prefixes the sender exactly once;
//! queued entries carry the sender structurally so the drain-side
//! injector prefixes at injection time.

use crate::activity::append_event;
use crate::context::TownCtx;
use crate::error::EngineError;
use crate::identity::IdentityResolver;
use gt_adapters::{SessionError, Sessions, Tracker};
use gt_core::address::AgentAddress;
use gt_core::event::ActivityEvent;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll budget for wait-idle delivery before falling back to the queue.
pub const WAIT_IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Inter-send delay during channel fan-out.
pub const CHANNEL_SEND_DELAY: Duration = Duration::from_millis(100);

/// `--if-fresh`: suppress when the caller's session is older than this.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(60);

/// Delivery mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NudgeMode {
    /// Send directly; interrupts in-flight agent work.
    #[default]
    Immediate,
    /// Append to the per-session queue; the agent drains at its next
    /// prompt boundary. Zero interruption.
    Queue,
    /// Poll for idle, then deliver; enqueue on timeout.
    WaitIdle,
}

/// Message priority, recorded in queue entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NudgePriority {
    #[default]
    Normal,
    Urgent,
}

/// One queued nudge, stored as a JSON file under the session's queue
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NudgeEntry {
    pub sender: String,
    pub message: String,
    pub priority: NudgePriority,
    pub enqueued_at: String,
}

/// A delivery request.
#[derive(Debug, Clone, Default)]
pub struct NudgeRequest {
    /// Agent address, short form, or `channel:<name>`.
    pub target: String,
    pub message: String,
    pub sender: String,
    pub mode: NudgeMode,
    pub priority: NudgePriority,
    /// Bypass do-not-disturb.
    pub force: bool,
    /// Suppress unless the caller's session is fresh.
    pub if_fresh: bool,
    /// The caller's own session, for the freshness gate.
    pub caller_session: Option<String>,
    /// Rig context for single-token role targets.
    pub rig_context: Option<String>,
}

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Queued,
    /// Skipped by do-not-disturb.
    DndSkipped,
    /// Suppressed by the freshness gate.
    Suppressed,
    /// Channel fan-out: per-target outcomes in order.
    Channel(Vec<(String, DeliveryOutcome)>),
}

/// The nudge pipeline.
#[derive(Clone)]
pub struct NudgePipeline<T: Tracker, S: Sessions> {
    tracker: T,
    sessions: S,
    town: TownCtx,
}

impl<T: Tracker, S: Sessions> NudgePipeline<T, S> {
    pub fn new(tracker: T, sessions: S, town: TownCtx) -> Self {
        Self {
            tracker,
            sessions,
            town,
        }
    }

    /// Deliver a nudge per its mode. The single entry point for all
    /// message delivery.
    pub async fn deliver(&self, req: &NudgeRequest) -> Result<DeliveryOutcome, EngineError> {
        if let Some(channel) = req.target.strip_prefix("channel:") {
            return self.deliver_channel(channel, req).await;
        }

        if self.suppressed_by_freshness(req).await? {
            return Ok(DeliveryOutcome::Suppressed);
        }

        let resolver = IdentityResolver::new(&self.town, &self.sessions);
        let addr = resolver
            .resolve(&req.target, req.rig_context.as_deref())
            .await?;
        self.deliver_to(&addr, req).await
    }

    async fn deliver_to(
        &self,
        addr: &AgentAddress,
        req: &NudgeRequest,
    ) -> Result<DeliveryOutcome, EngineError> {
        if !req.force && self.is_muted(addr).await {
            tracing::debug!(target = %addr, "delivery skipped: muted");
            return Ok(DeliveryOutcome::DndSkipped);
        }

        let session = addr.session_name(self.town.name());
        let outcome = match req.mode {
            NudgeMode::Immediate => {
                self.send_direct(&session, req).await?;
                DeliveryOutcome::Delivered
            }
            NudgeMode::Queue => {
                // Queueing for a dead session is an error, not a write.
                if !self.sessions.has_session(&session).await? {
                    return Err(EngineError::Session(SessionError::NotFound(session)));
                }
                self.enqueue(&session, req)?;
                DeliveryOutcome::Queued
            }
            NudgeMode::WaitIdle => {
                match self.sessions.wait_for_idle(&session, WAIT_IDLE_TIMEOUT).await {
                    Ok(true) => {
                        self.send_direct(&session, req).await?;
                        DeliveryOutcome::Delivered
                    }
                    Ok(false) => match self.enqueue(&session, req) {
                        Ok(()) => DeliveryOutcome::Queued,
                        Err(err) => {
                            tracing::warn!(
                                session,
                                error = %err,
                                "enqueue failed; falling back to immediate delivery"
                            );
                            self.send_direct(&session, req).await?;
                            DeliveryOutcome::Delivered
                        }
                    },
                    // Terminal session errors propagate; never queue
                    // for dead sessions.
                    Err(err) => return Err(err.into()),
                }
            }
        };

        let event = ActivityEvent::new(
            ActivityEvent::NUDGE,
            &req.sender,
            serde_json::json!({ "target": addr.to_string(), "queued": outcome == DeliveryOutcome::Queued }),
        );
        if let Err(err) = append_event(self.town.paths(), &event) {
            tracing::warn!(error = %err, "failed to append nudge event");
        }

        Ok(outcome)
    }

    /// Direct delivery, with sender attribution prefixed exactly once.
    async fn send_direct(&self, session: &str, req: &NudgeRequest) -> Result<(), EngineError> {
        let text = format!("[from {}] {}", req.sender, req.message);
        self.sessions.nudge_session(session, &text).await?;
        Ok(())
    }

    /// Queue delivery: sender stays structural; the drain-side injector
    /// prefixes once at injection time.
    fn enqueue(&self, session: &str, req: &NudgeRequest) -> Result<(), EngineError> {
        let dir = self.town.paths().nudge_queue_dir(session);
        std::fs::create_dir_all(&dir)?;
        let entry = NudgeEntry {
            sender: req.sender.clone(),
            message: req.message.clone(),
            priority: req.priority,
            enqueued_at: gt_core::time_fmt::format_utc_now(),
        };
        let path = dir.join(format!("{}.json", uuid::Uuid::new_v4()));
        let json = serde_json::to_string_pretty(&entry).map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Drain a session's queue in enqueue order (by filename timestamp
    /// is not guaranteed, so entries sort by enqueued_at).
    pub fn drain_queue(&self, session: &str) -> Result<Vec<NudgeEntry>, EngineError> {
        let dir = self.town.paths().nudge_queue_dir(session);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for file in std::fs::read_dir(&dir)? {
            let path = file?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<NudgeEntry>(&content) {
                Ok(entry) => {
                    entries.push(entry);
                    std::fs::remove_file(&path)?;
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "bad nudge entry");
                }
            }
        }
        entries.sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at));
        Ok(entries)
    }

    /// DND: the target's agent bead may carry `notification_level`.
    /// Resolution failures allow delivery (fail-open).
    async fn is_muted(&self, addr: &AgentAddress) -> bool {
        let Ok(agent_bead) = addr.bead_id(self.town.prefixes()) else {
            return false;
        };
        match self.tracker.show(&agent_bead, true).await {
            Ok(bead) => {
                gt_core::fields::field_value(&bead.description, "notification_level")
                    == Some("muted")
            }
            Err(_) => false,
        }
    }

    /// `--if-fresh`: suppress when the caller's session is older than
    /// the freshness window. Prevents compaction/restart hooks from
    /// spamming.
    async fn suppressed_by_freshness(&self, req: &NudgeRequest) -> Result<bool, EngineError> {
        if !req.if_fresh {
            return Ok(false);
        }
        let Some(caller) = &req.caller_session else {
            return Ok(false);
        };
        let created = self.sessions.created_unix(caller).await?;
        let age = gt_core::time_fmt::unix_now() as i64 - created;
        Ok(age > FRESHNESS_WINDOW.as_secs() as i64)
    }

    /// Expand a channel and deliver to each live member with a small
    /// inter-send delay. Per-target DND is honored.
    async fn deliver_channel(
        &self,
        channel: &str,
        req: &NudgeRequest,
    ) -> Result<DeliveryOutcome, EngineError> {
        let patterns = self.load_channel(channel)?;
        let targets = self.expand_patterns(&patterns).await?;

        let mut results = Vec::new();
        for (i, addr) in targets.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(CHANNEL_SEND_DELAY).await;
            }
            match self.deliver_to(addr, req).await {
                Ok(outcome) => results.push((addr.to_string(), outcome)),
                Err(err) => {
                    tracing::warn!(target = %addr, error = %err, "channel delivery failed");
                }
            }
        }
        Ok(DeliveryOutcome::Channel(results))
    }

    fn load_channel(&self, channel: &str) -> Result<Vec<String>, EngineError> {
        let path = self.town.paths().channels_file();
        if !path.is_file() {
            return Err(EngineError::NotFound(format!(
                "channel {} (no channels file)",
                channel
            )));
        }
        let content = std::fs::read_to_string(&path)?;
        let map: std::collections::BTreeMap<String, Vec<String>> =
            serde_json::from_str(&content).map_err(std::io::Error::other)?;
        map.get(channel)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("channel {}", channel)))
    }

    /// Enumerate live sessions and keep those matching any pattern.
    async fn expand_patterns(
        &self,
        patterns: &[String],
    ) -> Result<Vec<AgentAddress>, EngineError> {
        let rigs = self.town.rig_names();
        let mut targets = Vec::new();
        for session in self.sessions.list_sessions().await? {
            let Some(addr) =
                AgentAddress::from_session_name(&session.name, self.town.name(), &rigs)
            else {
                continue;
            };
            if patterns.iter().any(|p| pattern_matches(p, &addr)) {
                targets.push(addr);
            }
        }
        Ok(targets)
    }
}

/// Channel pattern matching: literal addresses, trailing-name wildcards
/// (`rig/polecats/*`), role wildcards (`*/witness`), and the specials
/// `mayor`/`deacon`.
fn pattern_matches(pattern: &str, addr: &AgentAddress) -> bool {
    let addr_str = addr.to_string();
    if pattern == addr_str {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix("/*") {
        return addr_str.starts_with(&format!("{}/", prefix));
    }
    if let Some(role) = pattern.strip_prefix("*/") {
        return addr.role().as_str() == role
            || addr_str.split('/').nth(1) == Some(role);
    }
    false
}

#[cfg(test)]
#[path = "nudge_tests.rs"]
mod tests;
