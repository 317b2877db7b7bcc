// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake tracker for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CreateOptions, ListFilter, Tracker, TrackerError, UpdatePatch};
use async_trait::async_trait;
use gt_core::bead::{Bead, BeadStatus, DepDirection, DepType, Dependency};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded tracker call
#[derive(Debug, Clone)]
pub enum TrackerCall {
    Show {
        id: String,
        allow_stale: bool,
    },
    List {
        filter: ListFilter,
    },
    Update {
        id: String,
        patch: UpdatePatch,
    },
    Create {
        opts: CreateOptions,
    },
    Close {
        id: String,
        force: bool,
    },
    DepAdd {
        from: String,
        to: String,
        dep_type: DepType,
    },
    DepList {
        id: String,
    },
    Cook {
        formula: String,
        route: String,
    },
    Wisp {
        formula: String,
        vars: Vec<(String, String)>,
        route: String,
    },
    Bond {
        wisp_root: String,
        target: String,
    },
    SetHookSlot {
        agent_bead: String,
        work_bead: Option<String>,
    },
    Heartbeat {
        agent_bead: String,
    },
}

struct FakeTrackerState {
    beads: HashMap<String, Bead>,
    calls: Vec<TrackerCall>,
    wisp_counter: u32,
    create_counter: u32,
    /// Next N updates fail with a transient error.
    transient_update_failures: u32,
    /// Every create of a message bead fails (dog mail seam).
    fail_message_creates: bool,
    /// set_hook_slot fails (cross-store slot scenario).
    fail_hook_slot: bool,
}

/// In-memory tracker recording every call.
#[derive(Clone)]
pub struct FakeTracker {
    inner: Arc<Mutex<FakeTrackerState>>,
}

impl Default for FakeTracker {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeTrackerState {
                beads: HashMap::new(),
                calls: Vec::new(),
                wisp_counter: 0,
                create_counter: 0,
                transient_update_failures: 0,
                fail_message_creates: false,
                fail_hook_slot: false,
            })),
        }
    }
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a bead.
    pub fn insert(&self, bead: Bead) {
        self.inner.lock().beads.insert(bead.id.clone(), bead);
    }

    /// Current state of a bead.
    pub fn get(&self, id: &str) -> Option<Bead> {
        self.inner.lock().beads.get(id).cloned()
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<TrackerCall> {
        self.inner.lock().calls.clone()
    }

    /// Recorded update patches for one bead, in order.
    pub fn updates_for(&self, id: &str) -> Vec<UpdatePatch> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                TrackerCall::Update { id: i, patch } if i == id => Some(patch.clone()),
                _ => None,
            })
            .collect()
    }

    /// Fail the next `n` updates with a transient error.
    pub fn fail_next_updates(&self, n: u32) {
        self.inner.lock().transient_update_failures = n;
    }

    /// Make every message-bead create fail (mail-send seam).
    pub fn fail_message_creates(&self) {
        self.inner.lock().fail_message_creates = true;
    }

    /// Make set_hook_slot fail.
    pub fn fail_hook_slot(&self) {
        self.inner.lock().fail_hook_slot = true;
    }

    pub fn heartbeats_for(&self, agent_bead: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, TrackerCall::Heartbeat { agent_bead: a } if a == agent_bead))
            .count()
    }
}

fn apply_patch(bead: &mut Bead, patch: &UpdatePatch) {
    if let Some(status) = patch.status {
        bead.status = status;
    }
    if let Some(assignee) = &patch.assignee {
        bead.assignee = Some(assignee.clone());
    }
    if let Some(description) = &patch.description {
        bead.description = description.clone();
    }
    for label in &patch.labels_add {
        if !bead.labels.contains(label) {
            bead.labels.push(label.clone());
        }
    }
    bead.labels.retain(|l| !patch.labels_remove.contains(l));
    if let Some(labels) = &patch.labels_set {
        bead.labels = labels.clone();
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    async fn show(&self, id: &str, allow_stale: bool) -> Result<Bead, TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::Show {
            id: id.to_string(),
            allow_stale,
        });
        inner
            .beads
            .get(id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))
    }

    async fn show_many(&self, ids: &[String]) -> Result<HashMap<String, Bead>, TrackerError> {
        let inner = self.inner.lock();
        Ok(ids
            .iter()
            .filter_map(|id| inner.beads.get(id).map(|b| (id.clone(), b.clone())))
            .collect())
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<Bead>, TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::List {
            filter: filter.clone(),
        });
        let mut beads: Vec<Bead> = inner
            .beads
            .values()
            .filter(|b| {
                filter
                    .status
                    .as_deref()
                    .map(|s| b.status.as_str() == s)
                    .unwrap_or(true)
                    && filter
                        .assignee
                        .as_deref()
                        .map(|a| b.assignee.as_deref() == Some(a))
                        .unwrap_or(true)
                    && filter
                        .parent
                        .as_deref()
                        .map(|p| b.parent.as_deref() == Some(p))
                        .unwrap_or(true)
                    && filter
                        .bead_type
                        .map(|t| b.bead_type == t)
                        .unwrap_or(true)
            })
            .cloned()
            .collect();
        beads.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(beads)
    }

    async fn update(&self, id: &str, patch: &UpdatePatch) -> Result<(), TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::Update {
            id: id.to_string(),
            patch: patch.clone(),
        });
        if inner.transient_update_failures > 0 {
            inner.transient_update_failures -= 1;
            return Err(TrackerError::Transient("database out of sync".to_string()));
        }
        let bead = inner
            .beads
            .get_mut(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        apply_patch(bead, patch);
        Ok(())
    }

    async fn create(&self, opts: &CreateOptions) -> Result<Bead, TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::Create { opts: opts.clone() });
        if inner.fail_message_creates && opts.bead_type == gt_core::bead::BeadType::Message {
            return Err(TrackerError::Transient("mail store unavailable".to_string()));
        }
        inner.create_counter += 1;
        let id = opts
            .id
            .clone()
            .unwrap_or_else(|| format!("gt-fake{:03}", inner.create_counter));
        let bead = Bead {
            id: id.clone(),
            title: opts.title.clone(),
            description: opts.description.clone(),
            bead_type: opts.bead_type,
            labels: opts.labels.clone(),
            priority: opts.priority,
            assignee: opts.assignee.clone(),
            parent: opts.parent.clone(),
            ..Default::default()
        };
        inner.beads.insert(id, bead.clone());
        Ok(bead)
    }

    async fn close(&self, id: &str, force: bool) -> Result<(), TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::Close {
            id: id.to_string(),
            force,
        });
        let bead = inner
            .beads
            .get_mut(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        bead.status = BeadStatus::Closed;
        Ok(())
    }

    async fn dep_add(
        &self,
        from: &str,
        to: &str,
        dep_type: DepType,
    ) -> Result<(), TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::DepAdd {
            from: from.to_string(),
            to: to.to_string(),
            dep_type,
        });
        let bead = inner
            .beads
            .get_mut(from)
            .ok_or_else(|| TrackerError::NotFound(from.to_string()))?;
        bead.dependencies.push(Dependency {
            id: to.to_string(),
            dep_type,
        });
        Ok(())
    }

    async fn dep_list(
        &self,
        id: &str,
        direction: DepDirection,
        dep_type: Option<DepType>,
    ) -> Result<Vec<Dependency>, TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::DepList { id: id.to_string() });
        let deps = match direction {
            DepDirection::Up => inner
                .beads
                .get(id)
                .map(|b| b.dependencies.clone())
                .unwrap_or_default(),
            DepDirection::Down => inner
                .beads
                .values()
                .filter(|b| b.dependencies.iter().any(|d| d.id == id))
                .map(|b| Dependency {
                    id: b.id.clone(),
                    dep_type: b
                        .dependencies
                        .iter()
                        .find(|d| d.id == id)
                        .map(|d| d.dep_type)
                        .unwrap_or_default(),
                })
                .collect(),
        };
        Ok(deps
            .into_iter()
            .filter(|d| dep_type.map(|t| d.dep_type == t).unwrap_or(true))
            .collect())
    }

    async fn formula_cook(&self, formula: &str, route: &str) -> Result<(), TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::Cook {
            formula: formula.to_string(),
            route: route.to_string(),
        });
        Ok(())
    }

    async fn molecule_wisp(
        &self,
        formula: &str,
        vars: &[(String, String)],
        route: &str,
    ) -> Result<String, TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::Wisp {
            formula: formula.to_string(),
            vars: vars.to_vec(),
            route: route.to_string(),
        });
        inner.wisp_counter += 1;
        let prefix = gt_core::id::extract_prefix(route)
            .unwrap_or("gt-")
            .trim_end_matches('-')
            .to_string();
        let id = format!("{}-wisp-{:03}", prefix, inner.wisp_counter);
        inner.beads.insert(
            id.clone(),
            Bead {
                id: id.clone(),
                title: formula.to_string(),
                bead_type: gt_core::bead::BeadType::Epic,
                ..Default::default()
            },
        );
        Ok(id)
    }

    async fn molecule_bond(
        &self,
        wisp_root: &str,
        target: &str,
    ) -> Result<String, TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::Bond {
            wisp_root: wisp_root.to_string(),
            target: target.to_string(),
        });
        let bead = inner
            .beads
            .get_mut(target)
            .ok_or_else(|| TrackerError::NotFound(target.to_string()))?;
        bead.dependencies.push(Dependency {
            id: wisp_root.to_string(),
            dep_type: DepType::Blocks,
        });
        Ok(wisp_root.to_string())
    }

    async fn set_hook_slot(
        &self,
        agent_bead: &str,
        work_bead: Option<&str>,
    ) -> Result<(), TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::SetHookSlot {
            agent_bead: agent_bead.to_string(),
            work_bead: work_bead.map(str::to_string),
        });
        if inner.fail_hook_slot {
            return Err(TrackerError::Transient("cross-store slot".to_string()));
        }
        let bead = inner
            .beads
            .get_mut(agent_bead)
            .ok_or_else(|| TrackerError::NotFound(agent_bead.to_string()))?;
        bead.hook_bead = work_bead.map(str::to_string);
        Ok(())
    }

    async fn heartbeat(&self, agent_bead: &str) -> Result<(), TrackerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::Heartbeat {
            agent_bead: agent_bead.to_string(),
        });
        if let Some(bead) = inner.beads.get_mut(agent_bead) {
            bead.last_activity = Some(gt_core::time_fmt::format_utc_now());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
