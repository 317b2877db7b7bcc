// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracker implementation shelling out to the `bd` binary.

use super::routes::{route_for, Route};
use super::{CreateOptions, ListFilter, Tracker, TrackerError, UpdatePatch};
use crate::subprocess::{run_with_timeout, BD_TIMEOUT};
use async_trait::async_trait;
use gt_core::bead::{Bead, DepDirection, DepType, Dependency};
use gt_core::id::{extract_issue_id, format_track_bead_id, ShortId};
use gt_core::retry::RetryPolicy;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::Command;

/// Client-level retry for transient store conditions. The hook engine
/// layers its own verify loop on top with [`RetryPolicy::HOOK_UPDATE`].
const STORE_RETRY: RetryPolicy = RetryPolicy {
    base: std::time::Duration::from_millis(200),
    mult: 2.0,
    max: std::time::Duration::from_secs(5),
    jitter_frac: 0.25,
    attempts: 5,
};

/// Tracker adapter invoking the external `bd` binary.
///
/// The working directory of every invocation is chosen by prefix
/// routing: the bead id's prefix is looked up in the routes table and
/// the mapped path (relative to the town root) becomes the cwd.
#[derive(Clone)]
pub struct BdTracker {
    town_root: PathBuf,
    routes: Vec<Route>,
    actor: Option<String>,
}

impl BdTracker {
    pub fn new(town_root: impl Into<PathBuf>, routes: Vec<Route>) -> Self {
        Self {
            town_root: town_root.into(),
            routes,
            actor: None,
        }
    }

    /// Attribute mutations to an agent (`BD_ACTOR`).
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Store directory for a bead id; the town root when no route
    /// matches.
    fn store_dir(&self, bead_id: &str) -> PathBuf {
        match route_for(&self.routes, bead_id) {
            Some(route) if route.path != "." => self.town_root.join(&route.path),
            _ => self.town_root.clone(),
        }
    }

    /// Whether `a` and `b` live in different stores. Cross-store
    /// dependency references get the `external:` envelope.
    fn crosses_stores(&self, a: &str, b: &str) -> bool {
        self.store_dir(a) != self.store_dir(b)
    }

    async fn run_once(&self, cwd: &PathBuf, args: &[String]) -> Result<String, TrackerError> {
        let mut cmd = Command::new("bd");
        cmd.args(args).current_dir(cwd);
        if let Some(actor) = &self.actor {
            cmd.env("BD_ACTOR", actor);
        }
        let output = run_with_timeout(cmd, BD_TIMEOUT, "bd")
            .await
            .map_err(TrackerError::CommandFailed)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(TrackerError::classify(if stderr.is_empty() {
                format!("bd exited with {}", output.status)
            } else {
                stderr
            }))
        }
    }

    /// Run with transient-retry. Config errors and not-found
    /// short-circuit immediately.
    async fn run(&self, cwd: &PathBuf, args: &[String]) -> Result<String, TrackerError> {
        let mut attempt = 1;
        loop {
            match self.run_once(cwd, args).await {
                Ok(out) => return Ok(out),
                Err(err) if err.is_retryable() && attempt < STORE_RETRY.attempts => {
                    let delay = STORE_RETRY.jittered_delay(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying bd after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn parse_bead(output: &str) -> Result<Bead, TrackerError> {
        let mut bead: Bead = serde_json::from_str(output.trim())
            .map_err(|e| TrackerError::Parse(format!("{}: {:?}", e, output.short(200))))?;
        unwrap_external_refs(&mut bead);
        Ok(bead)
    }

    fn parse_beads(output: &str) -> Result<Vec<Bead>, TrackerError> {
        let mut beads: Vec<Bead> = serde_json::from_str(output.trim())
            .map_err(|e| TrackerError::Parse(format!("{}: {:?}", e, output.short(200))))?;
        for bead in &mut beads {
            unwrap_external_refs(bead);
        }
        Ok(beads)
    }
}

/// Strip `external:` envelopes from everything the client reads.
fn unwrap_external_refs(bead: &mut Bead) {
    for dep in &mut bead.dependencies {
        dep.id = extract_issue_id(&dep.id).to_string();
    }
    if let Some(parent) = &bead.parent {
        bead.parent = Some(extract_issue_id(parent).to_string());
    }
    if let Some(hook) = &bead.hook_bead {
        bead.hook_bead = Some(extract_issue_id(hook).to_string());
    }
}

#[async_trait]
impl Tracker for BdTracker {
    async fn show(&self, id: &str, allow_stale: bool) -> Result<Bead, TrackerError> {
        let mut args = vec!["show".to_string(), id.to_string(), "--json".to_string()];
        if allow_stale {
            args.push("--allow-stale".to_string());
        }
        let out = self.run(&self.store_dir(id), &args).await?;
        Self::parse_bead(&out)
    }

    async fn show_many(&self, ids: &[String]) -> Result<HashMap<String, Bead>, TrackerError> {
        let mut map = HashMap::new();
        for id in ids {
            match self.show(id, true).await {
                Ok(bead) => {
                    map.insert(id.clone(), bead);
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(map)
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<Bead>, TrackerError> {
        let mut args = vec!["list".to_string(), "--json".to_string()];
        if let Some(status) = &filter.status {
            args.push(format!("--status={}", status));
        }
        if let Some(assignee) = &filter.assignee {
            args.push(format!("--assignee={}", assignee));
        }
        if let Some(parent) = &filter.parent {
            args.push(format!("--parent={}", parent));
        }
        if let Some(bead_type) = &filter.bead_type {
            args.push(format!("--type={}", bead_type));
        }
        if let Some(priority) = filter.priority {
            args.push(format!("--priority={}", priority));
        }
        // Listing scopes to a store only when the parent routes there.
        let cwd = match &filter.parent {
            Some(parent) => self.store_dir(parent),
            None => self.town_root.clone(),
        };
        let out = self.run(&cwd, &args).await?;
        Self::parse_beads(&out)
    }

    async fn update(&self, id: &str, patch: &UpdatePatch) -> Result<(), TrackerError> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut args = vec!["update".to_string(), id.to_string()];
        if let Some(status) = patch.status {
            args.push(format!("--status={}", status));
        }
        if let Some(assignee) = &patch.assignee {
            args.push(format!("--assignee={}", assignee));
        }
        if let Some(description) = &patch.description {
            args.push(format!("--description={}", description));
        }
        for label in &patch.labels_add {
            args.push(format!("--add-label={}", label));
        }
        for label in &patch.labels_remove {
            args.push(format!("--remove-label={}", label));
        }
        if let Some(labels) = &patch.labels_set {
            args.push(format!("--set-labels={}", labels.join(",")));
        }
        self.run(&self.store_dir(id), &args).await.map(|_| ())
    }

    async fn create(&self, opts: &CreateOptions) -> Result<Bead, TrackerError> {
        let mut args = vec![
            "create".to_string(),
            "--json".to_string(),
            format!("--title={}", opts.title),
            format!("--type={}", opts.bead_type),
        ];
        if let Some(id) = &opts.id {
            args.push(format!("--id={}", id));
        }
        if !opts.description.is_empty() {
            args.push(format!("--description={}", opts.description));
        }
        for label in &opts.labels {
            args.push(format!("--label={}", label));
        }
        if let Some(priority) = opts.priority {
            args.push(format!("--priority={}", priority));
        }
        if let Some(assignee) = &opts.assignee {
            args.push(format!("--assignee={}", assignee));
        }
        if let Some(parent) = &opts.parent {
            args.push(format!("--parent={}", parent));
        }
        if opts.ephemeral {
            args.push("--ephemeral".to_string());
        }
        let cwd = match opts.id.as_deref().or(opts.parent.as_deref()) {
            Some(route) => self.store_dir(route),
            None => self.town_root.clone(),
        };
        let out = self.run(&cwd, &args).await?;
        Self::parse_bead(&out)
    }

    async fn close(&self, id: &str, force: bool) -> Result<(), TrackerError> {
        let mut args = vec!["close".to_string(), id.to_string()];
        if force {
            args.push("--force".to_string());
        }
        self.run(&self.store_dir(id), &args).await.map(|_| ())
    }

    async fn dep_add(
        &self,
        from: &str,
        to: &str,
        dep_type: DepType,
    ) -> Result<(), TrackerError> {
        // Cross-store targets are wrapped; same-store stay raw.
        let to_ref = if self.crosses_stores(from, to) {
            format_track_bead_id(to)
        } else {
            to.to_string()
        };
        let args = vec![
            "dep".to_string(),
            "add".to_string(),
            from.to_string(),
            to_ref,
            format!("--type={}", dep_type.as_str()),
        ];
        self.run(&self.store_dir(from), &args).await.map(|_| ())
    }

    async fn dep_list(
        &self,
        id: &str,
        direction: DepDirection,
        dep_type: Option<DepType>,
    ) -> Result<Vec<Dependency>, TrackerError> {
        let mut args = vec![
            "dep".to_string(),
            "list".to_string(),
            id.to_string(),
            format!("--direction={}", direction.as_str()),
            "--json".to_string(),
        ];
        if let Some(dep_type) = dep_type {
            args.push(format!("--type={}", dep_type.as_str()));
        }
        let out = self.run(&self.store_dir(id), &args).await?;
        let mut deps: Vec<Dependency> = serde_json::from_str(out.trim())
            .map_err(|e| TrackerError::Parse(format!("{}: {:?}", e, out.short(200))))?;
        for dep in &mut deps {
            dep.id = extract_issue_id(&dep.id).to_string();
        }
        Ok(deps)
    }

    async fn formula_cook(&self, formula: &str, route: &str) -> Result<(), TrackerError> {
        let args = vec!["cook".to_string(), formula.to_string()];
        self.run(&self.store_dir(route), &args).await.map(|_| ())
    }

    async fn molecule_wisp(
        &self,
        formula: &str,
        vars: &[(String, String)],
        route: &str,
    ) -> Result<String, TrackerError> {
        let mut args = vec![
            "mol".to_string(),
            "wisp".to_string(),
            formula.to_string(),
        ];
        for (key, value) in vars {
            args.push(format!("--var={}={}", key, value));
        }
        args.push("--json".to_string());
        let out = self.run(&self.store_dir(route), &args).await?;
        let value: serde_json::Value = serde_json::from_str(out.trim())
            .map_err(|e| TrackerError::Parse(format!("{}: {:?}", e, out.short(200))))?;
        value
            .get("new_epic_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| TrackerError::Parse("mol wisp output missing new_epic_id".to_string()))
    }

    async fn molecule_bond(
        &self,
        wisp_root: &str,
        target: &str,
    ) -> Result<String, TrackerError> {
        let args = vec![
            "mol".to_string(),
            "bond".to_string(),
            wisp_root.to_string(),
            target.to_string(),
            "--json".to_string(),
        ];
        let out = self.run(&self.store_dir(target), &args).await?;
        let value: serde_json::Value = serde_json::from_str(out.trim())
            .map_err(|e| TrackerError::Parse(format!("{}: {:?}", e, out.short(200))))?;
        Ok(value
            .get("root_id")
            .and_then(|v| v.as_str())
            .unwrap_or(wisp_root)
            .to_string())
    }

    async fn set_hook_slot(
        &self,
        agent_bead: &str,
        work_bead: Option<&str>,
    ) -> Result<(), TrackerError> {
        let args = match work_bead {
            Some(work) => {
                // The slot may point across stores (a dog hooked to rig
                // work); wrap so the reference stays routable.
                let work_ref = if self.crosses_stores(agent_bead, work) {
                    format_track_bead_id(work)
                } else {
                    work.to_string()
                };
                vec![
                    "slot".to_string(),
                    "set".to_string(),
                    agent_bead.to_string(),
                    "hook_bead".to_string(),
                    work_ref,
                ]
            }
            None => vec![
                "slot".to_string(),
                "clear".to_string(),
                agent_bead.to_string(),
                "hook_bead".to_string(),
            ],
        };
        self.run(&self.store_dir(agent_bead), &args).await.map(|_| ())
    }

    async fn heartbeat(&self, agent_bead: &str) -> Result<(), TrackerError> {
        let args = vec![
            "agent".to_string(),
            "heartbeat".to_string(),
            agent_bead.to_string(),
        ];
        self.run(&self.store_dir(agent_bead), &args).await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "bd_tests.rs"]
mod tests;
