// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The spawner: polecat allocation, worktrees, and session start.
//!
//! Ordering is mandated: allocate name → create worktree → verify
//! worktree → (caller attaches the hook) → start session → wait for
//! runtime readiness → mark working. The tmux start is deferred so the
//! agent sees its work on first prime.

pub mod names;

use crate::activity::append_event;
use crate::context::TownCtx;
use crate::error::EngineError;
use gt_adapters::{
    CreateOptions, Git, ListFilter, RuntimeConfig, SessionError, Sessions, Tracker,
    UpdatePatch,
};
use gt_core::address::AgentAddress;
use gt_core::bead::BeadType;
use gt_core::event::ActivityEvent;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Budget for the runtime to come up inside the new session.
pub const RUNTIME_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for a spawn.
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    /// Account handle selecting the runtime config directory.
    pub account: Option<String>,
    /// Runtime preset (command line, ready prompt, process name).
    pub runtime: RuntimeConfig,
    /// Tear down a stale workspace even with an unmerged merge-request.
    pub force: bool,
    /// Work bead to slot onto the identity at creation time.
    pub hook_bead: Option<String>,
}

/// A spawned (but not necessarily started) polecat.
#[derive(Debug, Clone)]
pub struct SpawnedInfo {
    pub rig: String,
    pub name: String,
    pub address: AgentAddress,
    pub workspace: PathBuf,
    pub session: String,
}

/// Spawns polecats into isolated worktrees.
#[derive(Clone)]
pub struct Spawner<T: Tracker, S: Sessions, G: Git> {
    tracker: T,
    sessions: S,
    git: G,
    town: TownCtx,
}

impl<T: Tracker, S: Sessions, G: Git> Spawner<T, S, G> {
    pub fn new(tracker: T, sessions: S, git: G, town: TownCtx) -> Self {
        Self {
            tracker,
            sessions,
            git,
            town,
        }
    }

    /// Allocate a polecat and prepare its workspace. The tmux session is
    /// NOT started; call [`Spawner::start_session`] after the hook is
    /// attached.
    pub async fn spawn_polecat(
        &self,
        rig: &str,
        opts: &SpawnOptions,
    ) -> Result<SpawnedInfo, EngineError> {
        if !self.town.has_rig(rig) {
            return Err(EngineError::NotFound(format!("rig {rig}")));
        }
        let config = self.town.rig_config(rig)?;

        // 1. Allocate a name unique among live polecats.
        let name = names::allocate(&self.live_polecat_names(rig).await?);
        let address = AgentAddress::Polecat {
            rig: rig.to_string(),
            name: name.clone(),
        };
        let workspace = self.town.paths().polecat_worktree(rig, &name);
        let session = address.session_name(self.town.name());

        // 2. Worktree: repair stale state or create fresh.
        let repo = self.town.paths().rig_repo(rig);
        let branch = format!("polecat/{}", name);
        if self.git.verify_worktree(&workspace).await.is_ok() {
            self.check_stale_workspace(&address, &workspace, opts.force)
                .await?;
            self.git.worktree_remove(&repo, &workspace, true).await?;
        }
        self.git
            .worktree_add(&repo, &workspace, &branch, &config.default_branch)
            .await?;

        // 3. Verify. Catches silent worktree-create failures; roll back
        // so no leftover workspace survives a failed spawn.
        if let Err(err) = self.git.verify_worktree(&workspace).await {
            let _ = self.git.worktree_remove(&repo, &workspace, true).await;
            return Err(err.into());
        }

        // 4. Identity bead. The workspace and the identity record exist
        // together or not at all.
        let agent_bead = address.bead_id(self.town.prefixes())?;
        let created = self
            .tracker
            .create(&CreateOptions {
                id: Some(agent_bead.clone()),
                title: format!("polecat {}/{}", rig, name),
                bead_type: BeadType::Agent,
                assignee: Some(address.to_string()),
                labels: vec!["state:spawning".to_string()],
                ..Default::default()
            })
            .await;
        if let Err(err) = created {
            let _ = self.git.worktree_remove(&repo, &workspace, true).await;
            return Err(err.into());
        }

        if let Some(hook_bead) = &opts.hook_bead {
            self.tracker
                .set_hook_slot(&agent_bead, Some(hook_bead))
                .await?;
        }

        Ok(SpawnedInfo {
            rig: rig.to_string(),
            name,
            address,
            workspace,
            session,
        })
    }

    /// Start the tmux session for a spawned polecat and wait for the
    /// runtime to come up. On readiness failure the session is recycled
    /// (killed) and the error surfaces.
    pub async fn start_session(
        &self,
        info: &SpawnedInfo,
        opts: &SpawnOptions,
    ) -> Result<(), EngineError> {
        let env = self.session_env(info, opts);
        self.sessions
            .new_session_with_command(&info.session, &info.workspace, &opts.runtime.command, &env)
            .await?;

        if let Err(err) = self
            .sessions
            .wait_for_runtime_ready(&info.session, &opts.runtime, RUNTIME_READY_TIMEOUT)
            .await
        {
            tracing::error!(session = %info.session, error = %err, "runtime never became ready; recycling session");
            let _ = self.sessions.kill_session(&info.session).await;
            return Err(err.into());
        }

        if let Err(err) = self
            .sessions
            .accept_bypass_permissions_warning(&info.session)
            .await
        {
            tracing::warn!(session = %info.session, error = %err, "bypass-warning check failed");
        }

        // Mark the identity as working. Observational; warn on failure.
        if let Ok(agent_bead) = info.address.bead_id(self.town.prefixes()) {
            let patch = UpdatePatch::default()
                .remove_label("state:spawning")
                .add_label("state:working");
            if let Err(err) = self.tracker.update(&agent_bead, &patch).await {
                tracing::warn!(agent = %info.address, error = %err, "failed to mark agent working");
            }
        }

        let event = ActivityEvent::new(
            ActivityEvent::SPAWN,
            info.address.to_string(),
            serde_json::json!({ "rig": info.rig, "session": info.session }),
        );
        if let Err(err) = append_event(self.town.paths(), &event) {
            tracing::warn!(error = %err, "failed to append spawn event");
        }

        Ok(())
    }

    /// Names of currently-live polecats: live tracker records unioned
    /// with live tmux sessions.
    async fn live_polecat_names(&self, rig: &str) -> Result<HashSet<String>, EngineError> {
        let mut names = HashSet::new();

        let prefix = self
            .town
            .prefixes()
            .prefix_for(rig)
            .unwrap_or("gt")
            .to_string();
        let bead_prefix = format!("{}-{}-polecat-", prefix, rig);
        let filter = ListFilter::default().bead_type(BeadType::Agent);
        for bead in self.tracker.list(&filter).await? {
            if !bead.status.is_active() {
                continue;
            }
            if let Some(name) = bead.id.strip_prefix(&bead_prefix) {
                names.insert(name.to_string());
            }
        }

        let rigs = self.town.rig_names();
        for session in self.sessions.list_sessions().await? {
            if let Some(AgentAddress::Polecat { rig: r, name }) =
                AgentAddress::from_session_name(&session.name, self.town.name(), &rigs)
            {
                if r == rig {
                    names.insert(name);
                }
            }
        }

        Ok(names)
    }

    /// A stale workspace is repairable when it has no uncommitted work
    /// and no unmerged merge-request. Anything else needs force.
    async fn check_stale_workspace(
        &self,
        address: &AgentAddress,
        workspace: &std::path::Path,
        force: bool,
    ) -> Result<(), EngineError> {
        let status = self.git.uncommitted_work(workspace).await?;
        if !status.is_clean() && !force {
            return Err(EngineError::Conflict(format!(
                "stale workspace {} has uncommitted work ({}); nuke it explicitly or pass --force",
                workspace.display(),
                status.report()
            )));
        }

        // Unmerged merge-request check via the tracker.
        let filter = ListFilter::default()
            .status("open")
            .assignee(address.to_string());
        let open = self.tracker.list(&filter).await?;
        let has_mr = open.iter().any(|b| b.has_label("merge-request"));
        if has_mr && !force {
            return Err(EngineError::Conflict(format!(
                "{} has an unmerged merge-request; pass --force to discard it",
                address
            )));
        }
        Ok(())
    }

    fn session_env(&self, info: &SpawnedInfo, opts: &SpawnOptions) -> Vec<(String, String)> {
        let mut env = vec![
            ("GT_ROLE".to_string(), "polecat".to_string()),
            ("GT_RIG".to_string(), info.rig.clone()),
            ("GT_POLECAT".to_string(), info.name.clone()),
            ("BD_ACTOR".to_string(), info.address.to_string()),
        ];
        if let Some(account) = &opts.account {
            if let Ok(home) = std::env::var("HOME") {
                env.push((
                    "CLAUDE_CONFIG_DIR".to_string(),
                    format!("{}/.local/state/gt/accounts/{}", home, account),
                ));
            }
        }
        env
    }

    /// Nuke a polecat: kill its session, remove its worktree, close its
    /// identity bead. The inverse of spawn, for warrants and resets.
    pub async fn nuke_polecat(&self, rig: &str, name: &str) -> Result<(), EngineError> {
        let address = AgentAddress::Polecat {
            rig: rig.to_string(),
            name: name.to_string(),
        };
        let session = address.session_name(self.town.name());
        if let Err(err) = self.sessions.kill_session(&session).await {
            if !matches!(err, SessionError::NotFound(_) | SessionError::NoServer) {
                return Err(err.into());
            }
        }

        let workspace = self.town.paths().polecat_worktree(rig, name);
        let repo = self.town.paths().rig_repo(rig);
        let _ = self.git.worktree_remove(&repo, &workspace, true).await;

        let agent_bead = address.bead_id(self.town.prefixes())?;
        match self.tracker.close(&agent_bead, true).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
