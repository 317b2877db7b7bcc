// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sling`: the top-level work dispatcher.
//!
//! Accepts a target (bead id, rig name, agent address, or formula with
//! `--on <bead>`) and drives identity resolution, demand-spawn, the
//! hook engine, and the nudge pipeline in order.

use crate::activity::append_event;
use crate::context::TownCtx;
use crate::error::EngineError;
use crate::hook::{AttachOptions, HookEngine, HookOutcome};
use crate::identity::IdentityResolver;
use crate::nudge::{NudgeMode, NudgePipeline, NudgeRequest};
use crate::spawn::{SpawnOptions, SpawnedInfo, Spawner};
use gt_adapters::{Git, RuntimeConfig, Sessions, Tracker};
use gt_core::address::AgentAddress;
use gt_core::event::ActivityEvent;
use gt_core::fields::{MergeStrategy, WorkMode};
use gt_core::role::{Role, RoleContext};

/// A dispatch request, as parsed from the CLI.
#[derive(Debug, Clone, Default)]
pub struct SlingRequest {
    /// Bead id, rig name, agent address, or formula name (with `on`).
    pub target: String,
    /// Work bead when `target` is a formula.
    pub on: Option<String>,
    pub vars: Vec<(String, String)>,
    pub args: Option<String>,
    pub force: bool,
    pub dry_run: bool,
    pub no_convoy: bool,
    pub no_merge: bool,
    pub mode: Option<WorkMode>,
    pub merge_strategy: Option<MergeStrategy>,
    /// Explicit agent target overriding demand-spawn.
    pub agent: Option<String>,
    /// Account handle for spawned runtimes.
    pub account: Option<String>,
    /// Runtime preset for spawned polecats.
    pub runtime: RuntimeConfig,
    /// The caller (recorded as dispatcher, used for self-dispatch).
    pub caller: RoleContext,
}

/// What a dispatch did (or, dry-run, would do).
#[derive(Debug, Clone)]
pub struct SlingOutcome {
    pub agent: AgentAddress,
    pub bead: Option<String>,
    pub spawned: Option<SpawnedInfo>,
    pub hook: Option<HookOutcome>,
    pub nudged: bool,
    pub dry_run: bool,
    /// Human-readable plan lines for dry-run output.
    pub plan: Vec<String>,
}

/// The dispatcher composing resolver, spawner, hook engine, and nudges.
#[derive(Clone)]
pub struct Dispatcher<T: Tracker, S: Sessions, G: Git> {
    tracker: T,
    sessions: S,
    town: TownCtx,
    hook: HookEngine<T, S>,
    nudge: NudgePipeline<T, S>,
    spawner: Spawner<T, S, G>,
}

/// What the target string names.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Bead(String),
    Rig(String),
    Agent(String),
    Formula(String),
}

impl<T: Tracker, S: Sessions, G: Git> Dispatcher<T, S, G> {
    pub fn new(tracker: T, sessions: S, git: G, town: TownCtx) -> Self {
        let hook = HookEngine::new(tracker.clone(), sessions.clone(), town.clone());
        let nudge = NudgePipeline::new(tracker.clone(), sessions.clone(), town.clone());
        let spawner = Spawner::new(tracker.clone(), sessions.clone(), git, town.clone());
        Self {
            tracker,
            sessions,
            town,
            hook,
            nudge,
            spawner,
        }
    }

    /// Dispatch one request.
    pub async fn sling(&self, req: &SlingRequest) -> Result<SlingOutcome, EngineError> {
        let target = self.classify(&req.target, req.on.as_deref());
        match target {
            Target::Formula(formula) => {
                let bead = req.on.clone().ok_or_else(|| {
                    EngineError::Invalid(format!(
                        "{} is not a bead id or rig; pass --on <bead> to use it as a formula",
                        formula
                    ))
                })?;
                self.dispatch_bead(&bead, Some(&formula), req).await
            }
            Target::Bead(bead) => self.dispatch_bead(&bead, None, req).await,
            Target::Rig(rig) => self.dispatch_rig(&rig, req).await,
            Target::Agent(addr) => self.dispatch_agent(&addr, req).await,
        }
    }

    /// Recognize what the target names. A string is a bead id when the
    /// routes resolve its prefix or it matches the fallback shape; then
    /// a registered rig name; then an agent address; anything else is
    /// a formula name (useful only with `--on`).
    fn classify(&self, target: &str, on: Option<&str>) -> Target {
        if on.is_some() {
            return Target::Formula(target.to_string());
        }
        if let Some(prefix) = gt_core::id::extract_prefix(target) {
            let routed = self
                .town
                .prefixes()
                .rig_for(prefix.trim_end_matches('-'))
                .is_some()
                || prefix == "hq-";
            if routed || gt_core::id::looks_like_bead_id(target) {
                // Agent addresses never contain a routable prefix shape
                // with slashes.
                if !target.contains('/') {
                    return Target::Bead(target.to_string());
                }
            }
        }
        if self.town.has_rig(target) {
            return Target::Rig(target.to_string());
        }
        if AgentAddress::parse(target, None).is_ok() || target.matches('/').count() == 1 {
            return Target::Agent(target.to_string());
        }
        Target::Formula(target.to_string())
    }

    /// Dispatch work to an agent, spawning one on demand.
    async fn dispatch_bead(
        &self,
        bead: &str,
        formula: Option<&str>,
        req: &SlingRequest,
    ) -> Result<SlingOutcome, EngineError> {
        let mut plan = Vec::new();

        // Choose the agent: explicit --agent, self-dispatch for worker
        // callers, else demand-spawn a polecat in the bead's rig.
        let resolver = IdentityResolver::new(&self.town, &self.sessions);
        let (agent, spawn_rig) = if let Some(agent) = &req.agent {
            (
                resolver.resolve(agent, req.caller.rig()).await?,
                None,
            )
        } else if let Some(self_addr) = self.self_dispatch_target(&req.caller) {
            (self_addr, None)
        } else {
            let rig = self
                .town
                .rig_for_bead(bead)
                .ok_or_else(|| {
                    EngineError::NotFound(format!("no rig routes the prefix of {}", bead))
                })?
                .to_string();
            plan.push(format!("spawn polecat in {} for {}", rig, bead));
            // Placeholder until the spawner allocates the real name.
            (
                AgentAddress::Polecat {
                    rig: rig.clone(),
                    name: String::new(),
                },
                Some(rig),
            )
        };

        let convoy_id = if req.no_convoy {
            None
        } else {
            self.auto_convoy(bead).await
        };

        let attach_opts = AttachOptions {
            formula: formula.map(str::to_string),
            vars: req.vars.clone(),
            args: req.args.clone(),
            no_merge: req.no_merge,
            mode: req.mode,
            convoy_id,
            merge_strategy: req.merge_strategy,
            force: req.force,
            dry_run: req.dry_run,
            dispatcher: req.caller.actor(),
            skip_cook: false,
        };

        if req.dry_run {
            let agent_desc = match &spawn_rig {
                Some(rig) => format!("a fresh polecat in {}", rig),
                None => agent.to_string(),
            };
            plan.push(format!("hook {} to {}", bead, agent_desc));
            if let Some(formula) = formula {
                plan.push(format!("instantiate formula {} onto {}", formula, bead));
            }
            plan.push(format!("nudge {}", agent_desc));
            // Validate the bead exists and conflicts are surfaced even
            // in a dry run.
            let probe_agent = match &spawn_rig {
                Some(rig) => AgentAddress::Polecat {
                    rig: rig.clone(),
                    name: "probe".to_string(),
                },
                None => agent.clone(),
            };
            let hook = self.hook.attach_work(&probe_agent, bead, &attach_opts).await?;
            return Ok(SlingOutcome {
                agent: probe_agent,
                bead: Some(bead.to_string()),
                spawned: None,
                hook: Some(hook),
                nudged: false,
                dry_run: true,
                plan,
            });
        }

        // Spawn first when needed, so the hook lands on a real identity.
        let (agent, spawned) = match spawn_rig {
            Some(rig) => {
                let spawn_opts = SpawnOptions {
                    account: req.account.clone(),
                    runtime: req.runtime.clone(),
                    force: req.force,
                    hook_bead: Some(bead.to_string()),
                };
                let info = self.spawner.spawn_polecat(&rig, &spawn_opts).await?;
                (info.address.clone(), Some(info))
            }
            None => (agent, None),
        };

        let hook = self.hook.attach_work(&agent, bead, &attach_opts).await?;

        // Start the session only after the hook is attached, so the
        // agent sees its work on first prime.
        if let Some(info) = &spawned {
            let spawn_opts = SpawnOptions {
                account: req.account.clone(),
                runtime: req.runtime.clone(),
                force: req.force,
                hook_bead: Some(bead.to_string()),
            };
            self.spawner.start_session(info, &spawn_opts).await?;
        }

        // Nudge the agent to discover the hook. Freshly-started
        // sessions see their work on prime, so only pre-existing
        // agents need the wakeup.
        let mut nudged = false;
        let is_self = self.self_dispatch_target(&req.caller).as_ref() == Some(&agent);
        if spawned.is_none() && !is_self {
            let nudge_req = NudgeRequest {
                target: agent.to_string(),
                message: format!("you have new work on your hook: {}", bead),
                sender: req.caller.actor(),
                mode: NudgeMode::Immediate,
                ..Default::default()
            };
            match self.nudge.deliver(&nudge_req).await {
                Ok(_) => nudged = true,
                Err(err) => {
                    tracing::warn!(agent = %agent, error = %err, "post-hook nudge failed");
                }
            }
        }

        Ok(SlingOutcome {
            agent,
            bead: Some(bead.to_string()),
            spawned,
            hook: Some(hook),
            nudged,
            dry_run: false,
            plan,
        })
    }

    /// `sling <rig>`: warm-spawn a polecat with no work.
    async fn dispatch_rig(
        &self,
        rig: &str,
        req: &SlingRequest,
    ) -> Result<SlingOutcome, EngineError> {
        if req.dry_run {
            return Ok(SlingOutcome {
                agent: AgentAddress::Polecat {
                    rig: rig.to_string(),
                    name: String::new(),
                },
                bead: None,
                spawned: None,
                hook: None,
                nudged: false,
                dry_run: true,
                plan: vec![format!("spawn idle polecat in {}", rig)],
            });
        }
        let spawn_opts = SpawnOptions {
            account: req.account.clone(),
            runtime: req.runtime.clone(),
            force: req.force,
            hook_bead: None,
        };
        let info = self.spawner.spawn_polecat(rig, &spawn_opts).await?;
        self.spawner.start_session(&info, &spawn_opts).await?;

        // Every dispatch records one sling line, warm spawns included.
        self.emit_sling_event(&req.caller.actor(), &info.address, None);

        Ok(SlingOutcome {
            agent: info.address.clone(),
            bead: None,
            spawned: Some(info),
            hook: None,
            nudged: false,
            dry_run: false,
            plan: Vec::new(),
        })
    }

    /// `sling <agent>`: wake an existing agent.
    async fn dispatch_agent(
        &self,
        target: &str,
        req: &SlingRequest,
    ) -> Result<SlingOutcome, EngineError> {
        let resolver = IdentityResolver::new(&self.town, &self.sessions);
        let agent = resolver.resolve(target, req.caller.rig()).await?;
        let session = agent.session_name(self.town.name());
        if !self.sessions.has_session(&session).await? {
            return Err(EngineError::NotFound(format!(
                "agent {} has no live session (sling a bead id to demand-spawn instead)",
                agent
            )));
        }
        if req.dry_run {
            return Ok(SlingOutcome {
                agent: agent.clone(),
                bead: None,
                spawned: None,
                hook: None,
                nudged: false,
                dry_run: true,
                plan: vec![format!("nudge {}", agent)],
            });
        }
        let nudge_req = NudgeRequest {
            target: agent.to_string(),
            message: "check your hook".to_string(),
            sender: req.caller.actor(),
            mode: NudgeMode::Immediate,
            ..Default::default()
        };
        self.nudge.deliver(&nudge_req).await?;

        // Every dispatch records one sling line, wakeups included.
        self.emit_sling_event(&req.caller.actor(), &agent, None);

        Ok(SlingOutcome {
            agent,
            bead: None,
            spawned: None,
            hook: None,
            nudged: true,
            dry_run: false,
            plan: Vec::new(),
        })
    }

    /// The one sling line per dispatch. Bead-target dispatches get
    /// theirs from the hook engine; the rig and agent paths emit here.
    fn emit_sling_event(&self, actor: &str, agent: &AgentAddress, bead: Option<&str>) {
        let event = ActivityEvent::new(
            ActivityEvent::SLING,
            actor,
            serde_json::json!({ "bead": bead, "agent": agent.to_string() }),
        );
        if let Err(err) = append_event(self.town.paths(), &event) {
            tracing::warn!(error = %err, "failed to append sling event");
        }
    }

    /// Worker-role callers with no explicit agent hook the bead to
    /// themselves. Coordinator roles always demand-spawn.
    fn self_dispatch_target(&self, caller: &RoleContext) -> Option<AgentAddress> {
        match caller.role() {
            Role::Polecat | Role::Crew | Role::Dog => AgentAddress::from_role_context(caller),
            _ => None,
        }
    }

    /// Auto-convoy: inherit the parent convoy when the bead has one.
    async fn auto_convoy(&self, bead_id: &str) -> Option<String> {
        let bead = self.tracker.show(bead_id, true).await.ok()?;
        let parent_id = bead.parent?;
        let parent = self.tracker.show(&parent_id, true).await.ok()?;
        (parent.bead_type == gt_core::bead::BeadType::Convoy).then_some(parent_id)
    }
}

#[cfg(test)]
#[path = "sling_tests.rs"]
mod tests;
