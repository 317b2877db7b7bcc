// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The attach-work algorithm.

use super::{AttachOptions, HookEngine, HookOutcome};
use crate::activity::append_event;
use crate::error::EngineError;
use crate::identity::IdentityResolver;
use gt_adapters::{Sessions, Tracker, UpdatePatch};
use gt_core::address::AgentAddress;
use gt_core::bead::{Bead, BeadStatus};
use gt_core::event::ActivityEvent;
use gt_core::fields::AttachmentFields;

/// Outcome of the stale-hook check for a bead already `hooked`.
#[derive(Debug, Clone, Copy, Default)]
struct StaleAssessment {
    /// The bead is already hooked to the attaching agent.
    same_agent: bool,
    /// The prior assignee's session is confirmed dead.
    dead_prior: bool,
}

impl<T: Tracker, S: Sessions> HookEngine<T, S> {
    /// Establish the hook (agent, bead).
    ///
    /// Strictly ordered: verify → deferral guard → stale-hook check →
    /// burn-if-forced → formula → atomic hook update → attachment
    /// fields → agent slot → activity event. Secondary writes (slot,
    /// event) warn and continue; everything earlier propagates.
    pub async fn attach_work(
        &self,
        agent: &AgentAddress,
        bead_id: &str,
        opts: &AttachOptions,
    ) -> Result<HookOutcome, EngineError> {
        // 1-2. Verify the bead exists and read its current state. The
        // existence check must succeed even when a writer is mid-flush.
        let bead = self.tracker.show(bead_id, true).await?;

        // 3. Deferral guard.
        if bead.is_deferred() {
            return Err(EngineError::Conflict(format!(
                "{} is deferred; refusing to hook",
                bead_id
            )));
        }

        // 4. Stale-hook assessment. A hook on a confirmed-dead agent
        // lifts the force requirement; uncertain liveness never does.
        let stale = self.assess_stale_hook(agent, &bead, opts.force).await?;
        let burn_allowed = opts.force || stale.dead_prior;

        // 5. Existing-molecule handling. A same-agent re-attach without
        // a new formula preserves the molecule; everything else needs
        // force (explicit or stale-dead).
        let wisps = bead.attached_wisps();
        let mut burned = Vec::new();
        let mut preserved_molecule = None;
        if !wisps.is_empty() {
            if burn_allowed {
                if !opts.dry_run {
                    // Detach failure is fatal; close failures are not;
                    // orphans get reaped later.
                    self.detach_molecule_with_audit(
                        bead_id,
                        "force re-sling",
                        &opts.dispatcher,
                    )
                    .await?;
                    for wisp in &wisps {
                        self.force_close(wisp).await;
                    }
                    burned = wisps;
                }
            } else if stale.same_agent && opts.formula.is_none() {
                preserved_molecule =
                    gt_core::fields::AttachmentFields::parse(&bead.description)
                        .attached_molecule;
            } else {
                return Err(EngineError::Conflict(format!(
                    "{} already has molecule {} (re-sling with --force to burn it)",
                    bead_id,
                    wisps.join(", ")
                )));
            }
        }

        if opts.dry_run {
            return Ok(HookOutcome {
                bead: bead_id.to_string(),
                agent: agent.clone(),
                wisp_root: None,
                burned: Vec::new(),
                dry_run: true,
            });
        }

        // 6. Formula instantiation.
        let wisp_root = match &opts.formula {
            Some(formula) => Some(self.instantiate_formula(formula, &bead, opts).await?),
            None => None,
        };

        // 7. Atomic hook update with retry and post-write verification.
        let assignee = agent.to_string();
        self.atomic_hook_update(bead_id, &assignee).await?;

        // 8. Attachment fields, in one read-modify-write.
        let molecule = wisp_root.clone().or(preserved_molecule);
        self.write_attachment_fields(bead_id, molecule.as_deref(), opts)
            .await?;

        // 9. Agent bead slot. Non-fatal: cross-store slots can lag.
        match agent.bead_id(self.town.prefixes()) {
            Ok(agent_bead) => {
                if let Err(err) = self
                    .tracker
                    .set_hook_slot(&agent_bead, Some(bead_id))
                    .await
                {
                    tracing::warn!(
                        agent = %agent,
                        bead = bead_id,
                        error = %err,
                        "failed to set agent hook slot"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(agent = %agent, error = %err, "no bead id for agent");
            }
        }

        // 10. Activity event.
        let event = ActivityEvent::new(
            ActivityEvent::SLING,
            &opts.dispatcher,
            serde_json::json!({ "bead": bead_id, "agent": assignee }),
        );
        if let Err(err) = append_event(self.town.paths(), &event) {
            tracing::warn!(error = %err, "failed to append sling event");
        }

        Ok(HookOutcome {
            bead: bead_id.to_string(),
            agent: agent.clone(),
            wisp_root,
            burned,
            dry_run: false,
        })
    }

    /// Assess an existing hook against the stale-hook rule.
    async fn assess_stale_hook(
        &self,
        agent: &AgentAddress,
        bead: &Bead,
        force: bool,
    ) -> Result<StaleAssessment, EngineError> {
        if bead.status != BeadStatus::Hooked {
            return Ok(StaleAssessment::default());
        }
        let Some(assignee) = bead.assignee.as_deref() else {
            return Ok(StaleAssessment::default());
        };
        if assignee == agent.to_string() {
            // Re-attach to the same agent is idempotent.
            return Ok(StaleAssessment {
                same_agent: true,
                dead_prior: false,
            });
        }
        if force {
            return Ok(StaleAssessment::default());
        }

        let resolver = IdentityResolver::new(&self.town, &self.sessions);
        match resolver.is_agent_dead(assignee).await {
            Some(true) => {
                tracing::info!(
                    bead = %bead.id,
                    stale_assignee = assignee,
                    "prior agent confirmed dead; replacing stale hook"
                );
                Ok(StaleAssessment {
                    same_agent: false,
                    dead_prior: true,
                })
            }
            Some(false) => Err(EngineError::Conflict(format!(
                "{} is hooked to live agent {} (pass --force to steal it)",
                bead.id, assignee
            ))),
            None => Err(EngineError::Conflict(format!(
                "{} is hooked to {} whose liveness is unknown; pass --force to override",
                bead.id, assignee
            ))),
        }
    }

    /// Cook (unless skipped), wisp, and bond a formula onto the bead.
    /// Returns the wisp root id.
    async fn instantiate_formula(
        &self,
        formula: &str,
        bead: &Bead,
        opts: &AttachOptions,
    ) -> Result<String, EngineError> {
        if !opts.skip_cook {
            self.tracker.formula_cook(formula, &bead.id).await?;
        }

        let mut vars: Vec<(String, String)> = vec![
            ("feature".to_string(), bead.title.clone()),
            ("issue".to_string(), bead.id.clone()),
        ];
        // Rig pipeline commands are auto-injected when configured.
        if let Some(rig) = self.town.rig_for_bead(&bead.id) {
            if let Ok(config) = self.town.rig_config(rig) {
                vars.extend(config.commands.as_vars());
            }
        }
        vars.extend(opts.vars.iter().cloned());

        let wisp_root = self
            .tracker
            .molecule_wisp(formula, &vars, &bead.id)
            .await?;
        self.tracker.molecule_bond(&wisp_root, &bead.id).await?;
        Ok(wisp_root)
    }

    /// Write the attachment block in a single read-modify-write. Never
    /// issue sequential independent updates for these fields: merging
    /// concurrent attachment updates is a known race.
    async fn write_attachment_fields(
        &self,
        bead_id: &str,
        molecule: Option<&str>,
        opts: &AttachOptions,
    ) -> Result<(), EngineError> {
        let current = self.tracker.show(bead_id, false).await?;
        let fields = AttachmentFields {
            dispatched_by: Some(opts.dispatcher.clone()),
            attached_molecule: molecule.map(str::to_string),
            attached_at: Some(gt_core::time_fmt::format_utc_now()),
            attached_args: opts.args.clone(),
            no_merge: opts.no_merge,
            mode: opts.mode,
            convoy_id: opts.convoy_id.clone(),
            merge_strategy: opts.merge_strategy,
            convoy_owned: false,
        };
        let description = fields.apply_to(&current.description);
        self.tracker
            .update(
                bead_id,
                &UpdatePatch::default().description(description),
            )
            .await?;
        Ok(())
    }
}
