// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dog pool: reusable cross-rig workers.
//!
//! Dogs are idle-or-working. Dispatch assigns work BEFORE sending mail;
//! a mail-send failure rolls the assignment back so the dog is
//! observably idle again.

use crate::context::TownCtx;
use crate::error::EngineError;
use crate::spawn::names;
use gt_adapters::{CreateOptions, Git, ListFilter, Sessions, Tracker, UpdatePatch};
use gt_core::address::AgentAddress;
use gt_core::bead::{Bead, BeadType};
use std::collections::HashSet;

const STATE_IDLE: &str = "state:idle";
const STATE_WORKING: &str = "state:working";

/// One dog's pool state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DogStatus {
    pub name: String,
    pub working: bool,
    /// The work bead currently assigned, empty when idle.
    pub work: String,
}

/// Manager for the cross-rig dog pool.
#[derive(Clone)]
pub struct DogManager<T: Tracker, S: Sessions, G: Git> {
    tracker: T,
    sessions: S,
    git: G,
    town: TownCtx,
}

/// Outcome of a dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub dog: String,
    pub work_bead: String,
    pub mail_bead: String,
    pub created_dog: bool,
}

impl<T: Tracker, S: Sessions, G: Git> DogManager<T, S, G> {
    pub fn new(tracker: T, sessions: S, git: G, town: TownCtx) -> Self {
        Self {
            tracker,
            sessions,
            git,
            town,
        }
    }

    fn dog_bead_id(name: &str) -> String {
        format!("hq-dog-{}", name)
    }

    /// Create a dog with worktrees into every registered rig.
    pub async fn add(&self, name: &str) -> Result<(), EngineError> {
        let address = AgentAddress::Dog {
            name: name.to_string(),
        };
        self.tracker
            .create(&CreateOptions {
                id: Some(Self::dog_bead_id(name)),
                title: format!("dog {}", name),
                bead_type: BeadType::Agent,
                assignee: Some(address.to_string()),
                labels: vec![STATE_IDLE.to_string()],
                ..Default::default()
            })
            .await?;

        let mut created = Vec::new();
        for rig in self.town.rig_names() {
            let repo = self.town.paths().rig_repo(&rig);
            let worktree = self.town.paths().dog_worktree(name, &rig);
            let config = self.town.rig_config(&rig)?;
            let branch = format!("dog/{}", name);
            match self
                .git
                .worktree_add(&repo, &worktree, &branch, &config.default_branch)
                .await
            {
                Ok(()) => created.push((repo, worktree)),
                Err(err) => {
                    // Both-or-none: unwind the worktrees and the bead.
                    for (repo, worktree) in created {
                        let _ = self.git.worktree_remove(&repo, &worktree, true).await;
                    }
                    let _ = self.tracker.close(&Self::dog_bead_id(name), true).await;
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    /// Remove a dog. Working dogs need force.
    pub async fn remove(&self, name: &str, force: bool) -> Result<(), EngineError> {
        let bead = self.tracker.show(&Self::dog_bead_id(name), true).await?;
        if bead.has_label(STATE_WORKING) && !force {
            return Err(EngineError::Conflict(format!(
                "dog {} is working; pass --force to remove anyway",
                name
            )));
        }

        let address = AgentAddress::Dog {
            name: name.to_string(),
        };
        let _ = self
            .sessions
            .kill_session(&address.session_name(self.town.name()))
            .await;
        for rig in self.town.rig_names() {
            let repo = self.town.paths().rig_repo(&rig);
            let worktree = self.town.paths().dog_worktree(name, &rig);
            let _ = self.git.worktree_remove(&repo, &worktree, true).await;
        }
        self.tracker.close(&Self::dog_bead_id(name), true).await?;
        Ok(())
    }

    /// All dogs in the pool.
    pub async fn list(&self) -> Result<Vec<DogStatus>, EngineError> {
        let filter = ListFilter::default().bead_type(BeadType::Agent);
        let beads = self.tracker.list(&filter).await?;
        Ok(beads
            .iter()
            .filter(|b| b.status.is_active())
            .filter_map(|b| {
                let name = b.id.strip_prefix("hq-dog-")?;
                Some(DogStatus {
                    name: name.to_string(),
                    working: b.has_label(STATE_WORKING),
                    work: b.hook_bead.clone().unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Dispatch a plugin run to an idle dog.
    ///
    /// Order is mandated: assign work, then send mail; a mail failure
    /// triggers a compensating clear so the dog ends idle with no work.
    pub async fn dispatch(
        &self,
        plugin: &str,
        rig: Option<&str>,
        dog: Option<&str>,
        create: bool,
    ) -> Result<DispatchOutcome, EngineError> {
        if let Some(rig) = rig {
            self.verify_plugin(rig, plugin)?;
        }

        let (name, created_dog) = self.pick_dog(dog, create).await?;
        let dog_bead = Self::dog_bead_id(&name);

        // Work record for this dispatch.
        let work = self
            .tracker
            .create(&CreateOptions {
                title: format!("plugin: {}", plugin),
                description: match rig {
                    Some(rig) => format!("plugin: {}\nrig: {}", plugin, rig),
                    None => format!("plugin: {}", plugin),
                },
                bead_type: BeadType::Task,
                labels: vec![format!("plugin:{}", plugin)],
                ephemeral: true,
                ..Default::default()
            })
            .await?;

        // Assign before mail.
        self.assign_work(&dog_bead, &work.id).await?;

        // Mail the dog; failure rolls the assignment back.
        let address = AgentAddress::Dog { name: name.clone() };
        let mail = self
            .tracker
            .create(&CreateOptions {
                title: format!("dispatch {}", plugin),
                description: format!("work: {}", work.id),
                bead_type: BeadType::Message,
                assignee: Some(address.to_string()),
                ephemeral: true,
                ..Default::default()
            })
            .await;
        let mail = match mail {
            Ok(mail) => mail,
            Err(err) => {
                self.clear_work(&dog_bead).await;
                let _ = self.tracker.close(&work.id, true).await;
                return Err(err.into());
            }
        };

        Ok(DispatchOutcome {
            dog: name,
            work_bead: work.id,
            mail_bead: mail.id,
            created_dog,
        })
    }

    /// Mark a dog's work done and return it to the idle pool.
    pub async fn done(&self, name: &str) -> Result<(), EngineError> {
        let dog_bead = Self::dog_bead_id(name);
        let bead = self.tracker.show(&dog_bead, true).await?;
        if let Some(work) = &bead.hook_bead {
            let _ = self.tracker.close(work, false).await;
        }
        self.clear_work(&dog_bead).await;
        Ok(())
    }

    async fn pick_dog(
        &self,
        requested: Option<&str>,
        create: bool,
    ) -> Result<(String, bool), EngineError> {
        if let Some(name) = requested {
            let bead = self.tracker.show(&Self::dog_bead_id(name), true).await?;
            if bead.has_label(STATE_WORKING) {
                return Err(EngineError::Conflict(format!("dog {} is working", name)));
            }
            return Ok((name.to_string(), false));
        }

        let dogs = self.list().await?;
        if let Some(idle) = dogs.iter().find(|d| !d.working) {
            return Ok((idle.name.clone(), false));
        }
        if !create {
            return Err(EngineError::NotFound(
                "no idle dog (pass --create to add one)".to_string(),
            ));
        }
        let in_use: HashSet<String> = dogs.into_iter().map(|d| d.name).collect();
        let name = names::allocate(&in_use);
        self.add(&name).await?;
        Ok((name, true))
    }

    async fn assign_work(&self, dog_bead: &str, work: &str) -> Result<(), EngineError> {
        self.tracker.set_hook_slot(dog_bead, Some(work)).await?;
        let patch = UpdatePatch::default()
            .remove_label(STATE_IDLE)
            .add_label(STATE_WORKING);
        self.tracker.update(dog_bead, &patch).await?;
        Ok(())
    }

    /// Compensating write: idle state, empty work. Best-effort by
    /// design; the rollback itself must not mask the primary error.
    async fn clear_work(&self, dog_bead: &str) {
        if let Err(err) = self.tracker.set_hook_slot(dog_bead, None).await {
            tracing::warn!(dog = dog_bead, error = %err, "failed to clear dog work slot");
        }
        let patch = UpdatePatch::default()
            .remove_label(STATE_WORKING)
            .add_label(STATE_IDLE);
        if let Err(err) = self.tracker.update(dog_bead, &patch).await {
            tracing::warn!(dog = dog_bead, error = %err, "failed to mark dog idle");
        }
    }

    fn verify_plugin(&self, rig: &str, plugin: &str) -> Result<(), EngineError> {
        let dir = self.town.paths().rig_dir(rig).join("plugins").join(plugin);
        if dir.exists() {
            Ok(())
        } else {
            Err(EngineError::NotFound(format!(
                "plugin {} in rig {}",
                plugin, rig
            )))
        }
    }

    /// The status of one dog, for `gt dog status`.
    pub async fn status(&self, name: &str) -> Result<(DogStatus, Bead), EngineError> {
        let bead = self.tracker.show(&Self::dog_bead_id(name), true).await?;
        Ok((
            DogStatus {
                name: name.to_string(),
                working: bead.has_label(STATE_WORKING),
                work: bead.hook_bead.clone().unwrap_or_default(),
            },
            bead,
        ))
    }
}

#[cfg(test)]
#[path = "dogs_tests.rs"]
mod tests;
