// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rig lifecycle: boot/shutdown/restart of the monitor pair.
//!
//! Boot is idempotent and only starts the singletons; polecats are
//! demand-spawned by the dispatcher. Shutdown stops polecats first,
//! then refinery, then witness; boot starts in the inverse order.

use crate::context::TownCtx;
use crate::error::EngineError;
use gt_adapters::{Git, RuntimeConfig, Sessions, Tracker};
use gt_core::address::AgentAddress;
use gt_core::config::RigState;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Cap on concurrent rigs in multi-rig operations.
pub const MULTI_RIG_CAP: usize = 100;

/// Options for [`RigLifecycle::shutdown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ShutdownOptions {
    /// Proceed despite live sessions that refuse to die gracefully.
    pub force: bool,
    /// Skip the uncommitted-work check. Loses work.
    pub nuclear: bool,
}

/// Observable state of one rig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RigStatus {
    pub rig: String,
    pub state: RigState,
    pub witness_up: bool,
    pub refinery_up: bool,
    pub polecats: Vec<String>,
}

/// Lifecycle operations over one or many rigs.
#[derive(Clone)]
pub struct RigLifecycle<T: Tracker, S: Sessions, G: Git> {
    tracker: T,
    sessions: S,
    git: G,
    town: TownCtx,
    /// Runtime preset used for the monitor singletons.
    runtime: RuntimeConfig,
}

impl<T: Tracker, S: Sessions, G: Git> RigLifecycle<T, S, G> {
    pub fn new(tracker: T, sessions: S, git: G, town: TownCtx, runtime: RuntimeConfig) -> Self {
        Self {
            tracker,
            sessions,
            git,
            town,
            runtime,
        }
    }

    /// Start the witness and refinery singletons. Idempotent: running
    /// sessions are left alone. Parked/docked rigs are skipped.
    pub async fn boot(&self, rig: &str) -> Result<RigStatus, EngineError> {
        if !self.town.has_rig(rig) {
            return Err(EngineError::NotFound(format!("rig {rig}")));
        }
        let config = self.town.rig_config(rig)?;
        if config.state.is_held() {
            tracing::info!(rig, state = config.state.as_str(), "rig is held; skipping boot");
            return self.status(rig).await;
        }

        // Start order: witness, then refinery.
        for addr in [
            AgentAddress::Witness {
                rig: rig.to_string(),
            },
            AgentAddress::Refinery {
                rig: rig.to_string(),
            },
        ] {
            let session = addr.session_name(self.town.name());
            if self.sessions.has_session(&session).await? {
                continue;
            }
            let cwd = self.town.paths().agent_dir(&addr);
            std::fs::create_dir_all(&cwd)?;
            let env = vec![
                ("GT_ROLE".to_string(), addr.role().as_str().to_string()),
                ("GT_RIG".to_string(), rig.to_string()),
                ("BD_ACTOR".to_string(), addr.to_string()),
            ];
            self.sessions
                .new_session_with_command(&session, &cwd, &self.runtime.command, &env)
                .await?;
            tracing::info!(rig, session, "started singleton session");
        }

        self.status(rig).await
    }

    /// Stop the rig: polecats first (after the uncommitted-work check),
    /// then refinery, then witness.
    pub async fn shutdown(
        &self,
        rig: &str,
        opts: ShutdownOptions,
    ) -> Result<RigStatus, EngineError> {
        if !self.town.has_rig(rig) {
            return Err(EngineError::NotFound(format!("rig {rig}")));
        }

        let polecats = self.live_polecats(rig).await?;

        if !opts.nuclear {
            let mut dirty = Vec::new();
            for name in &polecats {
                let workspace = self.town.paths().polecat_worktree(rig, name);
                match self.git.uncommitted_work(&workspace).await {
                    Ok(status) if !status.is_clean() => {
                        dirty.push(format!("{}: {}", name, status.report()));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(polecat = %name, error = %err, "uncommitted-work check failed");
                    }
                }
            }
            if !dirty.is_empty() {
                return Err(EngineError::UncommittedWork {
                    workspace: rig.to_string(),
                    report: dirty.join("; "),
                });
            }
        }

        // Stop order: polecats, refinery, witness.
        for name in &polecats {
            let addr = AgentAddress::Polecat {
                rig: rig.to_string(),
                name: name.clone(),
            };
            self.sessions
                .kill_session(&addr.session_name(self.town.name()))
                .await?;
        }
        for addr in [
            AgentAddress::Refinery {
                rig: rig.to_string(),
            },
            AgentAddress::Witness {
                rig: rig.to_string(),
            },
        ] {
            self.sessions
                .kill_session(&addr.session_name(self.town.name()))
                .await?;
        }

        self.status(rig).await
    }

    pub async fn reboot(&self, rig: &str, opts: ShutdownOptions) -> Result<RigStatus, EngineError> {
        self.shutdown(rig, opts).await?;
        self.boot(rig).await
    }

    pub async fn status(&self, rig: &str) -> Result<RigStatus, EngineError> {
        if !self.town.has_rig(rig) {
            return Err(EngineError::NotFound(format!("rig {rig}")));
        }
        let config = self.town.rig_config(rig)?;
        let witness = AgentAddress::Witness {
            rig: rig.to_string(),
        };
        let refinery = AgentAddress::Refinery {
            rig: rig.to_string(),
        };
        Ok(RigStatus {
            rig: rig.to_string(),
            state: config.state,
            witness_up: self
                .sessions
                .has_session(&witness.session_name(self.town.name()))
                .await?,
            refinery_up: self
                .sessions
                .has_session(&refinery.session_name(self.town.name()))
                .await?,
            polecats: self.live_polecats(rig).await?,
        })
    }

    /// Run `boot` across rigs with bounded concurrency.
    pub async fn start_many(
        &self,
        rigs: &[String],
    ) -> Vec<(String, Result<RigStatus, EngineError>)> {
        self.for_each_rig(rigs, |lifecycle, rig| async move {
            lifecycle.boot(&rig).await
        })
        .await
    }

    /// Run `shutdown` across rigs with bounded concurrency.
    pub async fn stop_many(
        &self,
        rigs: &[String],
        opts: ShutdownOptions,
    ) -> Vec<(String, Result<RigStatus, EngineError>)> {
        self.for_each_rig(rigs, move |lifecycle, rig| async move {
            lifecycle.shutdown(&rig, opts).await
        })
        .await
    }

    /// Run `reboot` across rigs with bounded concurrency.
    pub async fn restart_many(
        &self,
        rigs: &[String],
        opts: ShutdownOptions,
    ) -> Vec<(String, Result<RigStatus, EngineError>)> {
        self.for_each_rig(rigs, move |lifecycle, rig| async move {
            lifecycle.reboot(&rig, opts).await
        })
        .await
    }

    async fn for_each_rig<F, Fut>(
        &self,
        rigs: &[String],
        op: F,
    ) -> Vec<(String, Result<RigStatus, EngineError>)>
    where
        F: Fn(Self, String) -> Fut + Clone + Send + 'static,
        Fut: std::future::Future<Output = Result<RigStatus, EngineError>> + Send,
    {
        let semaphore = Arc::new(Semaphore::new(MULTI_RIG_CAP));
        let mut set = JoinSet::new();
        for rig in rigs {
            let lifecycle = self.clone();
            let rig = rig.clone();
            let op = op.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                // Closed only if the semaphore is dropped, which it is not.
                let _permit = semaphore.acquire_owned().await;
                let result = op(lifecycle, rig.clone()).await;
                (rig, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(entry) => results.push(entry),
                Err(err) => {
                    tracing::error!(error = %err, "rig task panicked");
                }
            }
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    /// Names of polecats with live sessions in this rig.
    async fn live_polecats(&self, rig: &str) -> Result<Vec<String>, EngineError> {
        let rigs = self.town.rig_names();
        let mut names = Vec::new();
        for session in self.sessions.list_sessions().await? {
            if let Some(AgentAddress::Polecat { rig: r, name }) =
                AgentAddress::from_session_name(&session.name, self.town.name(), &rigs)
            {
                if r == rig {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// The tracker handle (reset/adopt flows use it directly).
    pub fn tracker(&self) -> &T {
        &self.tracker
    }
}

#[cfg(test)]
#[path = "rig_tests.rs"]
mod tests;
