// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Squash semantics: compress a molecule's execution into a digest.

use super::HookEngine;
use crate::error::EngineError;
use gt_adapters::{CreateOptions, Sessions, Tracker};
use gt_core::bead::{BeadStatus, BeadType, DepDirection, DepType};
use gt_core::fields::AttachmentFields;
use rand::Rng;
use std::time::Duration;

impl<T: Tracker, S: Sessions> HookEngine<T, S> {
    /// Compress the molecule attached to `work_bead` into an ephemeral
    /// digest bead, then detach with audit and close the molecule.
    ///
    /// The optional pre-sleep jitter desynchronizes concurrent patrols
    /// colliding on the tracker lock. Returns the digest bead id.
    pub async fn squash(
        &self,
        work_bead: &str,
        actor: &str,
        summary: Option<&str>,
        jitter_max: Option<Duration>,
    ) -> Result<String, EngineError> {
        if let Some(max) = jitter_max {
            if !max.is_zero() {
                let nanos = rand::rng().random_range(0..=max.as_nanos() as u64);
                tokio::time::sleep(Duration::from_nanos(nanos)).await;
            }
        }

        let bead = self.tracker.show(work_bead, true).await?;
        let fields = AttachmentFields::parse(&bead.description);
        let molecule = fields.attached_molecule.ok_or_else(|| {
            EngineError::NotFound(format!("{} has no attached molecule", work_bead))
        })?;

        let steps = self
            .tracker
            .dep_list(&molecule, DepDirection::Down, Some(DepType::ParentChild))
            .await?;
        let total = steps.len();
        let mut done = 0;
        for step in &steps {
            match self.tracker.show(&step.id, true).await {
                Ok(step_bead) if step_bead.status == BeadStatus::Closed => done += 1,
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(step = %step.id, error = %err, "unreadable molecule step");
                }
            }
        }

        let mut description = format!(
            "molecule: {}\nagent: {}\nsquashed_at: {}\nsteps: {}/{}",
            molecule,
            actor,
            gt_core::time_fmt::format_utc_now(),
            done,
            total
        );
        if let Some(summary) = summary {
            description.push_str("\nsummary: ");
            description.push_str(summary);
        }

        let digest = self
            .tracker
            .create(&CreateOptions {
                title: format!("Digest: {}", molecule),
                description,
                bead_type: BeadType::Task,
                labels: vec!["digest".to_string()],
                priority: Some(4),
                ephemeral: true,
                ..Default::default()
            })
            .await?;
        self.tracker.close(&digest.id, false).await?;

        self.detach_molecule_with_audit(work_bead, "squash", actor)
            .await?;
        self.force_close(&molecule).await;

        Ok(digest.id)
    }
}
