// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Burn semantics: detach-with-audit and recursive force-close.

use super::HookEngine;
use crate::error::EngineError;
use gt_adapters::{Sessions, Tracker, UpdatePatch};
use gt_core::bead::{DepDirection, DepType};
use gt_core::fields::{strip_fields, AttachmentFields};

impl<T: Tracker, S: Sessions> HookEngine<T, S> {
    /// Clear the attachment block from a bead's description and record
    /// an audit line in the surviving body. Other description content is
    /// never touched.
    pub async fn detach_molecule_with_audit(
        &self,
        bead_id: &str,
        reason: &str,
        actor: &str,
    ) -> Result<(), EngineError> {
        let bead = self.tracker.show(bead_id, true).await?;
        let fields = AttachmentFields::parse(&bead.description);
        let molecule = fields.attached_molecule.as_deref().unwrap_or("-");

        let body = strip_fields(&bead.description);
        let audit = format!(
            "audit: detached {} ({}) by {} at {}",
            molecule,
            reason,
            actor,
            gt_core::time_fmt::format_utc_now()
        );
        let description = if body.is_empty() {
            audit
        } else {
            format!("{}\n{}", body, audit)
        };

        self.tracker
            .update(bead_id, &UpdatePatch::default().description(description))
            .await?;
        Ok(())
    }

    /// Close a wisp and its open step children, descendants first.
    ///
    /// Child-close errors are logged and counted but never abort the
    /// sweep; orphans get reaped by a later patrol. Returns the number
    /// of beads actually closed.
    pub async fn force_close(&self, wisp_root: &str) -> u32 {
        // Post-order over the parent-child graph, iteratively: async
        // recursion is not worth the boxing here.
        let mut order: Vec<String> = Vec::new();
        let mut stack = vec![wisp_root.to_string()];
        while let Some(id) = stack.pop() {
            if order.contains(&id) {
                continue;
            }
            order.push(id.clone());
            match self
                .tracker
                .dep_list(&id, DepDirection::Down, Some(DepType::ParentChild))
                .await
            {
                Ok(children) => stack.extend(children.into_iter().map(|d| d.id)),
                Err(err) => {
                    tracing::warn!(bead = %id, error = %err, "failed to list molecule children");
                }
            }
        }

        let mut closed = 0;
        let mut failures = 0;
        // Deepest first.
        for id in order.iter().rev() {
            match self.tracker.close(id, true).await {
                Ok(()) => closed += 1,
                Err(err) => {
                    failures += 1;
                    tracing::warn!(bead = %id, error = %err, "failed to force-close molecule bead");
                }
            }
        }
        if failures > 0 {
            tracing::warn!(
                wisp = wisp_root,
                closed,
                failures,
                "force-close finished with orphans"
            );
        }
        closed
    }
}
