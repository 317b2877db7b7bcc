// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared with other crates' tests.
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::bead::{Bead, BeadStatus, BeadType};

/// Fluent builder for tracker beads in tests.
#[derive(Debug, Clone, Default)]
pub struct BeadBuilder {
    bead: Bead,
}

impl BeadBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            bead: Bead {
                id: id.into(),
                ..Default::default()
            },
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.bead.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.bead.description = description.into();
        self
    }

    pub fn status(mut self, status: BeadStatus) -> Self {
        self.bead.status = status;
        self
    }

    pub fn bead_type(mut self, bead_type: BeadType) -> Self {
        self.bead.bead_type = bead_type;
        self
    }

    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.bead.assignee = Some(assignee.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.bead.labels.push(label.into());
        self
    }

    pub fn hook_bead(mut self, id: impl Into<String>) -> Self {
        self.bead.hook_bead = Some(id.into());
        self
    }

    pub fn build(self) -> Bead {
        self.bead
    }
}

/// Create a minimal valid town layout under `root`.
pub fn scaffold_town(root: &std::path::Path, name: &str) {
    let mayor = root.join("mayor");
    let _ = std::fs::create_dir_all(&mayor);
    let town = format!("{{\"name\":\"{}\"}}", name);
    let _ = std::fs::write(mayor.join("town.json"), town);
    let _ = std::fs::create_dir_all(root.join(".beads"));
}
