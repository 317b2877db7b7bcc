// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The attachment block inside a bead description.
//!
//! Hook state that travels with a work bead is a block of human-readable
//! `key: value` lines appended to the description. The block is always
//! rewritten as a whole in a single read-modify-write; writing fields one
//! at a time loses updates under concurrent dispatchers, so no API for
//! that exists here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution mode requested for the hooked agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkMode {
    #[default]
    Normal,
    Ralph,
}

impl WorkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkMode::Normal => "normal",
            WorkMode::Ralph => "ralph",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(WorkMode::Normal),
            "ralph" => Some(WorkMode::Ralph),
            _ => None,
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How completed work reaches the default branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    Direct,
    Mr,
    Local,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Direct => "direct",
            MergeStrategy::Mr => "mr",
            MergeStrategy::Local => "local",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(MergeStrategy::Direct),
            "mr" => Some(MergeStrategy::Mr),
            "local" => Some(MergeStrategy::Local),
            _ => None,
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys the attachment block may carry, in render order.
const FIELD_KEYS: &[&str] = &[
    "dispatched_by",
    "attached_molecule",
    "attached_at",
    "attached_args",
    "no_merge",
    "mode",
    "convoy_id",
    "merge_strategy",
    "convoy_owned",
];

/// Parsed attachment block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentFields {
    pub dispatched_by: Option<String>,
    pub attached_molecule: Option<String>,
    pub attached_at: Option<String>,
    pub attached_args: Option<String>,
    pub no_merge: bool,
    pub mode: Option<WorkMode>,
    pub convoy_id: Option<String>,
    pub merge_strategy: Option<MergeStrategy>,
    pub convoy_owned: bool,
}

impl AttachmentFields {
    /// Parse the attachment block out of a description. Lines that do not
    /// match a known key are ignored; the last occurrence of a key wins.
    pub fn parse(description: &str) -> Self {
        let mut fields = Self::default();
        for line in description.lines() {
            let Some((key, value)) = split_field_line(line) else {
                continue;
            };
            match key {
                "dispatched_by" => fields.dispatched_by = Some(value.to_string()),
                "attached_molecule" => fields.attached_molecule = Some(value.to_string()),
                "attached_at" => fields.attached_at = Some(value.to_string()),
                "attached_args" => fields.attached_args = Some(value.to_string()),
                "no_merge" => fields.no_merge = value == "true",
                "mode" => fields.mode = WorkMode::parse(value),
                "convoy_id" => fields.convoy_id = Some(value.to_string()),
                "merge_strategy" => fields.merge_strategy = MergeStrategy::parse(value),
                "convoy_owned" => fields.convoy_owned = value == "true",
                _ => {}
            }
        }
        fields
    }

    /// Render the block as `key: value` lines in schema order. Unset
    /// fields and false flags produce no line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut push = |key: &str, value: &str| {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        };
        if let Some(v) = &self.dispatched_by {
            push("dispatched_by", v);
        }
        if let Some(v) = &self.attached_molecule {
            push("attached_molecule", v);
        }
        if let Some(v) = &self.attached_at {
            push("attached_at", v);
        }
        if let Some(v) = &self.attached_args {
            push("attached_args", v);
        }
        if self.no_merge {
            push("no_merge", "true");
        }
        if let Some(v) = &self.mode {
            push("mode", v.as_str());
        }
        if let Some(v) = &self.convoy_id {
            push("convoy_id", v);
        }
        if let Some(v) = &self.merge_strategy {
            push("merge_strategy", v.as_str());
        }
        if self.convoy_owned {
            push("convoy_owned", "true");
        }
        out
    }

    /// Replace the attachment block in `description` with this one.
    ///
    /// Existing field lines are removed wherever they appear; the new
    /// block is appended after the surviving text. This is the one
    /// sanctioned way to write attachment state.
    pub fn apply_to(&self, description: &str) -> String {
        let body = strip_fields(description);
        let block = self.render();
        if block.is_empty() {
            return body;
        }
        if body.is_empty() {
            return block.trim_end().to_string();
        }
        format!("{}\n\n{}", body, block.trim_end())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Remove every attachment field line, preserving the rest verbatim.
pub fn strip_fields(description: &str) -> String {
    let kept: Vec<&str> = description
        .lines()
        .filter(|line| split_field_line(line).is_none())
        .collect();
    kept.join("\n").trim_end().to_string()
}

/// Read one `key: value` line from a description without parsing the
/// whole block. Used for out-of-schema keys like `notification_level`.
pub fn field_value<'a>(description: &'a str, key: &str) -> Option<&'a str> {
    description.lines().rev().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        if k.trim() == key {
            Some(v.trim())
        } else {
            None
        }
    })
}

fn split_field_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if FIELD_KEYS.contains(&key) {
        Some((key, value.trim()))
    } else {
        None
    }
}

#[cfg(test)]
#[path = "fields_tests.rs"]
mod tests;
