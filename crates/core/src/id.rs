// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bead-id shape helpers and cross-store reference envelopes.
//!
//! Bead ids are `<prefix>-<tail>` strings minted by the external tracker.
//! The prefix routes the id to a store (see the routes table); the tail is
//! either a standard 5-character hash or a role/name segment for agent
//! beads. Nothing here touches the tracker; these are pure string rules.

/// Envelope marker for dependency references that cross store boundaries.
const EXTERNAL_MARKER: &str = "external:";

/// Trait for truncating identifiers to a short prefix.
pub trait ShortId {
    /// Returns a string slice truncated to at most `n` characters.
    fn short(&self, n: usize) -> &str;
}

impl ShortId for str {
    fn short(&self, n: usize) -> &str {
        if self.len() <= n {
            self
        } else {
            &self[..n]
        }
    }
}

/// Extract the routing prefix of a bead id, including the trailing dash.
///
/// `"gt-abc12"` → `Some("gt-")`. Returns `None` when there is no dash or
/// the head before the first dash is empty.
pub fn extract_prefix(id: &str) -> Option<&str> {
    let dash = id.find('-')?;
    if dash == 0 {
        return None;
    }
    Some(&id[..=dash])
}

/// Whether a string has the shape of a tracker bead id.
///
/// A short lowercase-alphabetic prefix (1-5 chars), a dash, and a
/// non-empty tail of alphanumerics, dots, and dashes. Both agent beads
/// (`gt-gastown-witness`) and standard hashes (`gt-abc12`) match; plain
/// role words ("mayor"), addresses ("deacon/dogs"), and uppercase or
/// numeric prefixes do not.
pub fn looks_like_bead_id(s: &str) -> bool {
    let Some(dash) = s.find('-') else {
        return false;
    };
    let (head, tail) = (&s[..dash], &s[dash + 1..]);
    if head.is_empty() || head.len() > 5 || tail.is_empty() {
        return false;
    }
    head.chars().all(|c| c.is_ascii_lowercase())
        && tail
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Whether `s` is a standard tracker short hash: exactly 5 lowercase
/// alphanumerics.
///
/// This is the disambiguator between hash tails and role/name tails when
/// inferring identities from the issues log.
pub fn is_standard_bead_hash(s: &str) -> bool {
    s.len() == 5
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Wrap a bead id in the cross-store reference envelope.
///
/// `"gt-abc12"` → `"external:gt:gt-abc12"`. Already-wrapped ids pass
/// through unchanged, so the function is idempotent. Ids without a prefix
/// are returned unchanged (there is nothing to route on).
pub fn format_track_bead_id(id: &str) -> String {
    if id.starts_with(EXTERNAL_MARKER) {
        return id.to_string();
    }
    match extract_prefix(id) {
        Some(prefix) => format!(
            "{}{}:{}",
            EXTERNAL_MARKER,
            prefix.trim_end_matches('-'),
            id
        ),
        None => id.to_string(),
    }
}

/// Strip the cross-store envelope from a reference, if present.
///
/// `"external:gt:gt-abc12"` → `"gt-abc12"`; raw ids pass through. The
/// inverse of [`format_track_bead_id`] for any id carrying a prefix.
pub fn extract_issue_id(s: &str) -> &str {
    let Some(rest) = s.strip_prefix(EXTERNAL_MARKER) else {
        return s;
    };
    match rest.find(':') {
        Some(colon) => &rest[colon + 1..],
        None => rest,
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
