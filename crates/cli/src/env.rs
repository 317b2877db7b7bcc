// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use gt_core::role::RoleContext;

/// The caller's role context from `GT_ROLE`/`GT_RIG`/`GT_POLECAT`/
/// `GT_CREW`.
///
/// Outside any agent shell (no `GT_ROLE`), the human operator acts as
/// the mayor.
pub fn role_context() -> RoleContext {
    let Ok(role) = std::env::var("GT_ROLE") else {
        return RoleContext::mayor();
    };
    let rig = std::env::var("GT_RIG").ok();
    let name = std::env::var("GT_POLECAT")
        .or_else(|_| std::env::var("GT_CREW"))
        .or_else(|_| std::env::var("GT_DOG"))
        .ok();
    RoleContext::parse(&role, rig.as_deref(), name.as_deref()).unwrap_or_else(|err| {
        tracing::warn!(role, error = %err, "unusable role context; acting as mayor");
        RoleContext::mayor()
    })
}

/// Actor string for tracker attribution: `BD_ACTOR` wins, else the
/// role context's canonical address.
pub fn actor() -> String {
    std::env::var("BD_ACTOR").unwrap_or_else(|_| role_context().actor())
}

/// Rig context for single-token targets: explicit `GT_RIG`, else the
/// role context's rig.
pub fn rig_context() -> Option<String> {
    std::env::var("GT_RIG")
        .ok()
        .or_else(|| role_context().rig().map(str::to_string))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
