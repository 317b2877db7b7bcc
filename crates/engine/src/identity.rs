// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live identity resolution.
//!
//! The pure address ↔ session ↔ bead mappings live in `gt_core::address`;
//! this resolver adds the parts that need the running system: the
//! ambiguous `rig/name` short form (crew wins over polecat when its
//! session is live, cooperating with the mail subsystem) and rig-context
//! expansion for single-token roles.

use crate::context::TownCtx;
use crate::error::EngineError;
use gt_adapters::Sessions;
use gt_core::address::{AddressError, AgentAddress};

/// Resolves loose target strings into agent addresses.
pub struct IdentityResolver<'a, S: Sessions> {
    town: &'a TownCtx,
    sessions: &'a S,
}

impl<'a, S: Sessions> IdentityResolver<'a, S> {
    pub fn new(town: &'a TownCtx, sessions: &'a S) -> Self {
        Self { town, sessions }
    }

    /// Resolve a target string. `rig_context` feeds single-token role
    /// expansion (`witness` → `<rig>/witness`).
    pub async fn resolve(
        &self,
        target: &str,
        rig_context: Option<&str>,
    ) -> Result<AgentAddress, EngineError> {
        match AgentAddress::parse(target, rig_context) {
            Ok(addr) => Ok(addr),
            Err(AddressError::Malformed(_)) => self.resolve_short_form(target).await,
            Err(err) => Err(err.into()),
        }
    }

    /// `rig/name` is ambiguous between crew and polecat. Crew resolves
    /// first when its session is live; otherwise polecat.
    async fn resolve_short_form(&self, target: &str) -> Result<AgentAddress, EngineError> {
        let parts: Vec<&str> = target.trim_matches('/').split('/').collect();
        let [rig, name] = parts.as_slice() else {
            return Err(AddressError::Malformed(target.to_string()).into());
        };
        if !self.town.has_rig(rig) {
            return Err(AddressError::UnknownRig(rig.to_string()).into());
        }

        let crew = AgentAddress::Crew {
            rig: rig.to_string(),
            name: name.to_string(),
        };
        let crew_session = crew.session_name(self.town.name());
        if self.sessions.has_session(&crew_session).await? {
            return Ok(crew);
        }

        Ok(AgentAddress::Polecat {
            rig: rig.to_string(),
            name: name.to_string(),
        })
    }

    /// Three-state deadness for a hooked agent, by address string.
    ///
    /// `Some(true)` = session confirmed dead (the multiplexer answered,
    /// or no server is running at all), `Some(false)` = confirmed
    /// alive, `None` = unknown, and unknown never auto-forces a
    /// re-hook.
    pub async fn is_agent_dead(&self, assignee: &str) -> Option<bool> {
        let addr = match AgentAddress::parse(assignee, None) {
            Ok(addr) => addr,
            Err(_) => return None,
        };
        let session = addr.session_name(self.town.name());
        match self.sessions.has_session(&session).await {
            Ok(alive) => Some(!alive),
            // No server: nothing can be alive under it.
            Err(gt_adapters::SessionError::NoServer) => Some(true),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
