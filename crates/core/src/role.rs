// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent roles and the caller's role context.
//!
//! Role is a closed set. `RoleContext` carries the conditionally-populated
//! rig/name fields; the per-role constructors enforce which fields must be
//! present so call sites never nil-check.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The kind of agent an identity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Town-level coordinator singleton.
    Mayor,
    /// Town-level cross-rig scheduler singleton.
    Deacon,
    /// Rig-level monitor singleton.
    Witness,
    /// Rig-level merge-queue processor singleton.
    Refinery,
    /// Ephemeral per-work agent.
    Polecat,
    /// Persistent per-human agent.
    Crew,
    /// Reusable cross-rig worker.
    Dog,
    /// Unrecognized role string.
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mayor => "mayor",
            Role::Deacon => "deacon",
            Role::Witness => "witness",
            Role::Refinery => "refinery",
            Role::Polecat => "polecat",
            Role::Crew => "crew",
            Role::Dog => "dog",
            Role::Unknown => "unknown",
        }
    }

    /// Town-level singletons exist once per town and carry no rig.
    pub fn is_town_singleton(&self) -> bool {
        matches!(self, Role::Mayor | Role::Deacon)
    }

    /// Rig-level singletons exist once per rig and carry no name.
    pub fn is_rig_singleton(&self) -> bool {
        matches!(self, Role::Witness | Role::Refinery)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "mayor" => Role::Mayor,
            "deacon" => Role::Deacon,
            "witness" => Role::Witness,
            "refinery" => Role::Refinery,
            "polecat" => Role::Polecat,
            "crew" => Role::Crew,
            "dog" => Role::Dog,
            _ => Role::Unknown,
        })
    }
}

/// Errors building a [`RoleContext`] from loose inputs.
#[derive(Debug, Error)]
pub enum RoleContextError {
    #[error("role {0} requires a rig, and no rig context is set")]
    MissingRig(Role),
    #[error("role {0} requires an agent name")]
    MissingName(Role),
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// The resolved identity of the current caller.
///
/// Field validity is role-specific and enforced by the constructors:
/// town singletons have neither rig nor name, rig singletons have only a
/// rig, polecats and crew have both, dogs have only a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleContext {
    role: Role,
    rig: Option<String>,
    name: Option<String>,
}

impl Default for RoleContext {
    fn default() -> Self {
        Self {
            role: Role::Unknown,
            rig: None,
            name: None,
        }
    }
}

impl RoleContext {
    pub fn mayor() -> Self {
        Self {
            role: Role::Mayor,
            rig: None,
            name: None,
        }
    }

    pub fn deacon() -> Self {
        Self {
            role: Role::Deacon,
            rig: None,
            name: None,
        }
    }

    pub fn witness(rig: impl Into<String>) -> Self {
        Self {
            role: Role::Witness,
            rig: Some(rig.into()),
            name: None,
        }
    }

    pub fn refinery(rig: impl Into<String>) -> Self {
        Self {
            role: Role::Refinery,
            rig: Some(rig.into()),
            name: None,
        }
    }

    pub fn polecat(rig: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: Role::Polecat,
            rig: Some(rig.into()),
            name: Some(name.into()),
        }
    }

    pub fn crew(rig: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: Role::Crew,
            rig: Some(rig.into()),
            name: Some(name.into()),
        }
    }

    pub fn dog(name: impl Into<String>) -> Self {
        Self {
            role: Role::Dog,
            rig: None,
            name: Some(name.into()),
        }
    }

    /// Build from loose (role, rig, name) strings, e.g. environment input.
    pub fn parse(
        role_str: &str,
        rig: Option<&str>,
        name: Option<&str>,
    ) -> Result<Self, RoleContextError> {
        let role: Role = role_str.parse().unwrap_or(Role::Unknown);
        match role {
            Role::Mayor => Ok(Self::mayor()),
            Role::Deacon => Ok(Self::deacon()),
            Role::Witness | Role::Refinery => {
                let rig = rig.ok_or(RoleContextError::MissingRig(role))?;
                Ok(match role {
                    Role::Witness => Self::witness(rig),
                    _ => Self::refinery(rig),
                })
            }
            Role::Polecat | Role::Crew => {
                let rig = rig.ok_or(RoleContextError::MissingRig(role))?;
                let name = name.ok_or(RoleContextError::MissingName(role))?;
                Ok(match role {
                    Role::Polecat => Self::polecat(rig, name),
                    _ => Self::crew(rig, name),
                })
            }
            Role::Dog => {
                let name = name.ok_or(RoleContextError::MissingName(role))?;
                Ok(Self::dog(name))
            }
            Role::Unknown => Err(RoleContextError::UnknownRole(role_str.to_string())),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn rig(&self) -> Option<&str> {
        self.rig.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The canonical address string for this context.
    ///
    /// `mayor`, `<rig>/witness`, `<rig>/polecats/<name>`, `deacon/dogs/<name>`.
    pub fn actor(&self) -> String {
        match (self.role, self.rig.as_deref(), self.name.as_deref()) {
            (Role::Mayor, _, _) => "mayor".to_string(),
            (Role::Deacon, _, _) => "deacon".to_string(),
            (Role::Witness, Some(rig), _) => format!("{}/witness", rig),
            (Role::Refinery, Some(rig), _) => format!("{}/refinery", rig),
            (Role::Polecat, Some(rig), Some(name)) => format!("{}/polecats/{}", rig, name),
            (Role::Crew, Some(rig), Some(name)) => format!("{}/crew/{}", rig, name),
            (Role::Dog, _, Some(name)) => format!("deacon/dogs/{}", name),
            // Constructors make these unreachable; fall back to the role word.
            (role, _, _) => role.as_str().to_string(),
        }
    }
}

#[cfg(test)]
#[path = "role_tests.rs"]
mod tests;
