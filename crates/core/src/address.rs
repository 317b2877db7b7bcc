// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent addresses and the mappings to session names and bead ids.
//!
//! An address is the human-readable identity of an agent
//! (`gastown/polecats/nux`, `mayor`, `deacon/dogs/rex`). Given the prefix
//! map it is bijective with a tmux session name and a tracker bead id.
//! Short forms that need liveness probing (`rig/name`) resolve in the
//! engine; everything here is pure.

use crate::role::{Role, RoleContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Session-name prefix for every session this orchestrator owns.
pub const SESSION_PREFIX: &str = "gt";

/// Bead-id prefix for town-level identities.
pub const TOWN_PREFIX: &str = "hq";

/// Rig name → tracker prefix (without the trailing dash).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMap {
    rigs: BTreeMap<String, String>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rig: impl Into<String>, prefix: impl Into<String>) {
        self.rigs.insert(rig.into(), prefix.into());
    }

    /// Tracker prefix for a rig, without the trailing dash.
    pub fn prefix_for(&self, rig: &str) -> Option<&str> {
        self.rigs.get(rig).map(String::as_str)
    }

    /// Reverse lookup: rig name for a tracker prefix.
    pub fn rig_for(&self, prefix: &str) -> Option<&str> {
        self.rigs
            .iter()
            .find(|(_, p)| p.as_str() == prefix)
            .map(|(rig, _)| rig.as_str())
    }

    pub fn rigs(&self) -> impl Iterator<Item = &str> {
        self.rigs.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rigs.is_empty()
    }
}

/// Errors resolving an address string.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("empty agent address")]
    Empty,
    #[error("unknown rig in address: {0}")]
    UnknownRig(String),
    #[error("no rig configured with prefix {0}")]
    UnknownPrefix(String),
    #[error("malformed agent address: {0}")]
    Malformed(String),
    #[error("address {0} needs a rig context (run inside a rig or pass rig/{0})")]
    NeedsRigContext(String),
}

/// A fully-resolved agent identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgentAddress {
    Mayor,
    Deacon,
    Witness { rig: String },
    Refinery { rig: String },
    Polecat { rig: String, name: String },
    Crew { rig: String, name: String },
    Dog { name: String },
}

impl AgentAddress {
    pub fn role(&self) -> Role {
        match self {
            AgentAddress::Mayor => Role::Mayor,
            AgentAddress::Deacon => Role::Deacon,
            AgentAddress::Witness { .. } => Role::Witness,
            AgentAddress::Refinery { .. } => Role::Refinery,
            AgentAddress::Polecat { .. } => Role::Polecat,
            AgentAddress::Crew { .. } => Role::Crew,
            AgentAddress::Dog { .. } => Role::Dog,
        }
    }

    pub fn rig(&self) -> Option<&str> {
        match self {
            AgentAddress::Witness { rig }
            | AgentAddress::Refinery { rig }
            | AgentAddress::Polecat { rig, .. }
            | AgentAddress::Crew { rig, .. } => Some(rig),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            AgentAddress::Polecat { name, .. }
            | AgentAddress::Crew { name, .. }
            | AgentAddress::Dog { name } => Some(name),
            _ => None,
        }
    }

    /// Parse a canonical (unambiguous) address string.
    ///
    /// Accepts the full forms `mayor`, `deacon`, `<rig>/witness`,
    /// `<rig>/refinery`, `<rig>/polecats/<n>`, `<rig>/crew/<n>`,
    /// `deacon/dogs/<n>`. Single-token role names other than mayor/deacon
    /// expand from `rig_context`; its absence is a hard error. The
    /// two-token short form `rig/name` is ambiguous (crew vs polecat) and
    /// is rejected here; the engine resolves it against live sessions.
    pub fn parse(s: &str, rig_context: Option<&str>) -> Result<Self, AddressError> {
        let s = s.trim().trim_matches('/');
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            ["mayor"] => Ok(AgentAddress::Mayor),
            ["deacon"] => Ok(AgentAddress::Deacon),
            ["witness"] => {
                let rig = rig_context
                    .ok_or_else(|| AddressError::NeedsRigContext("witness".to_string()))?;
                Ok(AgentAddress::Witness {
                    rig: rig.to_string(),
                })
            }
            ["refinery"] => {
                let rig = rig_context
                    .ok_or_else(|| AddressError::NeedsRigContext("refinery".to_string()))?;
                Ok(AgentAddress::Refinery {
                    rig: rig.to_string(),
                })
            }
            [rig, "witness"] => Ok(AgentAddress::Witness {
                rig: rig.to_string(),
            }),
            [rig, "refinery"] => Ok(AgentAddress::Refinery {
                rig: rig.to_string(),
            }),
            ["deacon", "dogs", name] => Ok(AgentAddress::Dog {
                name: name.to_string(),
            }),
            [rig, "polecats", name] => Ok(AgentAddress::Polecat {
                rig: rig.to_string(),
                name: name.to_string(),
            }),
            [rig, "crew", name] => Ok(AgentAddress::Crew {
                rig: rig.to_string(),
                name: name.to_string(),
            }),
            _ => Err(AddressError::Malformed(s.to_string())),
        }
    }

    /// The tmux session name for this identity.
    ///
    /// `town` is only consulted for dog sessions, which embed the town
    /// name to stay unique across towns sharing a tmux server.
    pub fn session_name(&self, town: &str) -> String {
        match self {
            AgentAddress::Mayor => format!("{}-mayor", SESSION_PREFIX),
            AgentAddress::Deacon => format!("{}-deacon", SESSION_PREFIX),
            AgentAddress::Witness { rig } => format!("{}-{}-witness", SESSION_PREFIX, rig),
            AgentAddress::Refinery { rig } => format!("{}-{}-refinery", SESSION_PREFIX, rig),
            AgentAddress::Polecat { rig, name } => format!("{}-{}-{}", SESSION_PREFIX, rig, name),
            AgentAddress::Crew { rig, name } => {
                format!("{}-{}-crew-{}", SESSION_PREFIX, rig, name)
            }
            AgentAddress::Dog { name } => {
                format!("{}-{}-deacon-{}", SESSION_PREFIX, town, name)
            }
        }
    }

    /// The tracker bead id holding this agent's identity record.
    pub fn bead_id(&self, prefixes: &PrefixMap) -> Result<String, AddressError> {
        let rig_prefix = |rig: &str| {
            prefixes
                .prefix_for(rig)
                .map(str::to_string)
                .ok_or_else(|| AddressError::UnknownRig(rig.to_string()))
        };
        Ok(match self {
            AgentAddress::Mayor => format!("{}-mayor", TOWN_PREFIX),
            AgentAddress::Deacon => format!("{}-deacon", TOWN_PREFIX),
            AgentAddress::Witness { rig } => format!("{}-{}-witness", rig_prefix(rig)?, rig),
            AgentAddress::Refinery { rig } => {
                format!("{}-{}-refinery", rig_prefix(rig)?, rig)
            }
            AgentAddress::Polecat { rig, name } => {
                format!("{}-{}-polecat-{}", rig_prefix(rig)?, rig, name)
            }
            AgentAddress::Crew { rig, name } => {
                format!("{}-{}-crew-{}", rig_prefix(rig)?, rig, name)
            }
            AgentAddress::Dog { name } => format!("{}-dog-{}", TOWN_PREFIX, name),
        })
    }

    /// Recover an address from an identity bead id, given the prefix map.
    ///
    /// Inverse of [`AgentAddress::bead_id`] over the canonical schema.
    pub fn from_bead_id(id: &str, prefixes: &PrefixMap) -> Result<Self, AddressError> {
        if let Some(tail) = id.strip_prefix(&format!("{}-", TOWN_PREFIX)) {
            return match tail {
                "mayor" => Ok(AgentAddress::Mayor),
                "deacon" => Ok(AgentAddress::Deacon),
                _ => match tail.strip_prefix("dog-") {
                    Some(name) if !name.is_empty() => Ok(AgentAddress::Dog {
                        name: name.to_string(),
                    }),
                    _ => Err(AddressError::Malformed(id.to_string())),
                },
            };
        }

        let Some(prefix) = crate::id::extract_prefix(id) else {
            return Err(AddressError::Malformed(id.to_string()));
        };
        let prefix = prefix.trim_end_matches('-');
        let rig = prefixes
            .rig_for(prefix)
            .ok_or_else(|| AddressError::UnknownPrefix(prefix.to_string()))?
            .to_string();

        let tail = id
            .strip_prefix(&format!("{}-{}-", prefix, rig))
            .ok_or_else(|| AddressError::Malformed(id.to_string()))?;
        match tail {
            "witness" => Ok(AgentAddress::Witness { rig }),
            "refinery" => Ok(AgentAddress::Refinery { rig }),
            _ => {
                if let Some(name) = tail.strip_prefix("polecat-") {
                    Ok(AgentAddress::Polecat {
                        rig,
                        name: name.to_string(),
                    })
                } else if let Some(name) = tail.strip_prefix("crew-") {
                    Ok(AgentAddress::Crew {
                        rig,
                        name: name.to_string(),
                    })
                } else {
                    Err(AddressError::Malformed(id.to_string()))
                }
            }
        }
    }

    /// Recover an address from a tmux session name.
    ///
    /// Rig names may contain dashes, so the rig segment is matched
    /// longest-first against `known_rigs`.
    pub fn from_session_name(
        session: &str,
        town: &str,
        known_rigs: &[String],
    ) -> Option<Self> {
        let tail = session.strip_prefix(&format!("{}-", SESSION_PREFIX))?;
        match tail {
            "mayor" => return Some(AgentAddress::Mayor),
            "deacon" => return Some(AgentAddress::Deacon),
            _ => {}
        }

        if let Some(name) = tail.strip_prefix(&format!("{}-deacon-", town)) {
            if !name.is_empty() {
                return Some(AgentAddress::Dog {
                    name: name.to_string(),
                });
            }
        }

        let mut rigs: Vec<&String> = known_rigs.iter().collect();
        rigs.sort_by_key(|r| std::cmp::Reverse(r.len()));
        for rig in rigs {
            let Some(rest) = tail.strip_prefix(&format!("{}-", rig)) else {
                continue;
            };
            return Some(match rest {
                "witness" => AgentAddress::Witness { rig: rig.clone() },
                "refinery" => AgentAddress::Refinery { rig: rig.clone() },
                _ => {
                    if let Some(name) = rest.strip_prefix("crew-") {
                        AgentAddress::Crew {
                            rig: rig.clone(),
                            name: name.to_string(),
                        }
                    } else {
                        AgentAddress::Polecat {
                            rig: rig.clone(),
                            name: rest.to_string(),
                        }
                    }
                }
            });
        }
        None
    }

    /// The address of the caller's own role context, if it names an agent.
    pub fn from_role_context(ctx: &RoleContext) -> Option<Self> {
        match (ctx.role(), ctx.rig(), ctx.name()) {
            (Role::Mayor, _, _) => Some(AgentAddress::Mayor),
            (Role::Deacon, _, _) => Some(AgentAddress::Deacon),
            (Role::Witness, Some(rig), _) => Some(AgentAddress::Witness {
                rig: rig.to_string(),
            }),
            (Role::Refinery, Some(rig), _) => Some(AgentAddress::Refinery {
                rig: rig.to_string(),
            }),
            (Role::Polecat, Some(rig), Some(name)) => Some(AgentAddress::Polecat {
                rig: rig.to_string(),
                name: name.to_string(),
            }),
            (Role::Crew, Some(rig), Some(name)) => Some(AgentAddress::Crew {
                rig: rig.to_string(),
                name: name.to_string(),
            }),
            (Role::Dog, _, Some(name)) => Some(AgentAddress::Dog {
                name: name.to_string(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for AgentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentAddress::Mayor => f.write_str("mayor"),
            AgentAddress::Deacon => f.write_str("deacon"),
            AgentAddress::Witness { rig } => write!(f, "{}/witness", rig),
            AgentAddress::Refinery { rig } => write!(f, "{}/refinery", rig),
            AgentAddress::Polecat { rig, name } => write!(f, "{}/polecats/{}", rig, name),
            AgentAddress::Crew { rig, name } => write!(f, "{}/crew/{}", rig, name),
            AgentAddress::Dog { name } => write!(f, "deacon/dogs/{}", name),
        }
    }
}

#[cfg(test)]
#[path = "address_tests.rs"]
mod tests;
