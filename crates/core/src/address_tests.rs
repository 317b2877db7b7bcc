// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn prefixes() -> PrefixMap {
    let mut map = PrefixMap::new();
    map.insert("gastown", "gt");
    map.insert("bartertown", "bt");
    map
}

fn all_addresses() -> Vec<AgentAddress> {
    vec![
        AgentAddress::Mayor,
        AgentAddress::Deacon,
        AgentAddress::Witness {
            rig: "gastown".to_string(),
        },
        AgentAddress::Refinery {
            rig: "gastown".to_string(),
        },
        AgentAddress::Polecat {
            rig: "gastown".to_string(),
            name: "nux".to_string(),
        },
        AgentAddress::Crew {
            rig: "bartertown".to_string(),
            name: "max".to_string(),
        },
        AgentAddress::Dog {
            name: "rex".to_string(),
        },
    ]
}

#[parameterized(
    mayor = { "mayor", None },
    deacon = { "deacon", None },
    witness_full = { "gastown/witness", None },
    refinery_full = { "gastown/refinery", None },
    polecat = { "gastown/polecats/nux", None },
    crew = { "gastown/crew/max", None },
    dog = { "deacon/dogs/rex", None },
    witness_short = { "witness", Some("gastown") },
    refinery_short = { "refinery", Some("gastown") },
)]
fn parse_accepts_canonical_forms(input: &str, rig_context: Option<&str>) {
    let addr = AgentAddress::parse(input, rig_context).unwrap();
    if rig_context.is_none() {
        // Full forms round-trip through Display.
        assert_eq!(addr.to_string(), input);
    }
}

#[test]
fn short_role_without_rig_context_is_a_hard_error() {
    assert!(matches!(
        AgentAddress::parse("witness", None),
        Err(AddressError::NeedsRigContext(_))
    ));
}

#[test]
fn two_token_short_form_is_rejected_as_ambiguous() {
    // `rig/name` could be crew or polecat; liveness decides, not parsing.
    assert!(matches!(
        AgentAddress::parse("gastown/nux", None),
        Err(AddressError::Malformed(_))
    ));
}

#[test]
fn empty_address_is_an_error() {
    assert!(matches!(
        AgentAddress::parse("", None),
        Err(AddressError::Empty)
    ));
}

#[test]
fn session_names_follow_the_canonical_table() {
    let town = "gastown-hq";
    assert_eq!(AgentAddress::Mayor.session_name(town), "gt-mayor");
    assert_eq!(AgentAddress::Deacon.session_name(town), "gt-deacon");
    assert_eq!(
        AgentAddress::Witness {
            rig: "gastown".to_string()
        }
        .session_name(town),
        "gt-gastown-witness"
    );
    assert_eq!(
        AgentAddress::Polecat {
            rig: "gastown".to_string(),
            name: "nux".to_string()
        }
        .session_name(town),
        "gt-gastown-nux"
    );
    assert_eq!(
        AgentAddress::Crew {
            rig: "gastown".to_string(),
            name: "max".to_string()
        }
        .session_name(town),
        "gt-gastown-crew-max"
    );
    assert_eq!(
        AgentAddress::Dog {
            name: "rex".to_string()
        }
        .session_name(town),
        "gt-gastown-hq-deacon-rex"
    );
}

#[test]
fn bead_ids_follow_the_canonical_table() {
    let p = prefixes();
    assert_eq!(AgentAddress::Mayor.bead_id(&p).unwrap(), "hq-mayor");
    assert_eq!(
        AgentAddress::Witness {
            rig: "gastown".to_string()
        }
        .bead_id(&p)
        .unwrap(),
        "gt-gastown-witness"
    );
    assert_eq!(
        AgentAddress::Polecat {
            rig: "gastown".to_string(),
            name: "nux".to_string()
        }
        .bead_id(&p)
        .unwrap(),
        "gt-gastown-polecat-nux"
    );
    assert_eq!(
        AgentAddress::Dog {
            name: "rex".to_string()
        }
        .bead_id(&p)
        .unwrap(),
        "hq-dog-rex"
    );
}

#[test]
fn bead_id_round_trips_for_every_role() {
    let p = prefixes();
    for addr in all_addresses() {
        let id = addr.bead_id(&p).unwrap();
        let back = AgentAddress::from_bead_id(&id, &p).unwrap();
        assert_eq!(back, addr, "bead id {id} did not round-trip");
    }
}

#[test]
fn session_name_round_trips_for_every_role() {
    let town = "citadel";
    let rigs = vec!["gastown".to_string(), "bartertown".to_string()];
    for addr in all_addresses() {
        let session = addr.session_name(town);
        let back = AgentAddress::from_session_name(&session, town, &rigs).unwrap();
        assert_eq!(back, addr, "session {session} did not round-trip");
    }
}

#[test]
fn dashed_rig_names_resolve_longest_first() {
    let rigs = vec!["gas".to_string(), "gas-town".to_string()];
    let addr =
        AgentAddress::from_session_name("gt-gas-town-witness", "citadel", &rigs).unwrap();
    assert_eq!(
        addr,
        AgentAddress::Witness {
            rig: "gas-town".to_string()
        }
    );
}

#[test]
fn unknown_prefix_is_an_error() {
    let p = prefixes();
    assert!(matches!(
        AgentAddress::from_bead_id("zz-somewhere-witness", &p),
        Err(AddressError::UnknownPrefix(_))
    ));
}

#[test]
fn role_context_addresses() {
    let ctx = crate::role::RoleContext::polecat("gastown", "nux");
    assert_eq!(
        AgentAddress::from_role_context(&ctx),
        Some(AgentAddress::Polecat {
            rig: "gastown".to_string(),
            name: "nux".to_string()
        })
    );
}
