// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    mayor = { "mayor", Role::Mayor },
    deacon = { "deacon", Role::Deacon },
    witness = { "witness", Role::Witness },
    refinery = { "refinery", Role::Refinery },
    polecat = { "polecat", Role::Polecat },
    crew = { "crew", Role::Crew },
    dog = { "dog", Role::Dog },
    garbage = { "warboy", Role::Unknown },
)]
fn role_parsing(input: &str, expected: Role) {
    let role: Role = input.parse().unwrap();
    assert_eq!(role, expected);
}

#[test]
fn singleton_classification() {
    assert!(Role::Mayor.is_town_singleton());
    assert!(Role::Deacon.is_town_singleton());
    assert!(Role::Witness.is_rig_singleton());
    assert!(Role::Refinery.is_rig_singleton());
    assert!(!Role::Polecat.is_town_singleton());
    assert!(!Role::Polecat.is_rig_singleton());
}

#[test]
fn actor_strings() {
    assert_eq!(RoleContext::mayor().actor(), "mayor");
    assert_eq!(RoleContext::witness("gastown").actor(), "gastown/witness");
    assert_eq!(
        RoleContext::polecat("gastown", "nux").actor(),
        "gastown/polecats/nux"
    );
    assert_eq!(
        RoleContext::crew("gastown", "max").actor(),
        "gastown/crew/max"
    );
    assert_eq!(RoleContext::dog("rex").actor(), "deacon/dogs/rex");
}

#[test]
fn parse_enforces_required_fields() {
    assert!(matches!(
        RoleContext::parse("witness", None, None),
        Err(RoleContextError::MissingRig(Role::Witness))
    ));
    assert!(matches!(
        RoleContext::parse("polecat", Some("gastown"), None),
        Err(RoleContextError::MissingName(Role::Polecat))
    ));
    assert!(matches!(
        RoleContext::parse("dog", None, None),
        Err(RoleContextError::MissingName(Role::Dog))
    ));
    assert!(RoleContext::parse("mayor", None, None).is_ok());
}

#[test]
fn parse_builds_full_contexts() {
    let ctx = RoleContext::parse("polecat", Some("gastown"), Some("nux")).unwrap();
    assert_eq!(ctx.role(), Role::Polecat);
    assert_eq!(ctx.rig(), Some("gastown"));
    assert_eq!(ctx.name(), Some("nux"));
}

#[test]
fn unknown_role_is_an_error() {
    assert!(matches!(
        RoleContext::parse("warboy", None, None),
        Err(RoleContextError::UnknownRole(_))
    ));
}
