// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polecat name allocation.
//!
//! Names come from a fixed wasteland pool and must be unique among
//! currently-live polecats in the rig (live tracker record or live tmux
//! session). Recycling happens naturally once a polecat is nuked and
//! both records are gone.

use std::collections::HashSet;

/// The name pool, in allocation order.
pub const NAME_POOL: &[&str] = &[
    "nux", "slit", "rictus", "furiosa", "capable", "toast", "cheedo", "dag", "angharad",
    "dementus", "scrotus", "morsov", "ace", "valkyrie", "keeper", "glory", "corpus",
    "praetorian", "buzzard", "jackal",
];

/// Pick the first pool name not in use; once the pool is exhausted,
/// suffix with a round number (`nux-2`, `nux-3`, ...).
pub fn allocate(in_use: &HashSet<String>) -> String {
    for name in NAME_POOL {
        if !in_use.contains(*name) {
            return (*name).to_string();
        }
    }
    for round in 2.. {
        for name in NAME_POOL {
            let candidate = format!("{}-{}", name, round);
            if !in_use.contains(&candidate) {
                return candidate;
            }
        }
    }
    unreachable!("name pool rounds are unbounded")
}
