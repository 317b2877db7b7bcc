// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output helpers shared by the commands.

use anyhow::Result;

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render an up/down marker for session status lines.
pub fn updown(up: bool) -> &'static str {
    if up {
        "up"
    } else {
        "down"
    }
}
