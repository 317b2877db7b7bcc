//! Behavioral specifications for the gt CLI.
//!
//! These tests are black-box: they invoke the CLI binary and verify
//! stdout, stderr, and exit codes. External binaries (bd, tmux) are
//! stubbed or skipped; the engine's semantics are covered by unit tests
//! inside the crates.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/errors.rs"]
mod cli_errors;
#[path = "specs/cli/help.rs"]
mod cli_help;

// town/
#[path = "specs/town/warrants.rs"]
mod town_warrants;

// dispatch/
#[path = "specs/dispatch/nudge.rs"]
mod dispatch_nudge;
#[path = "specs/dispatch/sling.rs"]
mod dispatch_sling;

// patrol/
#[path = "specs/patrol/await_signal.rs"]
mod patrol_await_signal;
