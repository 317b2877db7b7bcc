// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gt-core: Core library for the Gas Town (gt) orchestrator
//!
//! Domain types shared by the adapters, the engine, and the CLI. Everything
//! durable lives in the external tracker or on disk; the types here are
//! transient in-process copies plus the pure mapping logic between agent
//! addresses, tmux session names, tracker bead ids, and town paths.

pub mod address;
pub mod bead;
pub mod config;
pub mod event;
pub mod fields;
pub mod id;
pub mod retry;
pub mod role;
pub mod time_fmt;
pub mod town;
pub mod warrant;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use address::{AgentAddress, AddressError, PrefixMap};
pub use bead::{Bead, BeadStatus, BeadType, DepDirection, DepType, Dependency};
pub use config::{PipelineCommands, RigConfig, RigEntry, RigState, RigsFile, TownConfig};
pub use event::ActivityEvent;
pub use fields::{AttachmentFields, MergeStrategy, WorkMode};
pub use id::{
    extract_issue_id, extract_prefix, format_track_bead_id, is_standard_bead_hash,
    looks_like_bead_id, ShortId,
};
pub use retry::{is_config_error, RetryPolicy};
pub use role::{Role, RoleContext, RoleContextError};
pub use time_fmt::{format_elapsed, format_utc_now, parse_duration, unix_now};
pub use town::{find_town_root, TownError, TownPaths};
pub use warrant::Warrant;
