// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gt-adapters: subprocess adapters for the external collaborators.
//!
//! The tracker (`bd`), the terminal multiplexer (`tmux`), and `git` are
//! all reached through traits defined here, each with a production
//! implementation that shells out and a recording fake for tests.

pub mod git;
pub mod session;
pub mod subprocess;
pub mod tracker;

pub use git::{Git, GitCli, GitError, WorkStatus};
pub use session::{RuntimeConfig, SessionError, SessionInfo, Sessions, TmuxSessions};
pub use subprocess::run_with_timeout;
pub use tracker::{
    BdTracker, CreateOptions, ListFilter, Route, Tracker, TrackerError, UpdatePatch,
};

#[cfg(any(test, feature = "test-support"))]
pub use git::{FakeGit, GitCall};
#[cfg(any(test, feature = "test-support"))]
pub use session::{FakeSession, FakeSessions, SessionCall};
#[cfg(any(test, feature = "test-support"))]
pub use tracker::{FakeTracker, TrackerCall};
