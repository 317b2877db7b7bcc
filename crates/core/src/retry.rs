// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry/backoff policy shared by the hook engine, await-signal, and
//! multi-rig operations.
//!
//! Backoff parameters appear in several places; they are centralized
//! here as one policy type so every caller computes delays the same way.

use rand::Rng;
use std::time::Duration;

/// Tracker messages that indicate a configuration problem. These are
/// fatal and must never be retried.
const CONFIG_ERROR_MARKERS: &[&str] = &[
    "not initialized",
    "no such table",
    "table not found",
    "no database",
    "connection refused",
];

/// Whether a tracker error message indicates a configuration error
/// rather than a transient condition.
pub fn is_config_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    CONFIG_ERROR_MARKERS.iter().any(|m| lower.contains(m))
}

/// Exponential backoff with bounded delay and proportional jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub base: Duration,
    /// Multiplier applied per failed attempt.
    pub mult: f64,
    /// Ceiling on any single delay.
    pub max: Duration,
    /// Jitter as a fraction of the delay (0.25 = ±25%).
    pub jitter_frac: f64,
    /// Total attempts including the first.
    pub attempts: u32,
}

impl RetryPolicy {
    /// Policy for the atomic hook update: 10 attempts,
    /// `min(500ms · 2^(n-1), 30s)`, ±25% jitter.
    pub const HOOK_UPDATE: RetryPolicy = RetryPolicy {
        base: Duration::from_millis(500),
        mult: 2.0,
        max: Duration::from_secs(30),
        jitter_frac: 0.25,
        attempts: 10,
    };

    /// Deterministic delay before retry number `attempt` (1-based; the
    /// delay after the first failure is `delay_for(1) == base`).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63);
        let scaled = self.base.as_secs_f64() * self.mult.powi(exp as i32);
        let capped = scaled.min(self.max.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// [`Self::delay_for`] with ±`jitter_frac` applied.
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        apply_jitter(self.delay_for(attempt), self.jitter_frac)
    }

    /// Timeout for an idle-backoff cycle: `min(base · mult^idle, max)`.
    ///
    /// Unlike [`Self::delay_for`], cycle 0 already yields `base`.
    pub fn backoff_timeout(&self, idle_cycles: u32) -> Duration {
        self.delay_for(idle_cycles.saturating_add(1))
    }
}

/// Apply ±`frac` proportional jitter to a duration.
pub fn apply_jitter(d: Duration, frac: f64) -> Duration {
    if frac <= 0.0 || d.is_zero() {
        return d;
    }
    let secs = d.as_secs_f64();
    let spread = secs * frac;
    let jittered = rand::rng().random_range((secs - spread)..=(secs + spread));
    Duration::from_secs_f64(jittered.max(0.0))
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
