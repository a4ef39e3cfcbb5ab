//! Convergence polling primitives.
//!
//! Operations against the live platform (publishing a release, destroying an
//! app) take effect asynchronously relative to the CLI call that triggers
//! them. This library provides the pieces for waiting on that effect:
//!
//! - **Retry policy**: how often to look and for how long.
//! - **Clock**: where time comes from; injectable so loops are testable.
//! - **Probe**: one observation of current state, either ready or pending.
//!
//! # Invariants
//!
//! - The first probe runs immediately; an already-converged state never waits
//! - No wait extends past the policy timeout
//! - A timeout is an outcome, not a panic; the last observation is kept

mod clock;
mod poll;

pub use clock::{Clock, ManualClock, TokioClock};
pub use poll::{poll_until, ConvergenceStatus, PollReport, Probe, RetryPolicy};

use std::time::Duration;

use thiserror::Error;

/// Convergence errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvergeError {
    /// Timeout waiting for convergence.
    #[error("timeout after {elapsed:?} ({attempts} attempts) waiting for {resource}")]
    Timeout {
        resource: String,
        elapsed: Duration,
        attempts: u32,
    },

    /// The retry policy cannot be used.
    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),
}

/// Default delay between probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default overall wait.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(2 * 60); // 2 minutes
