//! Retry policy and the polling loop.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::{Clock, ConvergeError, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};

/// How often to probe and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    interval: Duration,
    timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Create a policy. The interval must be non-zero.
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, ConvergeError> {
        if interval.is_zero() {
            return Err(ConvergeError::InvalidPolicy(
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self { interval, timeout })
    }

    /// Delay between probes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Overall deadline, measured from the first probe.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// The condition holds.
    Ready(T),
    /// Not yet; carries what was observed.
    Pending(T),
}

/// Final convergence status of a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// The condition held before the deadline.
    Converged,

    /// The deadline passed first.
    TimedOut,
}

impl ConvergenceStatus {
    /// Returns true if the condition was met.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }
}

/// What a polling loop saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport<T> {
    pub status: ConvergenceStatus,
    /// Number of probes run (at least one).
    pub attempts: u32,
    /// Clock time from the first probe to the decision.
    pub elapsed: Duration,
    /// The last observation.
    pub last: T,
}

impl<T> PollReport<T> {
    /// Convert a timed-out report into an error naming `resource`.
    pub fn into_result(self, resource: &str) -> Result<Self, ConvergeError> {
        match self.status {
            ConvergenceStatus::Converged => Ok(self),
            ConvergenceStatus::TimedOut => Err(ConvergeError::Timeout {
                resource: resource.to_string(),
                elapsed: self.elapsed,
                attempts: self.attempts,
            }),
        }
    }
}

/// Run `probe` until it reports [`Probe::Ready`] or the policy times out.
///
/// The first probe runs immediately. Each probe is handed the time left
/// before the deadline and must not run past it. A probe never starts at or
/// after the deadline: when less than one interval remains, the loop sleeps
/// out the rest and reports [`ConvergenceStatus::TimedOut`].
///
/// An `Err` from the probe aborts the loop and is returned as is; callers use
/// it for conditions that retrying cannot fix.
pub async fn poll_until<C, F, Fut, T, E>(
    policy: &RetryPolicy,
    clock: &C,
    mut probe: F,
) -> Result<PollReport<T>, E>
where
    C: Clock + ?Sized,
    F: FnMut(u32, Duration) -> Fut,
    Fut: Future<Output = Result<Probe<T>, E>>,
{
    let start = clock.now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let budget = policy
            .timeout
            .saturating_sub(clock.now().saturating_duration_since(start));
        let observation = probe(attempts, budget).await?;
        let mut elapsed = clock.now().saturating_duration_since(start);

        let last = match observation {
            Probe::Ready(last) => {
                debug!(attempts, ?elapsed, "converged");
                return Ok(PollReport {
                    status: ConvergenceStatus::Converged,
                    attempts,
                    elapsed,
                    last,
                });
            }
            Probe::Pending(last) => last,
        };

        let remaining = policy.timeout.saturating_sub(elapsed);
        if remaining <= policy.interval {
            if !remaining.is_zero() {
                clock.sleep(remaining).await;
                elapsed = clock.now().saturating_duration_since(start);
            }
            debug!(attempts, ?elapsed, "gave up waiting for convergence");
            return Ok(PollReport {
                status: ConvergenceStatus::TimedOut,
                attempts,
                elapsed,
                last,
            });
        }

        debug!(attempts, ?elapsed, "not converged yet");
        clock.sleep(policy.interval).await;
    }
}
