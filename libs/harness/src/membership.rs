//! Eventually-consistent list membership checks.

use std::time::Duration;

use async_trait::async_trait;
use plfm_converge::{poll_until, Clock, ConvergenceStatus, Probe, RetryPolicy};
use tracing::{debug, warn};

use crate::executor::{
    AssertionFailure, ExecutionResult, Executor, FailureReason, OUTPUT_DRAIN_GRACE,
};
use crate::ExecError;

/// Something that can run a list command.
#[async_trait]
pub trait ListSource: Send + Sync {
    /// Run `command`, giving up after `budget`.
    async fn list(&self, command: &str, budget: Duration) -> Result<ExecutionResult, ExecError>;
}

#[async_trait]
impl ListSource for Executor {
    async fn list(&self, command: &str, budget: Duration) -> Result<ExecutionResult, ExecError> {
        self.execute_within(command, budget.min(self.config().timeout))
            .await
    }
}

/// Whether the token should be in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

impl Presence {
    pub fn from_expect_present(expect_present: bool) -> Self {
        if expect_present {
            Self::Present
        } else {
            Self::Absent
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present)
    }
}

/// How a token is found in list output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenMatch {
    /// Anywhere in the output.
    #[default]
    Substring,
    /// As a whole whitespace-separated word.
    Word,
}

impl TokenMatch {
    /// Whether `output` contains `token`. An empty token matches any
    /// non-blank output.
    pub fn matches(&self, output: &str, token: &str) -> bool {
        if token.is_empty() {
            return !output.trim().is_empty();
        }
        match self {
            TokenMatch::Substring => output.contains(token),
            TokenMatch::Word => output.split_whitespace().any(|word| word == token),
        }
    }
}

/// What a membership wait saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipOutcome {
    pub list_command: String,
    pub token: String,
    pub presence: Presence,
    pub status: ConvergenceStatus,
    pub attempts: u32,
    /// The final list invocation.
    pub last: ExecutionResult,
}

impl MembershipOutcome {
    pub fn converged(&self) -> bool {
        self.status.is_converged()
    }

    /// The assertion failure for a wait that timed out.
    pub fn failure(&self) -> Option<AssertionFailure> {
        if self.converged() {
            return None;
        }
        Some(AssertionFailure::new(
            &self.last,
            FailureReason::NotConverged {
                token: self.token.clone(),
                expect_present: self.presence.is_present(),
                attempts: self.attempts,
            },
        ))
    }
}

/// Re-runs a list command until a token shows up (or goes away).
pub struct PollingListChecker<'a> {
    source: &'a dyn ListSource,
    clock: &'a dyn Clock,
    matcher: TokenMatch,
}

impl<'a> PollingListChecker<'a> {
    pub fn new(source: &'a dyn ListSource, clock: &'a dyn Clock) -> Self {
        Self {
            source,
            clock,
            matcher: TokenMatch::default(),
        }
    }

    #[must_use]
    pub fn with_match(mut self, matcher: TokenMatch) -> Self {
        self.matcher = matcher;
        self
    }

    /// Poll `list_command` until `token`'s presence matches.
    ///
    /// A list invocation that fails or times out counts as "not yet". Only a
    /// launch failure stops the wait early. Each invocation is cut off when
    /// the policy timeout runs out, so a hanging list command cannot hold the
    /// wait past it.
    pub async fn wait_for_membership(
        &self,
        list_command: &str,
        token: &str,
        presence: Presence,
        policy: &RetryPolicy,
    ) -> Result<MembershipOutcome, ExecError> {
        let report = poll_until(policy, self.clock, |attempt, budget| async move {
            let listed = tokio::time::timeout(
                budget + OUTPUT_DRAIN_GRACE,
                self.source.list(list_command, budget),
            )
            .await;
            let result = match listed {
                Ok(result) => result?,
                Err(_) => {
                    warn!(command = %list_command, ?budget, "list command overran the wait");
                    ExecutionResult {
                        command: list_command.to_string(),
                        output: String::new(),
                        exit_code: None,
                        timed_out: true,
                        elapsed: budget + OUTPUT_DRAIN_GRACE,
                    }
                }
            };
            let met = result.success()
                && self.matcher.matches(&result.output, token) == presence.is_present();
            debug!(
                command = %list_command,
                token = %token,
                attempt,
                exit_code = ?result.exit_code,
                met,
                "polled list"
            );
            Ok::<_, ExecError>(if met {
                Probe::Ready(result)
            } else {
                Probe::Pending(result)
            })
        })
        .await?;

        Ok(MembershipOutcome {
            list_command: list_command.to_string(),
            token: token.to_string(),
            presence,
            status: report.status,
            attempts: report.attempts,
            last: report.last,
        })
    }
}
