//! # plfm-harness
//!
//! Runs catalog commands against a live cluster and judges the results.
//!
//! ## Pieces
//!
//! - [`Executor`]: runs one command line through a shell with a bounded
//!   timeout and captures combined output
//! - [`PollingListChecker`]: re-runs a list command until a token appears or
//!   disappears
//! - [`Scenario`]: ordered steps sharing one context, with cleanup and a
//!   final report
//!
//! ## Failure Model
//!
//! A command that runs but does not behave as expected produces an
//! [`AssertionFailure`]; the scenario records it and moves on. A command that
//! cannot run at all (missing binary, missing shell, unresolvable template)
//! is a [`HarnessError`] and ends the scenario body.

mod error;
mod executor;
pub mod logging;
mod membership;
mod scenario;

pub use error::{ExecError, HarnessError, ScenarioFailed};
pub use executor::{
    evaluate, AssertionFailure, ExecutionResult, Executor, ExecutorConfig, Expectation,
    FailureReason, StepOutcome, DEFAULT_COMMAND_TIMEOUT,
};
pub use membership::{ListSource, MembershipOutcome, PollingListChecker, Presence, TokenMatch};
pub use scenario::{unique_name, Scenario, ScenarioReport, StepKind, StepRecord, StepStatus};
