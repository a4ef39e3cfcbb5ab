//! Error types for the harness.
//!
//! Only conditions that make the current scenario pointless to continue are
//! errors. Assertion mismatches are recorded as [`AssertionFailure`]s in step
//! outcomes and never surface through these types.
//!
//! [`AssertionFailure`]: crate::AssertionFailure

use plfm_catalog::ResolveError;
use plfm_context::{ContextError, Field};
use thiserror::Error;

/// Failure to run a command at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The shell could not be spawned.
    #[error("failed to launch `{command}` via {shell}: {message}")]
    Spawn {
        command: String,
        shell: String,
        message: String,
    },

    /// The shell reported the program does not exist (exit 127).
    #[error("command not found while running `{command}`: {output}")]
    CommandNotFound { command: String, output: String },

    /// The shell reported the program cannot be executed (exit 126).
    #[error("command not executable while running `{command}`: {output}")]
    NotExecutable { command: String, output: String },

    /// Waiting on the child failed.
    #[error("failed to wait for `{command}`: {message}")]
    Wait { command: String, message: String },
}

impl ExecError {
    /// Standardized reason code.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ExecError::Spawn { .. } => "spawn_failed",
            ExecError::CommandNotFound { .. } => "command_not_found",
            ExecError::NotExecutable { .. } => "not_executable",
            ExecError::Wait { .. } => "wait_failed",
        }
    }
}

/// Fatal scenario errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HarnessError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("context field '{0}' is not set")]
    UnsetField(Field),

    #[error("invalid harness configuration: {0}")]
    Config(String),
}

/// A scenario finished with failed or aborted steps.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("scenario '{scenario}' failed ({} problem(s)):\n{}", .failures.len(), .failures.join("\n"))]
pub struct ScenarioFailed {
    pub scenario: String,
    pub failures: Vec<String>,
}
