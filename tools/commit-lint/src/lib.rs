//! # plfm-commit-lint
//!
//! Commit message style checks.
//!
//! A message passes when:
//!
//! - its summary (first line) reads `type(scope): subject`, where `type` is
//!   one of `feat`, `fix`, `docs`, `style`, `ref`, `test`, `chore` and the
//!   subject starts with a lowercase letter or digit and does not end with a
//!   period
//! - the summary is at most 50 characters
//! - every other line is at most 72 characters, unless it is indented by four
//!   spaces (code excerpts)
//!
//! Only commits made after the policy date are checked.

mod error;
pub mod git;
mod lint;

pub use error::LintError;
pub use lint::{
    CommitLinter, CommitMessage, CommitReport, CommitType, LintConfig, Violation,
    DEFAULT_MAX_LINE, DEFAULT_MAX_SUMMARY, POLICY_DATE,
};
