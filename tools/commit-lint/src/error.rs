use thiserror::Error;

/// Errors that stop a lint run before any message is judged.
#[derive(Debug, Error)]
pub enum LintError {
    #[error("failed to run git: {0}")]
    GitSpawn(#[from] std::io::Error),

    #[error("git log failed ({status}): {stderr}")]
    GitLog { status: String, stderr: String },

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid summary pattern: {0}")]
    Pattern(#[from] regex::Error),
}
