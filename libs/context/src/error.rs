//! Error types for context construction.

use thiserror::Error;

/// Errors that can occur when building or populating a context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The name does not match any known field.
    #[error("unknown context field: '{0}'")]
    UnknownField(String),

    /// A raw value could not be converted to the field's kind.
    #[error("invalid value '{value}' for field '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// An assignment was not written as `field=value`.
    #[error("invalid assignment '{0}': expected FIELD=VALUE")]
    InvalidAssignment(String),

    /// A context document could not be parsed.
    #[error("invalid context document: {0}")]
    Parse(String),
}

impl ContextError {
    /// Returns true if this error names a field that does not exist.
    pub fn is_unknown_field(&self) -> bool {
        matches!(self, ContextError::UnknownField(_))
    }
}
