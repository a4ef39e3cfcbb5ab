//! Error types for catalog loading and template resolution.

use plfm_context::Field;
use thiserror::Error;

/// A template string is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// `{{` without a matching `}}`.
    #[error("unterminated placeholder at byte {offset}")]
    Unterminated { offset: usize },

    /// `{{}}` with nothing inside.
    #[error("empty placeholder at byte {offset}")]
    Empty { offset: usize },

    /// The placeholder names a field that does not exist.
    #[error("unknown placeholder '{name}' at byte {offset}")]
    UnknownField { name: String, offset: usize },
}

/// A catalog document could not be loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid catalog document: {0}")]
    Parse(String),

    /// Resource or action names must be non-empty `[a-z0-9_-]`.
    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    #[error("invalid template for {resource}:{action}: {source}")]
    InvalidTemplate {
        resource: String,
        action: String,
        #[source]
        source: TemplateError,
    },
}

/// A command could not be resolved against a context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No template registered for this (resource, action).
    #[error("unknown command {resource}:{action}")]
    UnknownCommand { resource: String, action: String },

    /// A `resource:action` reference could not be parsed.
    #[error("invalid command reference '{0}': expected RESOURCE:ACTION")]
    InvalidReference(String),

    /// The template references a field that is not set in the context.
    #[error("unresolved placeholder '{field}' in template: {template}")]
    UnresolvedPlaceholder { field: Field, template: String },
}

impl ResolveError {
    /// The missing field, for unresolved-placeholder errors.
    pub fn missing_field(&self) -> Option<Field> {
        match self {
            ResolveError::UnresolvedPlaceholder { field, .. } => Some(*field),
            _ => None,
        }
    }
}
