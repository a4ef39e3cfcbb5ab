//! # plfm-context
//!
//! Scenario-local variables consumed by command templates.
//!
//! ## Design Principles
//!
//! - The set of field names is fixed (`Field`); templates can only reference
//!   names that exist here, so catalogs are validated against it at load time
//! - A context is owned by exactly one scenario and passed by reference; there
//!   is no ambient or global context
//! - Values are only ever overwritten explicitly, never reset behind the
//!   caller's back
//!
//! ## Value Kinds
//!
//! Each field has a declared kind used when parsing raw text
//! (`--set version=4`, environment defaults, TOML files):
//!
//! - `Text`: rendered verbatim
//! - `Integer`: rendered in decimal
//! - `List`: rendered joined by a caller-chosen separator

mod context;
mod error;
mod field;

pub use context::{ConfigContext, ENV_PREFIX};
pub use error::ContextError;
pub use field::{Field, FieldKind, FieldValue};
