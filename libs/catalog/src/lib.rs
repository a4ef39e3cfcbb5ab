//! # plfm-catalog
//!
//! Turns a symbolic `resource:action` reference plus a
//! [`ConfigContext`](plfm_context::ConfigContext) into a concrete command line.
//!
//! ## Design Principles
//!
//! - The catalog is loaded once and is read-only afterwards
//! - Every placeholder is checked against the fixed field set at load time;
//!   a document naming an unknown field never loads
//! - Resolution is pure: it never mutates the context and never executes
//! - Missing commands and unset fields are errors, never empty substitutions
//!
//! ## Template Syntax
//!
//! Placeholders are field names in double braces: `{{app_name}}`. Whitespace
//! inside the braces is ignored. There are no conditionals, loops, filters,
//! or escapes; everything outside a placeholder is copied verbatim.
//!
//! ## Catalog Documents
//!
//! One table per resource, one key per action:
//!
//! ```toml
//! [releases]
//! list = "vt releases list --app={{app_name}}"
//! rollback = "vt releases rollback v{{version}} --app={{app_name}}"
//! ```

mod catalog;
mod error;
mod resolver;
mod template;

pub use catalog::{CatalogEntry, CatalogSummary, CommandCatalog, CommandRef, BUILTIN_CATALOG};
pub use error::{CatalogError, ResolveError, TemplateError};
pub use resolver::{TemplateResolver, DEFAULT_LIST_SEPARATOR};
pub use template::Template;
