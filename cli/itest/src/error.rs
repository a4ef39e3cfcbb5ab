//! Error handling and display for the CLI.

use colored::Colorize;
use plfm_catalog::{CatalogError, ResolveError};
use plfm_context::{ContextError, Field};
use plfm_harness::{ExecError, HarnessError};
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Step failed: {0}")]
    StepFailed(String),

    #[error("Unknown output format '{0}' (expected table or json)")]
    InvalidFormat(String),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    if let Some(hint) = hint_for(err) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}

fn hint_for(err: &anyhow::Error) -> Option<String> {
    for cause in err.chain() {
        if let Some(resolve) = cause.downcast_ref::<ResolveError>() {
            return resolve_hint(resolve);
        }
        if let Some(harness) = cause.downcast_ref::<HarnessError>() {
            match harness {
                HarnessError::Resolve(resolve) => return resolve_hint(resolve),
                HarnessError::Exec(exec) => return exec_hint(exec),
                HarnessError::UnsetField(field) => return Some(set_hint(*field)),
                _ => {}
            }
        }
        if let Some(exec) = cause.downcast_ref::<ExecError>() {
            return exec_hint(exec);
        }
        if let Some(ContextError::UnknownField(_)) = cause.downcast_ref::<ContextError>() {
            let names: Vec<_> = Field::ALL.iter().map(|field| field.name()).collect();
            return Some(format!("Known fields: {}", names.join(", ")));
        }
        if let Some(CatalogError::InvalidTemplate { .. }) = cause.downcast_ref::<CatalogError>() {
            return Some("Placeholders look like {{app_name}} and must name a known field.".to_string());
        }
    }
    None
}

fn resolve_hint(err: &ResolveError) -> Option<String> {
    match err {
        ResolveError::UnknownCommand { .. } => {
            Some("Run `vt-itest catalog list` to see available commands.".to_string())
        }
        ResolveError::UnresolvedPlaceholder { field, .. } => Some(set_hint(*field)),
        ResolveError::InvalidReference(_) => None,
    }
}

fn exec_hint(err: &ExecError) -> Option<String> {
    match err {
        ExecError::CommandNotFound { .. } => {
            Some("Is the platform CLI installed and on PATH?".to_string())
        }
        ExecError::Spawn { .. } => Some("Check PLFM_ITEST_SHELL.".to_string()),
        _ => None,
    }
}

fn set_hint(field: Field) -> String {
    format!(
        "Set it with `--set {}=...` or the {} environment variable.",
        field.name(),
        field.env_var()
    )
}
