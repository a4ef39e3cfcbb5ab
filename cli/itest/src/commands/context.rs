//! Context commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use plfm_catalog::DEFAULT_LIST_SEPARATOR;
use plfm_context::Field;
use serde::Serialize;
use tabled::Tabled;

use crate::output::print_output;

use super::CommandContext;

/// Inspect the effective context (defaults, files, and --set flags merged).
#[derive(Debug, Args)]
pub struct ContextCommand {
    #[command(subcommand)]
    command: ContextSubcommand,
}

#[derive(Debug, Subcommand)]
enum ContextSubcommand {
    /// Show every field and its value.
    Show,
}

#[derive(Debug, Serialize, Tabled)]
struct FieldRow {
    field: &'static str,
    kind: &'static str,
    value: String,
    env: String,
}

impl ContextCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ContextSubcommand::Show => show(ctx),
        }
    }
}

fn show(ctx: CommandContext) -> Result<()> {
    let rows: Vec<FieldRow> = Field::ALL
        .iter()
        .map(|field| FieldRow {
            field: field.name(),
            kind: field.kind().label(),
            value: ctx
                .context
                .get(*field)
                .map(|value| value.render(DEFAULT_LIST_SEPARATOR))
                .unwrap_or_else(|| "-".to_string()),
            env: field.env_var(),
        })
        .collect();

    print_output(&rows, ctx.format);
    Ok(())
}
