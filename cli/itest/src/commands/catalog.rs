//! Catalog commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use plfm_catalog::{CatalogEntry, CommandCatalog};
use plfm_context::Field;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_info, print_output, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Inspect and validate command catalogs.
#[derive(Debug, Args)]
pub struct CatalogCommand {
    #[command(subcommand)]
    command: CatalogSubcommand,
}

#[derive(Debug, Subcommand)]
enum CatalogSubcommand {
    /// List every command in the catalog.
    List {
        /// Only show this resource.
        #[arg(long)]
        resource: Option<String>,
    },

    /// Validate a catalog document and summarize what it references.
    Check {
        /// Document to check (defaults to the active catalog).
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct CatalogRow {
    resource: String,
    action: String,
    template: String,
    fields: String,
}

impl From<CatalogEntry<'_>> for CatalogRow {
    fn from(entry: CatalogEntry<'_>) -> Self {
        let fields: Vec<_> = entry
            .template
            .fields()
            .into_iter()
            .map(Field::name)
            .collect();
        Self {
            resource: entry.resource.to_string(),
            action: entry.action.to_string(),
            template: entry.template.source().to_string(),
            fields: fields.join(", "),
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckView {
    valid: bool,
    resources: usize,
    commands: usize,
    referenced_fields: Vec<Field>,
    /// Referenced fields with no value in the effective context.
    unset_fields: Vec<Field>,
}

impl CatalogCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            CatalogSubcommand::List { resource } => list(ctx, resource.as_deref()),
            CatalogSubcommand::Check { file } => check(ctx, file),
        }
    }
}

fn list(ctx: CommandContext, resource: Option<&str>) -> Result<()> {
    let rows: Vec<CatalogRow> = ctx
        .catalog
        .entries()
        .filter(|entry| resource.is_none_or(|wanted| entry.resource == wanted))
        .map(CatalogRow::from)
        .collect();

    print_output(&rows, ctx.format);
    Ok(())
}

fn check(ctx: CommandContext, file: Option<PathBuf>) -> Result<()> {
    let loaded;
    let catalog: &CommandCatalog = match &file {
        Some(path) => {
            loaded = CommandCatalog::from_path(path)
                .with_context(|| format!("Catalog {:?} is invalid", path))?;
            &loaded
        }
        None => &*ctx.catalog,
    };

    let summary = catalog.summary();
    let unset_fields: Vec<Field> = summary
        .referenced_fields
        .iter()
        .copied()
        .filter(|field| !ctx.context.is_set(*field))
        .collect();

    let view = CheckView {
        valid: true,
        resources: summary.resources,
        commands: summary.commands,
        referenced_fields: summary.referenced_fields.into_iter().collect(),
        unset_fields,
    };

    match ctx.format {
        OutputFormat::Json => print_single(&view),
        OutputFormat::Table => {
            print_success(&format!(
                "{} commands across {} resources; {} fields referenced",
                view.commands,
                view.resources,
                view.referenced_fields.len()
            ));
            if !view.unset_fields.is_empty() {
                let names: Vec<_> = view.unset_fields.iter().map(|f| f.name()).collect();
                print_info(&format!(
                    "Not set in the current context: {}",
                    names.join(", ")
                ));
            }
        }
    }

    Ok(())
}
