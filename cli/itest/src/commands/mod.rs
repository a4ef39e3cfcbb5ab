//! CLI commands.

mod catalog;
mod context;
mod render;
mod run;
mod wait;

use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use plfm_catalog::CommandCatalog;
use plfm_context::ConfigContext;
use plfm_harness::{logging, ExecutorConfig};

use crate::config::{load_catalog, load_context};
use crate::output::OutputFormat;

/// Run and inspect platform CLI commands from the integration-test catalog.
#[derive(Debug, Parser)]
#[command(name = "vt-itest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Catalog document to use instead of the built-in one (TOML or YAML).
    #[arg(long, global = true, env = "PLFM_ITEST_CATALOG")]
    catalog: Option<PathBuf>,

    /// Context file (TOML) layered over saved defaults.
    #[arg(long, global = true)]
    context: Option<PathBuf>,

    /// Set a context field, e.g. `--set app_name=sample`. Repeatable.
    #[arg(long = "set", global = true, value_name = "FIELD=VALUE")]
    set: Vec<String>,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true, env = "PLFM_ITEST_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Inspect and validate command catalogs.
    Catalog(catalog::CatalogCommand),

    /// Show the effective context.
    Context(context::ContextCommand),

    /// Print the resolved command line for a catalog entry.
    Render(render::RenderCommand),

    /// Run a catalog entry and check its result.
    Run(run::RunCommand),

    /// Poll a list command until a token appears or disappears.
    Wait(wait::WaitCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        logging::init(&self.log_level, self.log_json)?;

        if let Commands::Version = self.command {
            println!("vt-itest {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        let ctx = CommandContext {
            catalog: load_catalog(self.catalog.as_deref())?,
            context: load_context(self.context.as_deref(), &self.set)?,
            executor: ExecutorConfig::from_env()?,
            format: self.format,
        };

        match self.command {
            Commands::Catalog(cmd) => cmd.run(ctx),
            Commands::Context(cmd) => cmd.run(ctx),
            Commands::Render(cmd) => cmd.run(ctx),
            Commands::Run(cmd) => cmd.run(ctx).await,
            Commands::Wait(cmd) => cmd.run(ctx).await,
            Commands::Version => Ok(()),
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub catalog: Cow<'static, CommandCatalog>,
    pub context: ConfigContext,
    pub executor: ExecutorConfig,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Resolve (resource, action) against the effective context.
    pub fn render(&self, resource: &str, action: &str) -> Result<String> {
        Ok(self.catalog.resolve(resource, action, &self.context)?)
    }
}
