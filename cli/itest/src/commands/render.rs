//! Render command.

use anyhow::Result;
use clap::Args;

use crate::output::{print_single, OutputFormat};

use super::CommandContext;

/// Print the resolved command line for a catalog entry.
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Resource table, e.g. `releases`.
    resource: String,

    /// Action key, e.g. `rollback`.
    action: String,
}

impl RenderCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let command = ctx.render(&self.resource, &self.action)?;

        match ctx.format {
            OutputFormat::Json => print_single(&serde_json::json!({
                "resource": self.resource,
                "action": self.action,
                "command": command,
            })),
            OutputFormat::Table => println!("{command}"),
        }

        Ok(())
    }
}
