//! vt-itest - run platform CLI commands from the integration-test catalog
//!
//! Renders catalog templates against a context, runs them with the same
//! pass/fail rules the test harness uses, and waits on list convergence.

use anyhow::Result;
use clap::Parser;

mod commands;
mod config;
mod error;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
