//! Run command.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use plfm_harness::{Executor, Expectation, StepOutcome};
use serde::Serialize;

use crate::error::CliError;
use crate::output::{print_single, print_success, OutputFormat};

use super::CommandContext;

/// Run a catalog entry and check its result.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Resource table, e.g. `releases`.
    resource: String,

    /// Action key, e.g. `rollback`.
    action: String,

    /// The command is expected to fail.
    #[arg(long)]
    expect_failure: bool,

    /// Text the output must contain.
    #[arg(long, value_name = "TEXT")]
    expect: Option<String>,

    /// Kill the command after this many seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Debug, Serialize)]
struct RunView<'a> {
    command: &'a str,
    passed: bool,
    exit_code: Option<i32>,
    timed_out: bool,
    elapsed_ms: u64,
    output: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
}

impl RunCommand {
    pub async fn run(self, mut ctx: CommandContext) -> Result<()> {
        let command = ctx.render(&self.resource, &self.action)?;

        if let Some(secs) = self.timeout {
            ctx.executor.timeout = Duration::from_secs(secs);
        }
        let executor = Executor::new(ctx.executor.clone());

        let mut expectation = if self.expect_failure {
            Expectation::failure()
        } else {
            Expectation::success()
        };
        if let Some(text) = self.expect {
            expectation = expectation.containing(text);
        }

        let outcome = executor.run_expecting(&command, &expectation).await?;
        report(&outcome, ctx.format);

        match outcome.failure {
            None => Ok(()),
            Some(failure) => Err(CliError::StepFailed(failure.to_string()).into()),
        }
    }
}

fn report(outcome: &StepOutcome, format: OutputFormat) {
    let result = &outcome.result;
    match format {
        OutputFormat::Json => print_single(&RunView {
            command: &result.command,
            passed: outcome.passed(),
            exit_code: result.exit_code,
            timed_out: result.timed_out,
            elapsed_ms: result.elapsed.as_millis() as u64,
            output: &result.output,
            failure: outcome.failure.as_ref().map(|f| f.reason.to_string()),
        }),
        OutputFormat::Table => {
            print!("{}", result.output);
            if !result.output.is_empty() && !result.output.ends_with('\n') {
                println!();
            }
            if outcome.passed() {
                print_success(&format!(
                    "`{}` ({}, {:.1}s)",
                    result.command,
                    result.status_label(),
                    result.elapsed.as_secs_f64()
                ));
            }
        }
    }
}
