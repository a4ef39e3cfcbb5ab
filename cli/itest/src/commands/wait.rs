//! Wait command.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use plfm_catalog::DEFAULT_LIST_SEPARATOR;
use plfm_context::Field;
use plfm_converge::{RetryPolicy, TokioClock};
use plfm_harness::{Executor, HarnessError, PollingListChecker, Presence, TokenMatch};
use serde::Serialize;

use crate::error::CliError;
use crate::output::{print_single, print_success, OutputFormat};

use super::CommandContext;

/// Poll a list command until a token appears (or disappears).
#[derive(Debug, Args)]
pub struct WaitCommand {
    /// Resource table, e.g. `releases`.
    resource: String,

    /// Action key of a list command, e.g. `list`.
    action: String,

    /// Token to look for. Empty means "any output".
    #[arg(long, conflicts_with = "field", required_unless_present = "field")]
    token: Option<String>,

    /// Look for the current value of this context field instead.
    #[arg(long)]
    field: Option<Field>,

    /// Wait until the token is gone.
    #[arg(long)]
    absent: bool,

    /// Match whole words only.
    #[arg(long)]
    word: bool,

    /// Give up after this many seconds.
    #[arg(long, value_name = "SECS", default_value_t = 120)]
    timeout: u64,

    /// Delay between polls in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 2000)]
    interval: u64,
}

#[derive(Debug, Serialize)]
struct WaitView<'a> {
    command: &'a str,
    token: &'a str,
    expect_present: bool,
    converged: bool,
    attempts: u32,
    last_output: &'a str,
}

impl WaitCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let command = ctx.render(&self.resource, &self.action)?;

        let token = match (self.token, self.field) {
            (Some(token), _) => token,
            (None, Some(field)) => ctx
                .context
                .get(field)
                .map(|value| value.render(DEFAULT_LIST_SEPARATOR))
                .ok_or(HarnessError::UnsetField(field))?,
            (None, None) => String::new(),
        };

        let policy = RetryPolicy::new(
            Duration::from_millis(self.interval),
            Duration::from_secs(self.timeout),
        )
        .context("Invalid --interval")?;
        let presence = Presence::from_expect_present(!self.absent);
        let matcher = if self.word {
            TokenMatch::Word
        } else {
            TokenMatch::Substring
        };

        let executor = Executor::new(ctx.executor.clone());
        let outcome = PollingListChecker::new(&executor, &TokioClock)
            .with_match(matcher)
            .wait_for_membership(&command, &token, presence, &policy)
            .await?;

        match ctx.format {
            OutputFormat::Json => print_single(&WaitView {
                command: &command,
                token: &token,
                expect_present: presence.is_present(),
                converged: outcome.converged(),
                attempts: outcome.attempts,
                last_output: &outcome.last.output,
            }),
            OutputFormat::Table => {
                if outcome.converged() {
                    print_success(&format!(
                        "`{command}` converged after {} poll(s)",
                        outcome.attempts
                    ));
                }
            }
        }

        match outcome.failure() {
            None => Ok(()),
            Some(failure) => Err(CliError::StepFailed(failure.to_string()).into()),
        }
    }
}
