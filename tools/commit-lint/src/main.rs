use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use colored::Colorize;
use plfm_commit_lint::{
    git, CommitLinter, CommitReport, LintConfig, DEFAULT_MAX_LINE, DEFAULT_MAX_SUMMARY,
    POLICY_DATE,
};
use tracing_subscriber::EnvFilter;

/// Check commit messages against the commit style guide.
#[derive(Parser, Debug)]
#[command(name = "plfm-commit-lint")]
#[command(version, about)]
struct Args {
    /// Repository to read history from.
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Only check commits after this date (YYYY-MM-DD).
    #[arg(long, value_parser = LintConfig::parse_date, default_value_t = POLICY_DATE)]
    after: NaiveDate,

    /// Longest allowed summary line.
    #[arg(long, default_value_t = DEFAULT_MAX_SUMMARY)]
    max_summary: usize,

    /// Longest allowed body line (code excerpts excepted).
    #[arg(long, default_value_t = DEFAULT_MAX_LINE)]
    max_line: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = LintConfig::new(args.after, args.max_summary, args.max_line)?;
    let linter = CommitLinter::new(config)?;

    let commits = git::commits_after(&args.repo, config.policy_date)
        .with_context(|| format!("failed to read history of {}", args.repo.display()))?;
    let checked = commits.len();

    let failed: Vec<CommitReport> = commits
        .into_iter()
        .map(|commit| linter.lint(commit))
        .filter(|report| !report.passed())
        .collect();

    for report in &failed {
        print_report(report);
    }

    if failed.is_empty() {
        println!(
            "{} {} commits since {} follow the style guide",
            "OK:".green().bold(),
            checked,
            config.policy_date
        );
        Ok(())
    } else {
        Err(anyhow!(
            "{} of {} commits since {} violate the style guide",
            failed.len(),
            checked,
            config.policy_date
        ))
    }
}

fn print_report(report: &CommitReport) {
    let hash = report.commit.short_hash().unwrap_or("(no hash)");
    println!("{} {}", "✗".red().bold(), hash.yellow());
    for violation in &report.violations {
        println!("  - {violation}");
    }
    println!("  message:");
    for line in report.commit.text.lines() {
        println!("  | {line}");
    }
    println!();
}
