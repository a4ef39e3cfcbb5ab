//! Reading commit messages out of a repository.

use std::path::Path;
use std::process::Command;

use chrono::NaiveDate;
use tracing::debug;

use crate::{CommitMessage, LintError};

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// `git log` format: hash, unit separator, raw message, record separator.
///
/// `%B` keeps the message's own line breaks; `%s` would fold a first
/// paragraph spanning several lines into one summary line.
pub const LOG_FORMAT: &str = "--format=%H%x1f%B%x1e";

/// Non-merge commits in `repo` made after `after`, newest first.
pub fn commits_after(repo: &Path, after: NaiveDate) -> Result<Vec<CommitMessage>, LintError> {
    let after = after.format("%Y-%m-%d").to_string();
    debug!(repo = %repo.display(), after = %after, "reading commit log");

    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["log", "--no-merges", LOG_FORMAT])
        .arg(format!("--after={after}"))
        .output()?;

    if !output.status.success() {
        return Err(LintError::GitLog {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let commits = parse_log(&String::from_utf8_lossy(&output.stdout));
    debug!(count = commits.len(), "read commits");
    Ok(commits)
}

/// Split `git log` output produced with [`LOG_FORMAT`].
pub fn parse_log(raw: &str) -> Vec<CommitMessage> {
    raw.split(RECORD_SEP)
        .map(|record| record.trim_start_matches(['\n', '\r']))
        .filter(|record| !record.trim().is_empty())
        .map(|record| match record.split_once(FIELD_SEP) {
            Some((hash, text)) => CommitMessage::with_hash(hash.trim(), text.trim_end()),
            None => CommitMessage::new(record.trim_end()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records() {
        let raw = "aaa\x1ffix(a): one\n\x1e\nbbb\x1ffeat(b): two\nbody line\n\n    code\n\x1e\n";
        let commits = parse_log(raw);
        assert_eq!(
            commits,
            vec![
                CommitMessage::with_hash("aaa", "fix(a): one"),
                CommitMessage::with_hash("bbb", "feat(b): two\nbody line\n\n    code"),
            ]
        );
    }

    #[test]
    fn empty_log() {
        assert!(parse_log("").is_empty());
        assert!(parse_log("\n").is_empty());
    }
}
