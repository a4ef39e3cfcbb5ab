//! Message grammar and length rules.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use regex::Regex;

use crate::LintError;

/// Commits before this date predate the style guide.
pub const POLICY_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2014, 7, 11) {
    Some(date) => date,
    None => panic!("invalid policy date"),
};

pub const DEFAULT_MAX_SUMMARY: usize = 50;
pub const DEFAULT_MAX_LINE: usize = 72;

/// Lines indented this much are code excerpts and may be long.
const CODE_INDENT: &str = "    ";

/// Allowed summary types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
    Feature,
    Fix,
    Docs,
    Formatting,
    Refactor,
    Test,
    Chore,
}

impl CommitType {
    pub const ALL: [CommitType; 7] = [
        CommitType::Feature,
        CommitType::Fix,
        CommitType::Docs,
        CommitType::Formatting,
        CommitType::Refactor,
        CommitType::Test,
        CommitType::Chore,
    ];

    /// How the type is spelled in a summary.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feature => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Formatting => "style",
            CommitType::Refactor => "ref",
            CommitType::Test => "test",
            CommitType::Chore => "chore",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or(())
    }
}

/// Policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintConfig {
    /// Only commits after this date are checked.
    pub policy_date: NaiveDate,
    pub max_summary: usize,
    pub max_line: usize,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            policy_date: POLICY_DATE,
            max_summary: DEFAULT_MAX_SUMMARY,
            max_line: DEFAULT_MAX_LINE,
        }
    }
}

impl LintConfig {
    pub fn new(policy_date: NaiveDate, max_summary: usize, max_line: usize) -> Result<Self, LintError> {
        if max_summary == 0 || max_line == 0 {
            return Err(LintError::InvalidLimit(
                "length limits must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            policy_date,
            max_summary,
            max_line,
        })
    }

    /// Parse a `YYYY-MM-DD` cutoff.
    pub fn parse_date(raw: &str) -> Result<NaiveDate, LintError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| LintError::InvalidDate(raw.to_string()))
    }
}

/// One commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    /// Commit hash, when the message came from a repository.
    pub hash: Option<String>,
    pub text: String,
}

impl CommitMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            hash: None,
            text: text.into(),
        }
    }

    pub fn with_hash(hash: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            hash: Some(hash.into()),
            text: text.into(),
        }
    }

    /// Text up to the first line break.
    pub fn summary(&self) -> &str {
        self.lines().next().unwrap_or("")
    }

    /// Abbreviated hash for display.
    pub fn short_hash(&self) -> Option<&str> {
        self.hash
            .as_deref()
            .map(|hash| hash.get(..10).unwrap_or(hash))
    }

    fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// One broken rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The summary does not read `type(scope): subject`.
    SummaryFormat { summary: String },
    SummaryTooLong { length: usize, max: usize },
    /// `line` is 1-based; the summary is line 1.
    LineTooLong { line: usize, length: usize, max: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::SummaryFormat { summary } => write!(
                f,
                "summary {summary:?} does not match `type(scope): subject` \
                 (type is one of feat, fix, docs, style, ref, test, chore; \
                 subject starts lowercase and has no trailing period)"
            ),
            Violation::SummaryTooLong { length, max } => {
                write!(f, "summary is {length} characters, limit is {max}")
            }
            Violation::LineTooLong { line, length, max } => write!(
                f,
                "line {line} is {length} characters, limit is {max} \
                 (indent code excerpts by four spaces)"
            ),
        }
    }
}

/// A message and everything wrong with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub commit: CommitMessage,
    pub violations: Vec<Violation>,
}

impl CommitReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Applies a [`LintConfig`] to messages.
#[derive(Debug, Clone)]
pub struct CommitLinter {
    config: LintConfig,
    summary: Regex,
}

impl CommitLinter {
    pub fn new(config: LintConfig) -> Result<Self, LintError> {
        let types = CommitType::ALL
            .iter()
            .map(CommitType::as_str)
            .collect::<Vec<_>>()
            .join("|");
        let summary = Regex::new(&format!(r"^({types})\(([^()]+)\): [0-9a-z](.*[^.])?$"))?;
        Ok(Self { config, summary })
    }

    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    /// Every rule `message` breaks, in line order.
    pub fn check(&self, message: &CommitMessage) -> Vec<Violation> {
        let mut violations = Vec::new();
        let summary = message.summary();

        if !self.summary.is_match(summary) {
            violations.push(Violation::SummaryFormat {
                summary: summary.to_string(),
            });
        }

        let length = summary.chars().count();
        if length > self.config.max_summary {
            violations.push(Violation::SummaryTooLong {
                length,
                max: self.config.max_summary,
            });
        }

        for (index, line) in message.lines().enumerate().skip(1) {
            if line.starts_with(CODE_INDENT) {
                continue;
            }
            let length = line.chars().count();
            if length > self.config.max_line {
                violations.push(Violation::LineTooLong {
                    line: index + 1,
                    length,
                    max: self.config.max_line,
                });
            }
        }

        violations
    }

    pub fn lint(&self, message: CommitMessage) -> CommitReport {
        let violations = self.check(&message);
        CommitReport {
            commit: message,
            violations,
        }
    }

    /// The type of a well-formed summary.
    pub fn commit_type(&self, message: &CommitMessage) -> Option<CommitType> {
        self.summary
            .captures(message.summary())
            .and_then(|caps| caps.get(1))
            .and_then(|ty| ty.as_str().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn linter() -> CommitLinter {
        CommitLinter::new(LintConfig::default()).unwrap()
    }

    #[rstest]
    #[case("fix(cache): correct eviction race")]
    #[case("feat(cli): add releases rollback")]
    #[case("docs(readme): 2 new examples")]
    #[case("style(api): x")]
    #[case("ref(scheduler): split placement loop")]
    #[case("test(e2e): cover rollback")]
    #[case("chore(deps): bump tokio")]
    fn accepts_well_formed_summaries(#[case] summary: &str) {
        assert_eq!(linter().check(&CommitMessage::new(summary)), vec![]);
    }

    #[rstest]
    #[case("Fix bug.")]
    #[case("fix(cache): correct eviction race.")]
    #[case("fix(cache): Correct eviction race")]
    #[case("fix: correct eviction race")]
    #[case("feature(cache): correct eviction race")]
    #[case("fix(cache):correct eviction race")]
    #[case("fix(): correct eviction race")]
    #[case("")]
    fn rejects_malformed_summaries(#[case] summary: &str) {
        let violations = linter().check(&CommitMessage::new(summary));
        assert_eq!(
            violations,
            vec![Violation::SummaryFormat {
                summary: summary.to_string()
            }]
        );
    }

    #[test]
    fn summary_length_limit() {
        let at_limit = format!("fix(cache): {}", "a".repeat(50 - 12));
        assert_eq!(at_limit.chars().count(), 50);
        assert!(linter().check(&CommitMessage::new(at_limit)).is_empty());

        let over = format!("fix(cache): {}", "a".repeat(51 - 12));
        assert_eq!(
            linter().check(&CommitMessage::new(over)),
            vec![Violation::SummaryTooLong { length: 51, max: 50 }]
        );
    }

    #[test]
    fn summary_length_counts_characters() {
        let summary = format!("fix(i18n): a{}", "é".repeat(38));
        assert_eq!(summary.chars().count(), 50);
        assert!(linter().check(&CommitMessage::new(summary)).is_empty());
    }

    #[test]
    fn body_lines_checked_except_code() {
        let long = "x".repeat(73);
        let message = format!(
            "fix(cache): correct eviction race\n\n{long}\n    {long}\nshort\n{long}\n"
        );
        assert_eq!(
            linter().check(&CommitMessage::new(message)),
            vec![
                Violation::LineTooLong { line: 3, length: 73, max: 72 },
                Violation::LineTooLong { line: 6, length: 73, max: 72 },
            ]
        );
    }

    #[test]
    fn all_violations_reported_together() {
        let message = format!("Fix the cache eviction race that shows up under load.\n\n{}", "y".repeat(80));
        let violations = linter().check(&CommitMessage::new(message));
        assert_eq!(violations.len(), 3);
        assert!(matches!(violations[0], Violation::SummaryFormat { .. }));
        assert!(matches!(violations[1], Violation::SummaryTooLong { .. }));
        assert!(matches!(violations[2], Violation::LineTooLong { line: 3, .. }));
    }

    #[test]
    fn custom_limits() {
        let config = LintConfig::new(POLICY_DATE, 20, 10).unwrap();
        let linter = CommitLinter::new(config).unwrap();
        let violations = linter.check(&CommitMessage::new(
            "fix(cache): correct eviction race\n\nmore than ten",
        ));
        assert_eq!(violations.len(), 2);

        assert!(LintConfig::new(POLICY_DATE, 0, 72).is_err());
    }

    #[test]
    fn crlf_summary() {
        let message = CommitMessage::new("fix(cache): correct eviction race\r\n\r\nbody");
        assert_eq!(message.summary(), "fix(cache): correct eviction race");
        assert!(linter().check(&message).is_empty());
    }

    #[test]
    fn parses_types_and_dates() {
        let message = CommitMessage::new("ref(core): tidy");
        assert_eq!(linter().commit_type(&message), Some(CommitType::Refactor));
        assert_eq!(linter().commit_type(&CommitMessage::new("oops")), None);

        assert_eq!(LintConfig::parse_date("2014-07-11").unwrap(), POLICY_DATE);
        assert!(matches!(
            LintConfig::parse_date("07/11/2014"),
            Err(LintError::InvalidDate(_))
        ));
    }

    #[test]
    fn short_hash() {
        let message = CommitMessage::with_hash("0123456789abcdef", "fix(a): b");
        assert_eq!(message.short_hash(), Some("0123456789"));
        assert_eq!(CommitMessage::with_hash("abc", "x").short_hash(), Some("abc"));
    }
}
