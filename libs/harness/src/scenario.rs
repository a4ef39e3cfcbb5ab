//! Scenarios: ordered steps against one context.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use plfm_catalog::{CommandCatalog, CommandRef, TemplateResolver, DEFAULT_LIST_SEPARATOR};
use plfm_context::{ConfigContext, Field, FieldValue};
use plfm_converge::{Clock, RetryPolicy, TokioClock};
use regex::Regex;
use tracing::{info, warn};
use ulid::Ulid;

use crate::executor::{AssertionFailure, Executor, Expectation, FailureReason, StepOutcome};
use crate::membership::{MembershipOutcome, PollingListChecker, Presence, TokenMatch};
use crate::{HarnessError, ScenarioFailed};

/// A resource name no other scenario will pick, e.g. `sample-01j9…`.
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", Ulid::new().to_string().to_lowercase())
}

/// Which phase a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Action,
    Wait,
    Cleanup,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepKind::Action => "action",
            StepKind::Wait => "wait",
            StepKind::Cleanup => "cleanup",
        })
    }
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Passed,
    /// Ran, but did not meet its expectation.
    Failed(AssertionFailure),
    /// Could not run at all.
    Aborted(HarnessError),
}

/// One executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub kind: StepKind,
    pub reference: CommandRef,
    /// The resolved command line, if resolution succeeded.
    pub command: Option<String>,
    pub status: StepStatus,
}

impl StepRecord {
    pub fn passed(&self) -> bool {
        matches!(self.status, StepStatus::Passed)
    }

    /// One-paragraph description of a failed step.
    pub fn describe_failure(&self) -> Option<String> {
        match &self.status {
            StepStatus::Passed => None,
            StepStatus::Failed(failure) => {
                Some(format!("[{}] {}: {failure}", self.kind, self.reference))
            }
            StepStatus::Aborted(err) => {
                Some(format!("[{}] {}: aborted: {err}", self.kind, self.reference))
            }
        }
    }
}

/// A sequence of steps sharing one [`ConfigContext`].
///
/// Steps run strictly in order and see every earlier mutation of the
/// context. Assertion failures are recorded and the scenario keeps going;
/// launch and definition errors are returned so the body can stop with `?`.
///
/// ```ignore
/// let mut scenario = Scenario::new("releases", catalog, context);
/// let body = async {
///     scenario.run("apps", "create", false, "").await?;
///     scenario.run("releases", "rollback", false, "").await?;
///     Ok::<(), HarnessError>(())
/// }
/// .await;
/// scenario.cleanup("apps", "destroy").await;
/// scenario.finish(body).into_result()?;
/// ```
pub struct Scenario<'c> {
    name: String,
    catalog: &'c CommandCatalog,
    resolver: TemplateResolver,
    context: ConfigContext,
    executor: Executor,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    token_match: TokenMatch,
    steps: Vec<StepRecord>,
}

impl<'c> Scenario<'c> {
    pub fn new(name: impl Into<String>, catalog: &'c CommandCatalog, context: ConfigContext) -> Self {
        let name = name.into();
        info!(scenario = %name, "scenario started");
        Self {
            name,
            catalog,
            resolver: TemplateResolver::default(),
            context,
            executor: Executor::default(),
            clock: Arc::new(TokioClock),
            policy: RetryPolicy::default(),
            token_match: TokenMatch::default(),
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: TemplateResolver) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_token_match(mut self, token_match: TokenMatch) -> Self {
        self.token_match = token_match;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &ConfigContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ConfigContext {
        &mut self.context
    }

    /// Shorthand for `context_mut().set(..)`.
    pub fn set(&mut self, field: Field, value: impl Into<FieldValue>) {
        self.context.set(field, value);
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Change the polling policy for later waits.
    pub fn set_policy(&mut self, policy: RetryPolicy) {
        self.policy = policy;
    }

    /// Run later commands from `dir` (e.g. inside a cloned app).
    pub fn set_working_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        info!(scenario = %self.name, dir = %dir.display(), "changing working directory");
        self.executor.config_mut().working_dir = Some(dir);
    }

    /// Resolve (resource, action) against the current context.
    pub fn render(&self, resource: &str, action: &str) -> Result<String, HarnessError> {
        Ok(self
            .catalog
            .resolve_with(&self.resolver, resource, action, &self.context)?)
    }

    /// Run (resource, action) and record the outcome.
    pub async fn run(
        &mut self,
        resource: &str,
        action: &str,
        expect_failure: bool,
        expected_substring: &str,
    ) -> Result<StepOutcome, HarnessError> {
        let expectation = Expectation {
            expect_failure,
            expected_substring: None,
        }
        .containing(expected_substring);
        self.run_expecting(resource, action, &expectation).await
    }

    /// Run (resource, action) against an explicit expectation.
    pub async fn run_expecting(
        &mut self,
        resource: &str,
        action: &str,
        expectation: &Expectation,
    ) -> Result<StepOutcome, HarnessError> {
        self.execute_step(StepKind::Action, resource, action, expectation)
            .await
    }

    /// Run (resource, action), then store a value scraped from its output.
    ///
    /// The first capture group of `pattern` is used, or the whole match if
    /// the pattern has no groups. Returns the stored value, or `None` when the
    /// step failed or nothing matched (both are recorded as failures).
    pub async fn run_and_capture(
        &mut self,
        resource: &str,
        action: &str,
        pattern: &Regex,
        field: Field,
    ) -> Result<Option<FieldValue>, HarnessError> {
        let reference = CommandRef::new(resource, action);
        let command = self.resolve_recorded(StepKind::Action, &reference)?;
        let ran = self
            .executor
            .run_expecting(&command, &Expectation::success())
            .await;
        let outcome =
            ran.map_err(|e| self.abort(StepKind::Action, &reference, Some(&command), e.into()))?;

        if let Some(failure) = outcome.failure {
            self.record(StepKind::Action, reference, Some(command), StepStatus::Failed(failure));
            return Ok(None);
        }

        let captured = pattern.captures(&outcome.result.output).and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().trim().to_string())
        });
        let Some(raw) = captured else {
            let failure = AssertionFailure::new(
                &outcome.result,
                FailureReason::CaptureMissing {
                    pattern: pattern.as_str().to_string(),
                },
            );
            warn!(scenario = %self.name, command = %command, pattern = %pattern, "capture found nothing");
            self.record(StepKind::Action, reference, Some(command), StepStatus::Failed(failure));
            return Ok(None);
        };

        let value = FieldValue::parse(field, &raw)
            .map_err(|e| self.abort(StepKind::Action, &reference, Some(&command), e.into()))?;
        info!(scenario = %self.name, field = %field, value = %raw, "captured value");
        self.context.set(field, value.clone());
        self.record(StepKind::Action, reference, Some(command), StepStatus::Passed);
        Ok(Some(value))
    }

    /// Poll (resource, action) until `token` is present or absent.
    pub async fn wait_for_token(
        &mut self,
        resource: &str,
        action: &str,
        token: &str,
        presence: Presence,
    ) -> Result<MembershipOutcome, HarnessError> {
        let reference = CommandRef::new(resource, action);
        let command = self.resolve_recorded(StepKind::Wait, &reference)?;

        let waited = PollingListChecker::new(&self.executor, self.clock.as_ref())
            .with_match(self.token_match)
            .wait_for_membership(&command, token, presence, &self.policy)
            .await;
        let outcome =
            waited.map_err(|e| self.abort(StepKind::Wait, &reference, Some(&command), e.into()))?;

        let status = match outcome.failure() {
            None => StepStatus::Passed,
            Some(failure) => {
                warn!(
                    scenario = %self.name,
                    command = %command,
                    token = %token,
                    attempts = outcome.attempts,
                    "list never converged"
                );
                StepStatus::Failed(failure)
            }
        };
        self.record(StepKind::Wait, reference, Some(command), status);
        Ok(outcome)
    }

    /// Poll (resource, action) until the current value of `field` is present
    /// or absent.
    pub async fn wait_for_field(
        &mut self,
        resource: &str,
        action: &str,
        field: Field,
        presence: Presence,
    ) -> Result<MembershipOutcome, HarnessError> {
        let token = self
            .context
            .get(field)
            .map(|value| value.render(DEFAULT_LIST_SEPARATOR));
        let Some(token) = token else {
            let reference = CommandRef::new(resource, action);
            return Err(self.abort(StepKind::Wait, &reference, None, HarnessError::UnsetField(field)));
        };
        self.wait_for_token(resource, action, &token, presence).await
    }

    /// Run a teardown step. Never fails; problems are recorded.
    pub async fn cleanup(&mut self, resource: &str, action: &str) -> Option<StepOutcome> {
        self.execute_step(StepKind::Cleanup, resource, action, &Expectation::success())
            .await
            .ok()
    }

    /// Close the scenario, folding in the body's result.
    pub fn finish(self, body: Result<(), HarnessError>) -> ScenarioReport {
        let report = ScenarioReport {
            name: self.name,
            steps: self.steps,
            fatal: body.err(),
        };
        if report.passed() {
            info!(scenario = %report.name, steps = report.steps.len(), "scenario passed");
        } else {
            warn!(
                scenario = %report.name,
                failures = report.failures().len(),
                "scenario failed"
            );
        }
        report
    }

    async fn execute_step(
        &mut self,
        kind: StepKind,
        resource: &str,
        action: &str,
        expectation: &Expectation,
    ) -> Result<StepOutcome, HarnessError> {
        let reference = CommandRef::new(resource, action);
        let command = self.resolve_recorded(kind, &reference)?;

        let ran = self.executor.run_expecting(&command, expectation).await;
        let outcome = ran.map_err(|e| self.abort(kind, &reference, Some(&command), e.into()))?;

        let status = match &outcome.failure {
            None => StepStatus::Passed,
            Some(failure) => StepStatus::Failed(failure.clone()),
        };
        self.record(kind, reference, Some(command), status);
        Ok(outcome)
    }

    fn resolve_recorded(
        &mut self,
        kind: StepKind,
        reference: &CommandRef,
    ) -> Result<String, HarnessError> {
        self.render(&reference.resource, &reference.action)
            .map_err(|e| self.abort(kind, reference, None, e))
    }

    fn abort(
        &mut self,
        kind: StepKind,
        reference: &CommandRef,
        command: Option<&str>,
        err: HarnessError,
    ) -> HarnessError {
        warn!(scenario = %self.name, step = %reference, error = %err, "step aborted");
        self.record(
            kind,
            reference.clone(),
            command.map(str::to_string),
            StepStatus::Aborted(err.clone()),
        );
        err
    }

    fn record(
        &mut self,
        kind: StepKind,
        reference: CommandRef,
        command: Option<String>,
        status: StepStatus,
    ) {
        self.steps.push(StepRecord {
            kind,
            reference,
            command,
            status,
        });
    }
}

/// Everything a finished scenario did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepRecord>,
    /// The error that stopped the body early, if any.
    pub fatal: Option<HarnessError>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.fatal.is_none() && self.steps.iter().all(StepRecord::passed)
    }

    /// Every problem, in the order it happened.
    pub fn failures(&self) -> Vec<String> {
        let mut failures: Vec<String> = self
            .steps
            .iter()
            .filter_map(StepRecord::describe_failure)
            .collect();

        // A fatal error is normally already recorded as an aborted step.
        if let Some(fatal) = &self.fatal {
            let recorded = self
                .steps
                .iter()
                .any(|step| step.status == StepStatus::Aborted(fatal.clone()));
            if !recorded {
                failures.push(format!("scenario body: {fatal}"));
            }
        }
        failures
    }

    pub fn into_result(self) -> Result<Self, ScenarioFailed> {
        if self.passed() {
            Ok(self)
        } else {
            Err(ScenarioFailed {
                failures: self.failures(),
                scenario: self.name,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use plfm_converge::ManualClock;

    use super::*;
    use crate::ExecError;

    fn catalog() -> CommandCatalog {
        CommandCatalog::from_toml_str(
            r#"
[apps]
create = "echo created {{app_name}}"
info = "echo '=== {{app_name}}'; echo 'release v{{version}}'"
fail = "echo nope {{app_name}} 1>&2; exit 1"
destroy = "echo destroyed {{app_name}}"
missing = "plfm-no-such-binary-for-tests {{app_name}}"

[releases]
list = "echo v1 v2 v{{version}}"
"#,
        )
        .unwrap()
    }

    fn context() -> ConfigContext {
        let mut ctx = ConfigContext::new();
        ctx.set(Field::AppName, "sample");
        ctx.set(Field::Version, 3);
        ctx
    }

    #[test]
    fn unique_names_differ() {
        let a = unique_name("sample");
        let b = unique_name("sample");
        assert!(a.starts_with("sample-"));
        assert_ne!(a, b);
        assert_eq!(a, a.to_lowercase());
    }

    #[tokio::test]
    async fn records_passes_and_failures_then_continues() {
        let catalog = catalog();
        let mut scenario = Scenario::new("apps", &catalog, context());

        let created = scenario.run("apps", "create", false, "sample").await.unwrap();
        assert!(created.passed());

        let failed = scenario.run("apps", "fail", false, "").await.unwrap();
        assert!(!failed.passed());

        let negated = scenario.run("apps", "fail", true, "nope").await.unwrap();
        assert!(negated.passed());

        let report = scenario.finish(Ok(()));
        assert_eq!(report.steps.len(), 3);
        assert!(!report.passed());
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("apps:fail"));
        assert!(failures[0].contains("echo nope sample"));
    }

    #[tokio::test]
    async fn unresolved_placeholder_aborts_step() {
        let catalog = catalog();
        let mut scenario = Scenario::new("apps", &catalog, ConfigContext::new());

        let err = scenario.run("apps", "create", false, "").await.unwrap_err();
        assert!(matches!(err, HarnessError::Resolve(_)));
        assert_eq!(scenario.steps().len(), 1);
        assert_eq!(scenario.steps()[0].command, None);

        let report = scenario.finish(Err(err));
        // Recorded once, not twice.
        assert_eq!(report.failures().len(), 1);
        assert!(report.into_result().is_err());
    }

    #[tokio::test]
    async fn launch_failure_is_fatal_but_cleanup_still_runs() {
        let catalog = catalog();
        let mut scenario = Scenario::new("apps", &catalog, context());

        let body = async {
            scenario.run("apps", "missing", false, "").await?;
            scenario.run("apps", "create", false, "").await?;
            Ok::<(), HarnessError>(())
        }
        .await;
        assert!(matches!(
            body,
            Err(HarnessError::Exec(ExecError::CommandNotFound { .. }))
        ));

        let cleaned = scenario.cleanup("apps", "destroy").await;
        assert!(cleaned.unwrap().passed());

        let report = scenario.finish(body);
        let kinds: Vec<_> = report.steps.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StepKind::Action, StepKind::Cleanup]);
        let err = report.into_result().unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert!(err.to_string().contains("command not found"));
    }

    #[tokio::test]
    async fn cleanup_records_resolution_errors() {
        let catalog = catalog();
        let mut scenario = Scenario::new("apps", &catalog, context());

        assert!(scenario.cleanup("apps", "unknown").await.is_none());
        let report = scenario.finish(Ok(()));
        assert!(!report.passed());
        assert_eq!(report.steps[0].kind, StepKind::Cleanup);
    }

    #[tokio::test]
    async fn capture_updates_context_for_later_steps() {
        let catalog = catalog();
        let mut ctx = context();
        ctx.set(Field::Version, 7);
        let mut scenario = Scenario::new("capture", &catalog, ctx);

        let pattern = Regex::new(r"release v(\d+)").unwrap();
        let value = scenario
            .run_and_capture("apps", "info", &pattern, Field::Version)
            .await
            .unwrap();
        assert_eq!(value, Some(FieldValue::Integer(7)));
        assert_eq!(scenario.context().get(Field::Version), Some(&FieldValue::Integer(7)));

        let missing = Regex::new(r"build (\w+)").unwrap();
        let value = scenario
            .run_and_capture("apps", "info", &missing, Field::ImageId)
            .await
            .unwrap();
        assert_eq!(value, None);

        let report = scenario.finish(Ok(()));
        assert_eq!(report.failures().len(), 1);
        assert!(report.failures()[0].contains("capture pattern"));
    }

    #[tokio::test]
    async fn capture_rejects_non_integer_for_integer_field() {
        let catalog = catalog();
        let mut scenario = Scenario::new("capture", &catalog, context());

        let pattern = Regex::new(r"=== (\w+)").unwrap();
        let err = scenario
            .run_and_capture("apps", "info", &pattern, Field::Version)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Context(_)));
    }

    #[tokio::test]
    async fn waits_on_field_value() {
        let catalog = catalog();
        let clock = Arc::new(ManualClock::new());
        let policy = RetryPolicy::new(Duration::from_millis(100), Duration::from_millis(300)).unwrap();
        let mut scenario = Scenario::new("wait", &catalog, context())
            .with_clock(clock.clone())
            .with_policy(policy)
            .with_token_match(TokenMatch::Word);

        let found = scenario
            .wait_for_token("releases", "list", "v3", Presence::Present)
            .await
            .unwrap();
        assert!(found.converged());
        assert!(clock.sleeps().is_empty());

        let absent = scenario
            .wait_for_field("releases", "list", Field::Version, Presence::Present)
            .await
            .unwrap();
        // The list shows "v3", not a bare "3".
        assert!(!absent.converged());

        let err = scenario
            .wait_for_field("releases", "list", Field::CustomDomain, Presence::Present)
            .await
            .unwrap_err();
        assert_eq!(err, HarnessError::UnsetField(Field::CustomDomain));

        let report = scenario.finish(Ok(()));
        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.failures().len(), 2);
    }

    #[tokio::test]
    async fn working_dir_applies_to_later_steps() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "in-app-dir").unwrap();
        let catalog = CommandCatalog::from_toml_str(
            "[files]\nshow = \"cat marker.txt # {{app_name}}\"\n",
        )
        .unwrap();

        let mut scenario = Scenario::new("cwd", &catalog, context());
        scenario.set_working_dir(dir.path());
        let outcome = scenario.run("files", "show", false, "in-app-dir").await.unwrap();
        assert!(outcome.passed(), "{:?}", outcome.failure);
    }
}
