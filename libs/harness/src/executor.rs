//! Running resolved commands and judging their results.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::{ExecError, HarnessError};

/// Default per-command timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How long to keep reading output after the child has exited or been killed.
pub(crate) const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Exit codes POSIX shells use for launch problems.
const EXIT_NOT_EXECUTABLE: i32 = 126;
const EXIT_NOT_FOUND: i32 = 127;

/// Executor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Shell that interprets command lines.
    pub shell: String,
    /// Flag passing the command line to the shell.
    pub shell_flag: String,
    /// Upper bound on a single command's run time.
    pub timeout: Duration,
    /// Working directory for commands (inherits the process's if unset).
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables.
    pub env: BTreeMap<String, String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            shell_flag: "-c".to_string(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            working_dir: None,
            env: BTreeMap::new(),
        }
    }
}

impl ExecutorConfig {
    /// Defaults overridden by `PLFM_ITEST_SHELL` and
    /// `PLFM_ITEST_COMMAND_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, HarnessError> {
        let mut config = Self::default();

        if let Ok(shell) = std::env::var("PLFM_ITEST_SHELL") {
            if !shell.trim().is_empty() {
                config.shell = shell;
            }
        }

        if let Ok(raw) = std::env::var("PLFM_ITEST_COMMAND_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                HarnessError::Config(format!(
                    "PLFM_ITEST_COMMAND_TIMEOUT_SECS must be a number of seconds, got '{raw}'"
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// What one invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// The resolved command line.
    pub command: String,
    /// Stdout and stderr, interleaved in arrival order.
    pub output: String,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// The process was killed for exceeding its timeout.
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl ExecutionResult {
    /// Exited zero within the timeout.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Human-readable exit status.
    pub fn status_label(&self) -> String {
        match (self.timed_out, self.exit_code) {
            (true, _) => "killed after timeout".to_string(),
            (false, Some(code)) => format!("exit {code}"),
            (false, None) => "terminated by signal".to_string(),
        }
    }
}

/// The pass condition for one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expectation {
    /// The command must fail instead of succeed.
    pub expect_failure: bool,
    /// Text the output must contain.
    pub expected_substring: Option<String>,
}

impl Expectation {
    /// Exit zero.
    pub fn success() -> Self {
        Self::default()
    }

    /// Exit non-zero.
    pub fn failure() -> Self {
        Self {
            expect_failure: true,
            expected_substring: None,
        }
    }

    /// Also require `text` in the output. Empty text adds no requirement.
    #[must_use]
    pub fn containing(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.expected_substring = (!text.is_empty()).then_some(text);
        self
    }
}

/// Why a step failed its assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Expected success, got a failing exit.
    UnexpectedFailure,
    /// Expected failure, got a zero exit.
    UnexpectedSuccess,
    /// The output lacked the expected text.
    MissingOutput { expected: String },
    /// The command ran past its timeout.
    TimedOut { timeout: Duration },
    /// A list never reached the expected membership.
    NotConverged {
        token: String,
        expect_present: bool,
        attempts: u32,
    },
    /// A capture pattern found nothing in the output.
    CaptureMissing { pattern: String },
    /// The command could not be launched.
    Fatal { reason: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::UnexpectedFailure => write!(f, "expected success, command failed"),
            FailureReason::UnexpectedSuccess => write!(f, "expected failure, command succeeded"),
            FailureReason::MissingOutput { expected } => {
                write!(f, "expected output to contain {expected:?}")
            }
            FailureReason::TimedOut { timeout } => {
                write!(f, "command did not finish within {timeout:?}")
            }
            FailureReason::NotConverged {
                token,
                expect_present,
                attempts,
            } => {
                let state = if *expect_present { "present" } else { "absent" };
                if token.is_empty() {
                    let list = if *expect_present { "non-empty" } else { "empty" };
                    write!(f, "list never became {list} after {attempts} polls")
                } else {
                    write!(f, "{token:?} never {state} in list after {attempts} polls")
                }
            }
            FailureReason::CaptureMissing { pattern } => {
                write!(f, "output did not match capture pattern {pattern:?}")
            }
            FailureReason::Fatal { reason } => write!(f, "{reason}"),
        }
    }
}

/// A step that ran but did not meet its expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub command: String,
    pub reason: FailureReason,
    /// Exit status of the (last) invocation.
    pub status: String,
    /// Output of the (last) invocation.
    pub output: String,
}

impl AssertionFailure {
    pub fn new(result: &ExecutionResult, reason: FailureReason) -> Self {
        Self {
            command: result.command.clone(),
            reason,
            status: result.status_label(),
            output: result.output.clone(),
        }
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.reason)?;
        writeln!(f, "  command: {}", self.command)?;
        writeln!(f, "  status:  {}", self.status)?;
        if self.output.trim().is_empty() {
            write!(f, "  output:  (none)")
        } else {
            writeln!(f, "  output:")?;
            let mut lines = self.output.trim_end().lines().peekable();
            while let Some(line) = lines.next() {
                write!(f, "    {line}")?;
                if lines.peek().is_some() {
                    writeln!(f)?;
                }
            }
            Ok(())
        }
    }
}

/// Result of a judged invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub result: ExecutionResult,
    pub failure: Option<AssertionFailure>,
}

impl StepOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Apply the pass policy to a finished invocation.
pub fn evaluate(
    result: &ExecutionResult,
    expectation: &Expectation,
    timeout: Duration,
) -> Option<AssertionFailure> {
    if result.timed_out {
        return Some(AssertionFailure::new(
            result,
            FailureReason::TimedOut { timeout },
        ));
    }

    let exit_ok = match (expectation.expect_failure, result.success()) {
        (false, false) => Some(FailureReason::UnexpectedFailure),
        (true, true) => Some(FailureReason::UnexpectedSuccess),
        _ => None,
    };
    if let Some(reason) = exit_ok {
        return Some(AssertionFailure::new(result, reason));
    }

    match &expectation.expected_substring {
        Some(expected) if !result.output.contains(expected.as_str()) => Some(
            AssertionFailure::new(
                result,
                FailureReason::MissingOutput {
                    expected: expected.clone(),
                },
            ),
        ),
        _ => None,
    }
}

/// Runs command lines through a shell against the live cluster.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ExecutorConfig {
        &mut self.config
    }

    /// Run `command` and judge it.
    ///
    /// `expected_substring` may be empty. Launch failures are returned as
    /// errors; everything else is an outcome.
    pub async fn run(
        &self,
        command: &str,
        expect_failure: bool,
        expected_substring: &str,
    ) -> Result<StepOutcome, ExecError> {
        let expectation = Expectation {
            expect_failure,
            expected_substring: None,
        }
        .containing(expected_substring);
        self.run_expecting(command, &expectation).await
    }

    /// Run `command` and judge it against `expectation`.
    pub async fn run_expecting(
        &self,
        command: &str,
        expectation: &Expectation,
    ) -> Result<StepOutcome, ExecError> {
        let result = self.execute(command).await?;
        let failure = evaluate(&result, expectation, self.config.timeout);

        if let Some(failure) = &failure {
            warn!(
                command = %result.command,
                status = %failure.status,
                reason = %failure.reason,
                "step assertion failed"
            );
        }

        Ok(StepOutcome { result, failure })
    }

    /// Run `command` and capture what happened, without judging it.
    pub async fn execute(&self, command: &str) -> Result<ExecutionResult, ExecError> {
        self.execute_within(command, self.config.timeout).await
    }

    /// Like [`Executor::execute`], but kill the command after `timeout`
    /// instead of the configured one.
    ///
    /// The command runs in its own process group; on timeout the whole group
    /// is killed, including anything the shell started.
    pub async fn execute_within(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecutionResult, ExecError> {
        info!(command = %command, ?timeout, "running command");

        let mut cmd = Command::new(&self.config.shell);
        cmd.arg(&self.config.shell_flag)
            .arg(command)
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| ExecError::Spawn {
            command: command.to_string(),
            shell: self.config.shell.clone(),
            message: e.to_string(),
        })?;

        let combined = Arc::new(Mutex::new(Vec::new()));
        let readers: Vec<_> = [
            child
                .stdout
                .take()
                .map(|out| tokio::spawn(pump(out, Arc::clone(&combined)))),
            child
                .stderr
                .take()
                .map(|err| tokio::spawn(pump(err, Arc::clone(&combined)))),
        ]
        .into_iter()
        .flatten()
        .collect();

        let waited = tokio::time::timeout(timeout, child.wait()).await;
        let (exit_code, timed_out) = match waited {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(e)) => {
                return Err(ExecError::Wait {
                    command: command.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                warn!(command = %command, ?timeout, "command timed out, killing");
                kill_process_group(&child);
                let _ = child.kill().await;
                (None, true)
            }
        };

        // Descendants may still hold the pipes open; keep what arrived so far.
        let drain_deadline = tokio::time::Instant::now() + OUTPUT_DRAIN_GRACE;
        for reader in readers {
            let abort = reader.abort_handle();
            if tokio::time::timeout_at(drain_deadline, reader).await.is_err() {
                abort.abort();
            }
        }

        let output = {
            let bytes = combined.lock().unwrap_or_else(|e| e.into_inner());
            String::from_utf8_lossy(&bytes).into_owned()
        };
        let elapsed = start.elapsed();

        debug!(
            command = %command,
            exit_code = ?exit_code,
            elapsed_ms = elapsed.as_millis() as u64,
            "command finished"
        );

        match exit_code {
            Some(EXIT_NOT_FOUND) => Err(ExecError::CommandNotFound {
                command: command.to_string(),
                output: output.trim().to_string(),
            }),
            Some(EXIT_NOT_EXECUTABLE) => Err(ExecError::NotExecutable {
                command: command.to_string(),
                output: output.trim().to_string(),
            }),
            _ => Ok(ExecutionResult {
                command: command.to_string(),
                output,
                exit_code,
                timed_out,
                elapsed,
            }),
        }
    }
}

/// SIGKILL the child's process group. The child leads its own group, so the
/// group id is its pid.
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!(pid, error = %e, "could not kill process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

async fn pump<R: AsyncRead + Unpin>(mut reader: R, sink: Arc<Mutex<Vec<u8>>>) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .extend_from_slice(&buf[..n]),
        }
    }
}
