//! Script-execution engine: request/outcome types and the run pipeline.

pub mod classify;
pub mod command;
pub mod precheck;
pub mod runner;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::shell::ShellKind;

/// How the script source is provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Script is a file path on disk.
    File,
    /// Script is inline source text.
    Inline,
}

/// Everything needed to run one script. Immutable once built.
///
/// Exactly one of `script_path`/`inline_code` is meaningful, selected by
/// `mode`; `preparation_script_path` must be set iff `preparation_needed`.
/// The builder constructors keep those pairs in sync.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    pub mode: Option<ExecutionMode>,
    pub script_path: Option<String>,
    pub inline_code: Option<String>,
    pub arguments: Vec<String>,
    pub preparation_needed: bool,
    pub preparation_script_path: Option<String>,
}

impl ExecutionRequest {
    /// Request running a script file.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            mode: Some(ExecutionMode::File),
            script_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Request running inline source text.
    pub fn inline(code: impl Into<String>) -> Self {
        Self {
            mode: Some(ExecutionMode::Inline),
            inline_code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Arguments passed through to the script, in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    /// Run a preparation script (`.sh` sourced on POSIX, `.ps1` on Windows)
    /// before the main script, chained with `&&`.
    pub fn preparation(mut self, path: impl Into<String>) -> Self {
        self.preparation_needed = true;
        self.preparation_script_path = Some(path.into());
        self
    }
}

/// Controls how failures are surfaced to the caller.
#[derive(Debug, Clone)]
pub struct ExecutionPolicy {
    /// When true (the default), failures are raised as [`ExecuteError`];
    /// when false they come back as an unsuccessful [`ExecutionOutcome`].
    pub throw_on_failure: bool,
    /// Optional replacement (throw) or prefix (return) for the failure
    /// message. An empty string counts as unset.
    pub custom_error_message: Option<String>,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            throw_on_failure: true,
            custom_error_message: None,
        }
    }
}

impl ExecutionPolicy {
    /// Policy that reports failures in the outcome instead of raising them.
    pub fn returning() -> Self {
        Self {
            throw_on_failure: false,
            custom_error_message: None,
        }
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.custom_error_message = Some(message.into());
        self
    }

    pub(crate) fn message_override(&self) -> Option<&str> {
        self.custom_error_message
            .as_deref()
            .filter(|m| !m.is_empty())
    }
}

/// Result of one invocation. `success` holds iff `exit_code == 0` iff
/// `error` is absent.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub exit_code: i32,
    pub standard_output: String,
    pub standard_error: String,
    pub error: Option<OutcomeError>,
}

/// Failure details embedded in a returned (non-thrown) outcome.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeError {
    pub message: String,
    /// Rendered underlying failure, kept for postmortem diagnosis.
    pub cause: String,
}

/// Engine failure taxonomy. Cancellation has its own variant and is never
/// remapped into any other.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Invalid request wiring, detected before any process is spawned.
    #[error("{0}")]
    Configuration(String),

    /// The `python --version` probe failed.
    #[error("python interpreter not installed or not on PATH (exit code {exit_code})")]
    InterpreterUnavailable { exit_code: i32 },

    /// The shell process ran and exited non-zero. Both streams are kept
    /// even though the exit was unclean.
    #[error("process failed with error:\n{stderr}")]
    ProcessFailed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// Spawning or reading from the shell process failed.
    #[error("failed to run shell process: {0}")]
    Io(#[from] std::io::Error),

    /// The caller's cancellation token fired.
    #[error("execution cancelled")]
    Cancelled,

    /// Policy-level wrapper raised when `throw_on_failure` is set. The
    /// original failure stays reachable through `source()`.
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        cause: Box<ExecuteError>,
    },
}

impl ExecuteError {
    /// Best-known exit code for this failure; 0 when no main process ran.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ProcessFailed { exit_code, .. } => *exit_code,
            Self::InterpreterUnavailable { exit_code } => *exit_code,
            Self::Failed { cause, .. } => cause.exit_code(),
            _ => 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Run one script end to end: precheck the interpreter, build the shell
/// command, run it with both streams captured, then classify the result
/// per `policy`.
///
/// Cancelling `cancel` aborts every blocking stage, kills the spawned
/// process tree, and surfaces [`ExecuteError::Cancelled`] regardless of
/// the policy.
pub async fn execute_script(
    request: &ExecutionRequest,
    policy: &ExecutionPolicy,
    cancel: &CancellationToken,
) -> Result<ExecutionOutcome, ExecuteError> {
    let shell = ShellKind::detect();
    classify::classify(run_pipeline(request, shell, cancel).await, policy)
}

async fn run_pipeline(
    request: &ExecutionRequest,
    shell: ShellKind,
    cancel: &CancellationToken,
) -> Result<runner::RawExecution, ExecuteError> {
    precheck::ensure_python_available(shell, cancel).await?;
    let command = command::build_command(request, shell)?;
    runner::run_shell_command(&command, shell, cancel).await
}
