//! Fail-fast probe that the python interpreter is reachable.

use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::ExecuteError;
use crate::shell::ShellKind;

/// Run `<shell> <flag> python --version` and fail with a distinct error
/// when the interpreter is missing, before the main command is built or
/// spawned. Best-effort: the interpreter can still disappear between this
/// probe and the real run.
pub async fn ensure_python_available(
    shell: ShellKind,
    cancel: &CancellationToken,
) -> Result<(), ExecuteError> {
    let mut child = Command::new(shell.program())
        .arg(shell.command_flag())
        .arg("python --version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let waited = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        status = child.wait() => Some(status),
    };
    let status = match waited {
        Some(status) => status?,
        None => {
            let _ = child.kill().await;
            return Err(ExecuteError::Cancelled);
        }
    };

    if status.success() {
        Ok(())
    } else {
        Err(ExecuteError::InterpreterUnavailable {
            exit_code: status.code().unwrap_or(-1),
        })
    }
}
