//! Spawns the shell process, drains both output streams concurrently,
//! and guarantees the child process tree is gone on every exit path.

use std::io;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::ExecuteError;
use crate::shell::ShellKind;

/// Raw result of one shell invocation, before policy classification.
/// Only produced for a clean zero exit; non-zero exits surface as
/// [`ExecuteError::ProcessFailed`] with both streams attached.
#[derive(Debug)]
pub struct RawExecution {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run `<shell> <flag> <command>` with stdout/stderr piped and captured.
///
/// The two streams are drained by concurrent tasks while waiting for
/// exit, so a process writing heavily to both cannot deadlock against a
/// full pipe buffer. Cancellation kills the process tree and returns
/// [`ExecuteError::Cancelled`]; the drop guard kills it on every other
/// early exit as well.
pub async fn run_shell_command(
    command: &str,
    shell: ShellKind,
    cancel: &CancellationToken,
) -> Result<RawExecution, ExecuteError> {
    let mut cmd = Command::new(shell.program());
    cmd.arg(shell.command_flag())
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // New process group so the kill reaches the whole tree, not just the
    // shell wrapper.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn()?;
    let mut guard = KillGuard::new(child.id());

    let mut stdout_task = spawn_drain(child.stdout.take());
    let mut stderr_task = spawn_drain(child.stderr.take());

    let waited = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        status = child.wait() => Some(status),
    };
    let status = match waited {
        Some(status) => status?,
        None => {
            guard.kill_tree();
            let _ = child.wait().await;
            stdout_task.abort();
            stderr_task.abort();
            return Err(ExecuteError::Cancelled);
        }
    };

    // The shell has exited, but a straggler holding the pipes open could
    // still block the drains, so cancellation stays in effect here too.
    let drained = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        drained = join_drains(&mut stdout_task, &mut stderr_task) => Some(drained),
    };
    let (stdout, stderr) = match drained {
        Some(drained) => drained?,
        None => {
            guard.kill_tree();
            stdout_task.abort();
            stderr_task.abort();
            return Err(ExecuteError::Cancelled);
        }
    };

    guard.disarm();

    let exit_code = status.code().unwrap_or(-1);
    if exit_code != 0 {
        return Err(ExecuteError::ProcessFailed {
            exit_code,
            stdout,
            stderr,
        });
    }

    Ok(RawExecution {
        exit_code,
        stdout,
        stderr,
    })
}

fn spawn_drain<R>(stream: Option<R>) -> JoinHandle<io::Result<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut stream) = stream else {
            return Ok(String::new());
        };
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

async fn join_drains(
    stdout_task: &mut JoinHandle<io::Result<String>>,
    stderr_task: &mut JoinHandle<io::Result<String>>,
) -> Result<(String, String), ExecuteError> {
    let (stdout, stderr) = tokio::try_join!(stdout_task, stderr_task)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok((stdout?, stderr?))
}

/// Kills the child's process tree unless disarmed, including when the
/// future is dropped mid-flight. Disarmed only after the process has
/// exited and both streams are drained.
struct KillGuard {
    pid: Option<u32>,
}

impl KillGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }

    fn disarm(&mut self) {
        self.pid = None;
    }

    fn kill_tree(&mut self) {
        if let Some(pid) = self.pid.take() {
            kill_process_tree(pid);
        }
    }
}

impl Drop for KillGuard {
    fn drop(&mut self) {
        self.kill_tree();
    }
}

/// The child is its own group leader (`process_group(0)`), so the group
/// id equals its pid and SIGKILL reaches every descendant.
#[cfg(unix)]
fn kill_process_tree(pid: u32) {
    unsafe {
        libc::killpg(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(windows)]
fn kill_process_tree(pid: u32) {
    let _ = std::process::Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .output();
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn captures_stdout_on_clean_exit() {
        let cancel = CancellationToken::new();
        let raw = run_shell_command("echo hello", ShellKind::Bash, &cancel)
            .await
            .unwrap();
        assert_eq!(raw.exit_code, 0);
        assert_eq!(raw.stdout.trim(), "hello");
        assert!(raw.stderr.is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_keeps_both_streams() {
        let cancel = CancellationToken::new();
        let err = run_shell_command(
            "echo partial && echo oops >&2 && exit 3",
            ShellKind::Bash,
            &cancel,
        )
        .await
        .unwrap_err();
        match err {
            ExecuteError::ProcessFailed {
                exit_code,
                stdout,
                stderr,
            } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stdout.trim(), "partial");
                assert_eq!(stderr.trim(), "oops");
            }
            other => panic!("expected ProcessFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn drains_both_streams_without_deadlock() {
        // Write well past the pipe buffer size on both streams.
        let cancel = CancellationToken::new();
        let raw = run_shell_command(
            "yes x | head -c 200000; yes y | head -c 200000 >&2",
            ShellKind::Bash,
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(raw.stdout.len(), 200000);
        assert_eq!(raw.stderr.len(), 200000);
    }

    #[tokio::test]
    async fn cancellation_kills_the_process_and_is_distinct() {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let err = run_shell_command("sleep 30", ShellKind::Bash, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn already_cancelled_token_returns_before_waiting() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_shell_command("sleep 30", ShellKind::Bash, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
