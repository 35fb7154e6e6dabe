//! Policy-driven mapping from raw execution results to an outcome or a
//! raised failure. Failure construction lives here once; the throw and
//! return branches share it.

use super::runner::RawExecution;
use super::{ExecuteError, ExecutionOutcome, ExecutionPolicy, OutcomeError};

/// Apply the throw-vs-return policy to a pipeline result.
///
/// Cancellation is passed through untouched regardless of the policy;
/// every other failure is either raised (with the custom message
/// replacing the visible one and the original kept as the source) or
/// folded into an unsuccessful outcome that keeps the streams captured
/// so far.
pub fn classify(
    raw: Result<RawExecution, ExecuteError>,
    policy: &ExecutionPolicy,
) -> Result<ExecutionOutcome, ExecuteError> {
    let error = match raw {
        Ok(raw) => {
            return Ok(ExecutionOutcome {
                success: true,
                exit_code: raw.exit_code,
                standard_output: raw.stdout,
                standard_error: raw.stderr,
                error: None,
            })
        }
        Err(ExecuteError::Cancelled) => return Err(ExecuteError::Cancelled),
        Err(error) => error,
    };

    if policy.throw_on_failure {
        let message = policy
            .message_override()
            .map(str::to_owned)
            .unwrap_or_else(|| error.to_string());
        return Err(ExecuteError::Failed {
            message,
            cause: Box::new(error),
        });
    }

    let underlying = error.to_string();
    let message = match policy.message_override() {
        Some(custom) => format!("{custom}: {underlying}"),
        None => underlying,
    };

    let (standard_output, standard_error) = match &error {
        ExecuteError::ProcessFailed { stdout, stderr, .. } => (stdout.clone(), stderr.clone()),
        _ => (String::new(), String::new()),
    };

    Ok(ExecutionOutcome {
        success: false,
        exit_code: error.exit_code(),
        standard_output,
        standard_error,
        error: Some(OutcomeError {
            message,
            cause: format!("{error:?}"),
        }),
    })
}
