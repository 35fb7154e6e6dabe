//! Execute Python scripts through the platform shell with captured output.
//!
//! The pipeline is: availability precheck -> command construction ->
//! shell process run -> policy-driven outcome classification. Each stage
//! lives in its own module under [`execution`]; [`shell`] holds the
//! per-OS shell strategy picked once at startup.

pub mod execution;
pub mod shell;

pub use execution::{
    execute_script, ExecuteError, ExecutionMode, ExecutionOutcome, ExecutionPolicy,
    ExecutionRequest, OutcomeError,
};
pub use shell::ShellKind;
