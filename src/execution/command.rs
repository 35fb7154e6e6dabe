//! Builds the single shell command line for a request. Purely textual,
//! no file-system or process side effects.

use super::{ExecuteError, ExecutionMode, ExecutionRequest};
use crate::shell::ShellKind;

/// Produce one command string ready for `<shell> <flag> <command>`.
///
/// The command is handed to the shell as a real argv token, so no outer
/// quoting of the whole chain is needed; only the inline program text is
/// quoted so the shell keeps it as a single word for `python -c`.
pub fn build_command(
    request: &ExecutionRequest,
    shell: ShellKind,
) -> Result<String, ExecuteError> {
    let python = python_invocation(request, shell)?;
    match preparation_invocation(request, shell)? {
        Some(prep) => Ok(format!("{prep} && {python}")),
        None => Ok(python),
    }
}

fn python_invocation(
    request: &ExecutionRequest,
    shell: ShellKind,
) -> Result<String, ExecuteError> {
    let mut invocation = match request.mode {
        Some(ExecutionMode::File) => {
            let path = required(request.script_path.as_deref(), "script path")?;
            format!("python {path}")
        }
        Some(ExecutionMode::Inline) => {
            let code = required(request.inline_code.as_deref(), "inline code")?;
            format!("python -c {}", quote_inline(code, shell))
        }
        None => {
            return Err(ExecuteError::Configuration(
                "execution mode must be defined".into(),
            ))
        }
    };

    for arg in &request.arguments {
        invocation.push(' ');
        invocation.push_str(&shell.quote_arg(arg));
    }
    Ok(invocation)
}

fn preparation_invocation(
    request: &ExecutionRequest,
    shell: ShellKind,
) -> Result<Option<String>, ExecuteError> {
    if !request.preparation_needed {
        return Ok(None);
    }
    let path = required(
        request.preparation_script_path.as_deref(),
        "preparation script path",
    )?;
    Ok(Some(match shell {
        ShellKind::Cmd => format!("powershell -File {path}"),
        ShellKind::Bash => format!("source '{path}'"),
    }))
}

/// Wrap inline program text in double quotes so the shell passes it to
/// `python -c` as one word. Under bash the characters that stay special
/// inside double quotes are backslash-escaped; `cmd` strips the quotes
/// without interpreting the contents.
fn quote_inline(code: &str, shell: ShellKind) -> String {
    match shell {
        ShellKind::Bash => {
            let mut escaped = String::with_capacity(code.len() + 2);
            escaped.push('"');
            for c in code.chars() {
                if matches!(c, '"' | '\\' | '$' | '`') {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped.push('"');
            escaped
        }
        ShellKind::Cmd => format!("\"{code}\""),
    }
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, ExecuteError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ExecuteError::Configuration(format!("{what} must be set"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_mode_bash() {
        let request = ExecutionRequest::file("/tmp/script.py");
        let command = build_command(&request, ShellKind::Bash).unwrap();
        assert_eq!(command, "python /tmp/script.py");
    }

    #[test]
    fn file_mode_with_arguments() {
        let request = ExecutionRequest::file("/tmp/script.py").args(["testName"]);
        let command = build_command(&request, ShellKind::Bash).unwrap();
        assert_eq!(command, "python /tmp/script.py testName");
    }

    #[test]
    fn arguments_with_spaces_are_quoted() {
        let request = ExecutionRequest::file("/tmp/script.py").args(["two words", "a;b"]);
        let bash = build_command(&request, ShellKind::Bash).unwrap();
        assert_eq!(bash, "python /tmp/script.py 'two words' 'a;b'");

        let cmd = build_command(&request, ShellKind::Cmd).unwrap();
        assert_eq!(cmd, "python /tmp/script.py \"two words\" \"a;b\"");
    }

    #[test]
    fn inline_mode_bash_wraps_code_in_quotes() {
        let request = ExecutionRequest::inline("print('Hello, World!')");
        let command = build_command(&request, ShellKind::Bash).unwrap();
        assert_eq!(command, "python -c \"print('Hello, World!')\"");
    }

    #[test]
    fn inline_mode_bash_escapes_embedded_quotes() {
        let request = ExecutionRequest::inline(r#"print("hi")"#);
        let command = build_command(&request, ShellKind::Bash).unwrap();
        assert_eq!(command, r#"python -c "print(\"hi\")""#);
    }

    #[test]
    fn inline_mode_bash_escapes_dollar_sign() {
        let request = ExecutionRequest::inline("print('$HOME')");
        let command = build_command(&request, ShellKind::Bash).unwrap();
        assert_eq!(command, "python -c \"print('\\$HOME')\"");
    }

    #[test]
    fn inline_mode_cmd_keeps_code_verbatim() {
        let request = ExecutionRequest::inline("print('Hello, World!')").args(["x"]);
        let command = build_command(&request, ShellKind::Cmd).unwrap();
        assert_eq!(command, "python -c \"print('Hello, World!')\" x");
    }

    #[test]
    fn preparation_is_chained_before_python() {
        let request = ExecutionRequest::file("/tmp/script.py").preparation("/tmp/prep.sh");
        let bash = build_command(&request, ShellKind::Bash).unwrap();
        assert_eq!(bash, "source '/tmp/prep.sh' && python /tmp/script.py");

        let request = ExecutionRequest::file("C:\\script.py").preparation("C:\\prep.ps1");
        let cmd = build_command(&request, ShellKind::Cmd).unwrap();
        assert_eq!(cmd, "powershell -File C:\\prep.ps1 && python C:\\script.py");
    }

    #[test]
    fn undefined_mode_is_a_configuration_error() {
        let request = ExecutionRequest::default();
        let err = build_command(&request, ShellKind::Bash).unwrap_err();
        assert!(matches!(err, ExecuteError::Configuration(_)));
        assert_eq!(err.to_string(), "execution mode must be defined");
    }

    #[test]
    fn missing_script_path_is_a_configuration_error() {
        let request = ExecutionRequest {
            mode: Some(ExecutionMode::File),
            ..ExecutionRequest::default()
        };
        let err = build_command(&request, ShellKind::Bash).unwrap_err();
        assert!(matches!(err, ExecuteError::Configuration(_)));
    }

    #[test]
    fn empty_preparation_path_is_a_configuration_error() {
        let mut request = ExecutionRequest::file("/tmp/script.py");
        request.preparation_needed = true;
        request.preparation_script_path = Some("  ".into());
        let err = build_command(&request, ShellKind::Bash).unwrap_err();
        assert!(matches!(err, ExecuteError::Configuration(_)));
    }
}
