//! Platform shell strategy: `cmd` on Windows, `/bin/bash` elsewhere.

use std::borrow::Cow;

/// Which shell dialect the command line is built for and spawned with.
///
/// Detected once per invocation and passed down, so the platform split
/// lives here instead of being re-derived at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    /// Windows `cmd`, invoked as `cmd /C <command>`.
    Cmd,
    /// POSIX `/bin/bash`, invoked as `/bin/bash -c <command>`.
    Bash,
}

impl ShellKind {
    /// Pick the shell for the current OS family.
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::Cmd
        } else {
            Self::Bash
        }
    }

    /// Program name handed to the process spawner.
    pub fn program(self) -> &'static str {
        match self {
            Self::Cmd => "cmd",
            Self::Bash => "/bin/bash",
        }
    }

    /// Flag that makes the shell treat the next argv token as a command line.
    pub fn command_flag(self) -> &'static str {
        match self {
            Self::Cmd => "/C",
            Self::Bash => "-c",
        }
    }

    pub fn is_windows(self) -> bool {
        matches!(self, Self::Cmd)
    }

    /// Quote a single token so the shell passes it through verbatim.
    ///
    /// Bash quoting is delegated to `shell-escape`; for `cmd` we wrap in
    /// double quotes when the token contains whitespace or metacharacters,
    /// doubling embedded quotes.
    pub fn quote_arg<'a>(self, arg: &'a str) -> Cow<'a, str> {
        match self {
            Self::Bash => shell_escape::unix::escape(Cow::Borrowed(arg)),
            Self::Cmd => {
                let needs_quoting = arg.is_empty()
                    || arg
                        .chars()
                        .any(|c| c.is_whitespace() || "&|<>^%;\"".contains(c));
                if needs_quoting {
                    Cow::Owned(format!("\"{}\"", arg.replace('"', "\"\"")))
                } else {
                    Cow::Borrowed(arg)
                }
            }
        }
    }
}
