use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "pyrun", about = "Run Python scripts through the platform shell", version)]
#[command(group(ArgGroup::new("source").args(["script", "code"]).required(true)))]
pub struct Cli {
    /// Path to the python script file.
    #[arg(value_name = "SCRIPT")]
    pub script: Option<String>,

    /// Inline python source to execute instead of a file.
    #[arg(short = 'c', long = "code", value_name = "CODE")]
    pub code: Option<String>,

    /// Argument passed through to the script; repeat to pass several.
    #[arg(short = 'a', long = "arg", value_name = "ARG", action = clap::ArgAction::Append)]
    pub args: Vec<String>,

    /// Preparation script run before the main script (.sh sourced on
    /// POSIX, .ps1 via powershell on Windows).
    #[arg(long = "prep", value_name = "PATH")]
    pub prep: Option<String>,

    /// Report failures in the printed outcome instead of exiting with an error.
    #[arg(long = "no-throw")]
    pub no_throw: bool,

    /// Custom message shown when the script fails.
    #[arg(long = "error-message", value_name = "MSG")]
    pub error_message: Option<String>,

    /// Print the full outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
