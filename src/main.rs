mod cli;

use std::io::Write;

use anyhow::Result;
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use pyrun::execution::{self, ExecuteError, ExecutionPolicy, ExecutionRequest};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let mut request = match (&args.script, &args.code) {
        (Some(path), None) => ExecutionRequest::file(path.clone()),
        (None, Some(code)) => ExecutionRequest::inline(code.clone()),
        // clap's source group guarantees exactly one of the two.
        _ => unreachable!("clap enforces exactly one script source"),
    };
    request = request.args(args.args.clone());
    if let Some(prep) = &args.prep {
        request = request.preparation(prep.clone());
    }

    let mut policy = if args.no_throw {
        ExecutionPolicy::returning()
    } else {
        ExecutionPolicy::default()
    };
    if let Some(message) = &args.error_message {
        policy = policy.with_error_message(message.clone());
    }

    // Ctrl-C cancels the engine, which kills the child process tree
    // before we exit.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    match execution::execute_script(&request, &policy, &cancel).await {
        Ok(outcome) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print!("{}", outcome.standard_output);
                eprint!("{}", outcome.standard_error);
                if let Some(error) = &outcome.error {
                    if std::io::stderr().is_terminal() {
                        eprintln!("{} {}", "failed:".red().bold(), error.message);
                    } else {
                        eprintln!("failed: {}", error.message);
                    }
                }
            }
            std::io::stdout().flush()?;
            std::io::stderr().flush()?;
            std::process::exit(outcome.exit_code);
        }
        Err(ExecuteError::Cancelled) => {
            eprintln!("cancelled");
            // Conventional exit status for interrupt.
            std::process::exit(130);
        }
        Err(error) => Err(error.into()),
    }
}
