use anyhow::Result;
use clap::Parser;
use dweb_common::DEFAULT_PROGRAM_NAME;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use tokio::io::BufReader;

use cli::Cli;
mod cli;
mod session;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1) Load config (env wins over files, flags win over both)
    let cfg = session::load_config(&cli)?;

    let program = std::env::args()
        .next()
        .unwrap_or_else(|| DEFAULT_PROGRAM_NAME.to_string());
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    // 2) Logging is best effort; the shell works without it
    if let Some(log_path) = session::start_logging(&cfg, cli.verbose, &program, &mut stderr) {
        tracing::info!(log = %log_path.display(), "dweb starting");
    }

    let mut shell = session::build_shell(&cfg, &cli, &program, io::stdin().is_terminal());
    let stdin = BufReader::new(tokio::io::stdin());

    match shell.run(stdin, &mut stdout, &mut stderr).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!(error = %e, "shell stopped");
            eprintln!("{program}: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
