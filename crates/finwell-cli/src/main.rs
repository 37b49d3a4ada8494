mod cli;
mod commands;
mod error;
mod metadata;
mod output;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::commands::Context;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();
    let context = Context::from_cli(&cli)?;

    if matches!(cli.command, Command::Chat) {
        return commands::run_chat(&cli, &context).await;
    }

    let output = commands::run(&cli, &context).await?;
    output::render(&output, cli.format, cli.pretty)?;

    let warnings = &output.envelope.meta.warnings;
    if cli.strict && !warnings.is_empty() {
        return Err(CliError::StrictModeViolation {
            warning_count: warnings.len(),
        });
    }

    Ok(ExitCode::SUCCESS)
}
