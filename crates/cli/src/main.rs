mod cli;
mod commands;
mod input;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use pdfquiz_core::config::{load_dotenv, Config};

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // stdout carries the JSON output, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let args = CliArgs::parse();
    let config = Config::for_profile(args.profile.as_deref().unwrap_or_default());
    config.log_summary();

    match &args.command {
        Command::Extract { source, pretty } => commands::extract(&config, source, *pretty).await,
        Command::Topics { source } => commands::topics(&config, source).await,
        Command::Generate {
            source,
            instruction,
            max_context_tokens,
        } => commands::generate(&config, source, instruction, *max_context_tokens).await,
    }
}
