mod cli;
mod commands;
mod config;
mod logging;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use crate::cli::{Args, Commands};
use crate::commands::download::DownloadRequest;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("Application error: {e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = AppConfig::load(args.config.as_deref())?;
    let log_dir = args.log_dir.as_deref().or(config.log_dir.as_deref());
    let _guard = logging::init_logging(args.verbose, args.quiet, log_dir)?;

    match args.command {
        Commands::Download {
            url,
            output,
            resolution,
            workers,
            headers,
            proxy,
        } => {
            let request = DownloadRequest {
                url,
                output,
                resolution,
                workers,
                headers,
                proxy,
            };
            commands::download::run(&config, request, args.quiet).await
        }
        Commands::Merge { input, file_stem } => {
            commands::merge::run(&config, &input, file_stem.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
