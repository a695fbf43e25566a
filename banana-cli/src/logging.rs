use std::path::Path;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "banana.log";

fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    }
}

/// Install the global subscriber: console output, plus a daily-rotated file when
/// `log_dir` is set. Keep the returned guard alive until exit so buffered file
/// logs are flushed.
pub fn init_logging(verbose: bool, quiet: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let console = fmt::layer()
        .with_target(false)
        .with_level(verbose)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(console)
        .with(file_layer)
        .try_init()
        .context("failed to set global default subscriber")?;

    Ok(guard)
}
