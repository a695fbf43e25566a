use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hls_vod::{
    DownloadOptions, DownloadOutcome, DownloadProgress, HlsDownloader, ResolutionPreference,
    format_bytes,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::parse_header;
use crate::config::AppConfig;

/// Conventional exit status for a run stopped by SIGINT.
const EXIT_PAUSED: u8 = 130;

pub struct DownloadRequest {
    pub url: String,
    pub output: PathBuf,
    pub resolution: Option<String>,
    pub workers: Option<usize>,
    pub headers: Vec<String>,
    pub proxy: Option<String>,
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.blue} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    pb.set_message("Resolving playlist...");
    pb
}

fn build_options(
    config: &AppConfig,
    request: &DownloadRequest,
    token: CancellationToken,
    pb: &ProgressBar,
) -> DownloadOptions {
    let resolution = request
        .resolution
        .as_deref()
        .unwrap_or(&config.download.preferred_resolution);

    let sink = {
        let pb = pb.clone();
        move |p: &DownloadProgress| {
            pb.set_length(p.total_segments as u64);
            pb.set_position(p.completed_segments as u64);
            pb.set_message(format!(
                "{} | {}",
                format_bytes(p.total_bytes as f64),
                p.speed_label()
            ));
        }
    };

    let mut options = DownloadOptions::new(token)
        .with_resolution(ResolutionPreference::parse(resolution))
        .with_progress(Arc::new(sink));

    for (name, value) in &config.download.headers {
        options = options.with_header(name, value);
    }
    for raw in &request.headers {
        match parse_header(raw) {
            Some((name, value)) => options = options.with_header(name, value),
            None => warn!(header = %raw, "Ignoring malformed header, expected `Name: value`"),
        }
    }
    options
}

pub async fn run(config: &AppConfig, request: DownloadRequest, quiet: bool) -> Result<ExitCode> {
    let hls_config = config
        .download
        .to_hls_config(request.workers, request.proxy.as_deref());
    let downloader = HlsDownloader::new(hls_config).context("failed to create downloader")?;

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, pausing download");
            interrupt.cancel();
        }
    });

    let pb = progress_bar(quiet);
    let options = build_options(config, &request, token, &pb);

    info!(url = %request.url, output = %request.output.display(), "Starting download");
    let outcome = downloader
        .run(&request.url, &request.output, &options)
        .await;
    pb.finish_and_clear();

    Ok(match outcome {
        DownloadOutcome::Completed(path) => {
            println!("Saved {}", path.display());
            ExitCode::SUCCESS
        }
        DownloadOutcome::Paused => {
            eprintln!("Download paused; run the same command again to restart it");
            ExitCode::from(EXIT_PAUSED)
        }
        DownloadOutcome::Failed(reason) => {
            eprintln!("Download failed: {reason}");
            ExitCode::FAILURE
        }
    })
}
