//! # hls-vod
//!
//! Downloads a complete (video-on-demand) HLS stream into a single container file.
//!
//! A download resolves the playlist (following one master -> media hop with
//! resolution-based variant selection), fetches encryption keys, downloads all
//! segments through a bounded worker pool, retries segments that are still missing,
//! writes a local manifest and remuxes it with ffmpeg.
//!
//! Cancellation is cooperative through a [`tokio_util::sync::CancellationToken`] and
//! always surfaces as [`HlsDownloadError::Cancelled`] (or [`DownloadOutcome::Paused`]),
//! never as a generic failure.
//!
//! ```no_run
//! use hls_vod::{DownloadOptions, HlsConfig, HlsDownloader, ResolutionPreference};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), hls_vod::HlsDownloadError> {
//! let downloader = HlsDownloader::new(HlsConfig::default())?;
//! let options = DownloadOptions::new(CancellationToken::new())
//!     .with_resolution(ResolutionPreference::parse("720p"));
//! let path = downloader
//!     .download("https://example.com/video/index.m3u8", "out.mp4".as_ref(), &options)
//!     .await?;
//! println!("saved to {}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod outcome;
pub mod playlist;
pub mod progress;
pub mod proxy;
pub mod remux;
pub mod scheduler;
pub mod variant;

pub use config::{DownloadOptions, DownloaderConfig, HlsConfig};
pub use downloader::{HlsDownloader, temp_dir_for};
pub use error::HlsDownloadError;
pub use fetcher::{HttpFetcher, ResourceFetcher};
pub use outcome::DownloadOutcome;
pub use playlist::{EncryptionKey, Segment};
pub use progress::{DownloadProgress, DownloadStage, ProgressSink, format_bytes};
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
pub use remux::{FfmpegRemuxer, Remuxer};
pub use scheduler::{SchedulerReport, SegmentScheduler};
pub use variant::{ResolutionPreference, VariantCandidate, select_variant};
