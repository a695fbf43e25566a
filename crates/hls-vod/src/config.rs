use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

use crate::progress::ProgressSink;
use crate::proxy::ProxyConfig;
use crate::variant::ResolutionPreference;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Upper bound for the segment worker pool regardless of what callers ask for.
pub const MAX_WORKERS_LIMIT: usize = 128;

/// HTTP client options shared by playlist, key and segment requests.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Overall timeout for a single request
    pub timeout: Duration,

    /// Time allowed to establish a connection
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    pub user_agent: String,

    /// Headers sent with every request, before per-download headers are applied
    pub headers: HeaderMap,

    pub proxy: Option<ProxyConfig>,

    /// Accept self-signed or otherwise invalid TLS certificates.
    pub danger_accept_invalid_certs: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::get_default_headers(),
            proxy: None,
            danger_accept_invalid_certs: true,
        }
    }
}

impl DownloaderConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5,zh-CN;q=0.3,zh;q=0.2"),
        );
        default_headers
    }
}

#[derive(Debug, Clone)]
pub struct HlsConfig {
    pub base: DownloaderConfig,

    /// Segment fetches in flight at once. Clamped to `1..=MAX_WORKERS_LIMIT`.
    pub max_workers: usize,

    /// Attempts per missing segment in the post-pass retry
    pub segment_retry_attempts: u32,

    /// Fixed delay between post-pass retry attempts
    pub segment_retry_delay: Duration,

    /// Path to the ffmpeg binary used for the final remux
    pub ffmpeg_path: String,
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            base: DownloaderConfig::default(),
            max_workers: 16,
            segment_retry_attempts: 3,
            segment_retry_delay: Duration::from_secs(1),
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
        }
    }
}

impl HlsConfig {
    pub fn effective_workers(&self) -> usize {
        self.max_workers.clamp(1, MAX_WORKERS_LIMIT)
    }
}

/// Per-call inputs of a download: what quality to pick, extra request headers,
/// where progress goes and the shared cancellation signal.
#[derive(Clone, Default)]
pub struct DownloadOptions {
    pub preferred_resolution: ResolutionPreference,
    pub headers: HeaderMap,
    pub progress: Option<Arc<dyn ProgressSink>>,
    pub token: CancellationToken,
}

impl std::fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("preferred_resolution", &self.preferred_resolution)
            .field("headers", &self.headers)
            .field("progress", &self.progress.is_some())
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl DownloadOptions {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            ..Default::default()
        }
    }

    pub fn with_resolution(mut self, preference: ResolutionPreference) -> Self {
        self.preferred_resolution = preference;
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Add a request header. Invalid names or values are skipped with a warning.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "Ignoring invalid request header"),
        }
        self
    }
}
