// HLS resource fetcher: one HTTP GET per playlist, key or segment. No retries here;
// the pipeline owns the retry policy.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::HeaderMap;
use tracing::{debug, trace, warn};

use crate::config::DownloaderConfig;
use crate::error::HlsDownloadError;
use crate::proxy::build_proxy_from_config;

#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the full body of `url`. Non-2xx responses are errors.
    async fn fetch(&self, url: &str, headers: &HeaderMap) -> Result<Bytes, HlsDownloadError>;
}

pub fn create_client(config: &DownloaderConfig) -> Result<Client, HlsDownloadError> {
    let mut builder = Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        });

    if let Some(proxy_config) = &config.proxy {
        let proxy = build_proxy_from_config(proxy_config)
            .map_err(|reason| HlsDownloadError::Configuration { reason })?;
        debug!(proxy = %proxy_config.url, "Using proxy for HLS requests");
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(HlsDownloadError::from)
}

/// reqwest-backed fetcher used outside of tests.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &DownloaderConfig) -> Result<Self, HlsDownloadError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &HeaderMap) -> Result<Bytes, HlsDownloadError> {
        let response = self.client.get(url).headers(headers.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HlsDownloadError::http_status(status, url));
        }
        let bytes = response.bytes().await?;
        trace!(url, bytes = bytes.len(), "Fetched resource");
        Ok(bytes)
    }
}

/// Fetch `url` into `path` and return the number of bytes written.
///
/// Failures and empty bodies yield 0 and leave no file behind, which is how the
/// scheduler and the retry pass classify a segment as failed.
pub(crate) async fn fetch_to_file(
    fetcher: &dyn ResourceFetcher,
    url: &str,
    headers: &HeaderMap,
    path: &Path,
) -> u64 {
    let bytes = match fetcher.fetch(url, headers).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(url, error = %e, "Segment download failed");
            return 0;
        }
    };
    if bytes.is_empty() {
        warn!(url, "Segment download returned an empty body");
        return 0;
    }
    match tokio::fs::write(path, &bytes).await {
        Ok(()) => bytes.len() as u64,
        Err(e) => {
            warn!(url, path = %path.display(), error = %e, "Failed to write segment");
            let _ = tokio::fs::remove_file(path).await;
            0
        }
    }
}
