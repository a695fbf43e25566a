// Crawler contract: each upstream site turns a video file into zero or one result.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::CrawlResult;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("blocked by upstream: {0}")]
    Blocked(String),
    #[error("other: {0}")]
    Other(String),
}

#[async_trait]
pub trait Crawler: Send + Sync {
    /// Source name stamped on results and used in field priority lists.
    fn name(&self) -> &str;

    /// Look up metadata for `path`. `Ok(None)` is a plain miss.
    async fn crawl(&self, path: &Path) -> Result<Option<CrawlResult>, CrawlError>;
}

/// Run `crawlers` in order for one file and keep the hits.
///
/// Errors are logged and treated as misses; a failing upstream never aborts the
/// scrape of the file.
pub async fn collect_results(crawlers: &[Arc<dyn Crawler>], path: &Path) -> Vec<CrawlResult> {
    let mut results = Vec::with_capacity(crawlers.len());
    for crawler in crawlers {
        match crawler.crawl(path).await {
            Ok(Some(mut result)) => {
                if result.source.is_empty() {
                    result.source = crawler.name().to_string();
                }
                info!(
                    crawler = crawler.name(),
                    title = ?result.title,
                    url = ?result.original_url,
                    "Crawler hit"
                );
                results.push(result);
            }
            Ok(None) => debug!(crawler = crawler.name(), path = %path.display(), "Crawler miss"),
            Err(e) => warn!(
                crawler = crawler.name(),
                path = %path.display(),
                error = %e,
                "Crawler failed, treating as miss"
            ),
        }
    }
    results
}
