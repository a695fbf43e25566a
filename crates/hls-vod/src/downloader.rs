// HLS VOD download pipeline: resolve playlist -> fetch keys -> scheduled segment fetch
// -> missing-file retry -> local manifest -> remux. The working directory is removed on
// every exit path, cancellation included.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::{DownloadOptions, HlsConfig};
use crate::error::HlsDownloadError;
use crate::fetcher::{HttpFetcher, ResourceFetcher, fetch_to_file};
use crate::outcome::DownloadOutcome;
use crate::playlist::{
    EncryptionKey, ResolvedPlaylist, Segment, collect_keys, localize_keys, localize_segments,
    resolve_media_playlist, write_local_manifest,
};
use crate::progress::{DownloadProgress, DownloadStage};
use crate::remux::{FfmpegRemuxer, Remuxer};
use crate::scheduler::SegmentScheduler;

/// Working directory used for one download: `<output>_temp`.
pub fn temp_dir_for(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push("_temp");
    PathBuf::from(name)
}

pub struct HlsDownloader {
    config: HlsConfig,
    fetcher: Arc<dyn ResourceFetcher>,
    remuxer: Arc<dyn Remuxer>,
}

impl HlsDownloader {
    /// Downloader backed by reqwest and the configured ffmpeg binary.
    pub fn new(config: HlsConfig) -> Result<Self, HlsDownloadError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.base)?);
        let remuxer = Arc::new(FfmpegRemuxer::new(config.ffmpeg_path.clone()));
        Ok(Self {
            config,
            fetcher,
            remuxer,
        })
    }

    pub fn with_components(
        config: HlsConfig,
        fetcher: Arc<dyn ResourceFetcher>,
        remuxer: Arc<dyn Remuxer>,
    ) -> Self {
        Self {
            config,
            fetcher,
            remuxer,
        }
    }

    pub fn config(&self) -> &HlsConfig {
        &self.config
    }

    /// Run one attempt and fold the result into a [`DownloadOutcome`].
    pub async fn run(&self, url: &str, output: &Path, options: &DownloadOptions) -> DownloadOutcome {
        let result = self.download(url, output, options).await;
        match &result {
            Ok(_) => {}
            Err(e) if e.is_cancelled() => info!(url, "Download paused"),
            Err(e) => error!(url, error = %e, "HLS download failed"),
        }
        DownloadOutcome::from(result)
    }

    /// Download the stream at `url` into the container file `output`.
    ///
    /// Returns the output path on success and `Cancelled` when the token fires at any
    /// point before completion.
    pub async fn download(
        &self,
        url: &str,
        output: &Path,
        options: &DownloadOptions,
    ) -> Result<PathBuf, HlsDownloadError> {
        let span = info_span!("hls_download", url = %url, output = %output.display());
        self.download_inner(url, output, options)
            .instrument(span)
            .await
    }

    async fn download_inner(
        &self,
        url: &str,
        output: &Path,
        options: &DownloadOptions,
    ) -> Result<PathBuf, HlsDownloadError> {
        let token = &options.token;
        let resolved = resolve_media_playlist(
            self.fetcher.as_ref(),
            url,
            &options.headers,
            options.preferred_resolution,
            token,
        )
        .await?;

        let work_dir = temp_dir_for(output);
        if tokio::fs::try_exists(&work_dir).await.unwrap_or(false) {
            debug!(dir = %work_dir.display(), "Removing stale working directory");
            tokio::fs::remove_dir_all(&work_dir).await?;
        }
        tokio::fs::create_dir_all(&work_dir).await?;

        let result = self
            .download_into(resolved, &work_dir, output, options)
            .await;

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            warn!(dir = %work_dir.display(), error = %e, "Failed to remove working directory");
        }
        result.map(|()| output.to_path_buf())
    }

    async fn download_into(
        &self,
        resolved: ResolvedPlaylist,
        work_dir: &Path,
        output: &Path,
        options: &DownloadOptions,
    ) -> Result<(), HlsDownloadError> {
        let token = &options.token;
        let ResolvedPlaylist { mut playlist, url } = resolved;

        let keys = collect_keys(&playlist, &url)?;
        self.fetch_keys(&keys, work_dir, &options.headers, token)
            .await?;
        localize_keys(&mut playlist, &url, &keys)?;
        let segments = localize_segments(&mut playlist, &url)?;

        let scheduler = SegmentScheduler::new(
            Arc::clone(&self.fetcher),
            options.headers.clone(),
            work_dir,
            self.config.effective_workers(),
        );
        let report = scheduler
            .run(&segments, token, options.progress.as_deref())
            .await?;

        if token.is_cancelled() {
            return Err(HlsDownloadError::Cancelled);
        }
        self.retry_missing(&segments, work_dir, &options.headers, token)
            .await?;

        let manifest = write_local_manifest(work_dir, &playlist).await?;

        info!(segments = segments.len(), "Merging segments");
        if let Some(sink) = options.progress.as_deref() {
            sink.on_progress(&DownloadProgress {
                completed_segments: segments.len(),
                total_segments: segments.len(),
                total_bytes: report.total_bytes,
                speed_bytes_per_sec: 0.0,
                stage: DownloadStage::Merging,
            });
        }
        if token.is_cancelled() {
            return Err(HlsDownloadError::Cancelled);
        }

        self.remuxer.remux(&manifest, output).await
    }

    async fn fetch_keys(
        &self,
        keys: &[EncryptionKey],
        work_dir: &Path,
        headers: &HeaderMap,
        token: &CancellationToken,
    ) -> Result<(), HlsDownloadError> {
        for key in keys {
            if token.is_cancelled() {
                return Err(HlsDownloadError::Cancelled);
            }
            let bytes = self
                .fetcher
                .fetch(&key.source_uri, headers)
                .await
                .map_err(|e| HlsDownloadError::KeyFetchFailed {
                    uri: key.source_uri.clone(),
                    reason: e.to_string(),
                })?;
            if bytes.is_empty() {
                return Err(HlsDownloadError::KeyFetchFailed {
                    uri: key.source_uri.clone(),
                    reason: "empty response body".to_string(),
                });
            }
            tokio::fs::write(work_dir.join(&key.local_file_name), &bytes).await?;
            debug!(key = %key.source_uri, file = %key.local_file_name, "Fetched decryption key");
        }
        Ok(())
    }

    /// Re-fetch every segment whose local file is missing or empty, serially.
    ///
    /// The scan looks at the files rather than the scheduler's failure list so that
    /// partial writes from aborted tasks are caught too.
    async fn retry_missing(
        &self,
        segments: &[Segment],
        work_dir: &Path,
        headers: &HeaderMap,
        token: &CancellationToken,
    ) -> Result<(), HlsDownloadError> {
        let missing = missing_segments(segments, work_dir).await;
        if missing.is_empty() {
            return Ok(());
        }
        warn!(count = missing.len(), "Segments missing after first pass, retrying");

        let attempts = self.config.segment_retry_attempts.max(1);
        let mut exhausted = Vec::new();
        for segment in missing {
            let path = segment.local_path(work_dir);
            let mut recovered = false;
            for attempt in 1..=attempts {
                if token.is_cancelled() {
                    return Err(HlsDownloadError::Cancelled);
                }
                if fetch_to_file(self.fetcher.as_ref(), &segment.source_uri, headers, &path).await
                    > 0
                {
                    recovered = true;
                    break;
                }
                debug!(segment = segment.sequence, attempt, "Segment retry failed");
                if attempt < attempts {
                    tokio::select! {
                        _ = token.cancelled() => return Err(HlsDownloadError::Cancelled),
                        _ = tokio::time::sleep(self.config.segment_retry_delay) => {}
                    }
                }
            }
            if !recovered {
                exhausted.push(segment.sequence);
            }
        }

        if exhausted.is_empty() {
            Ok(())
        } else {
            Err(HlsDownloadError::SegmentFetchExhausted {
                failed: exhausted,
                attempts,
            })
        }
    }
}

async fn missing_segments<'a>(segments: &'a [Segment], work_dir: &Path) -> Vec<&'a Segment> {
    let mut missing = Vec::new();
    for segment in segments {
        match tokio::fs::metadata(segment.local_path(work_dir)).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => missing.push(segment),
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_appends_suffix() {
        assert_eq!(
            temp_dir_for(Path::new("/videos/ABC-123.mp4")),
            PathBuf::from("/videos/ABC-123.mp4_temp")
        );
        assert_eq!(temp_dir_for(Path::new("out")), PathBuf::from("out_temp"));
    }

    #[tokio::test]
    async fn missing_scan_treats_empty_files_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let segments: Vec<Segment> = (0..3)
            .map(|i| Segment {
                sequence: i,
                source_uri: format!("https://example.com/{i}.ts"),
                local_file_name: crate::playlist::segment_file_name(i),
            })
            .collect();
        std::fs::write(dir.path().join("seg_00000.ts"), b"data").unwrap();
        std::fs::write(dir.path().join("seg_00001.ts"), b"").unwrap();

        let missing = missing_segments(&segments, dir.path()).await;
        let sequences: Vec<_> = missing.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }
}
