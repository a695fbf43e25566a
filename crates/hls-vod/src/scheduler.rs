// HLS Segment Scheduler: runs a sliding window of at most `max_workers` segment fetches,
// tracks bytes and speed, and hands failed segments back to the pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::HlsDownloadError;
use crate::fetcher::{ResourceFetcher, fetch_to_file};
use crate::playlist::Segment;
use crate::progress::{DownloadProgress, DownloadStage, ProgressSink, SpeedMeter};

/// Result of one scheduler pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub completed: usize,
    pub total_bytes: u64,
    /// Segments whose fetch produced no data. Panicked fetch tasks are not listed
    /// here since their segment is unknown; the pipeline's file scan catches them.
    pub failed: Vec<Segment>,
}

pub struct SegmentScheduler {
    fetcher: Arc<dyn ResourceFetcher>,
    headers: Arc<HeaderMap>,
    work_dir: PathBuf,
    max_workers: usize,
}

impl SegmentScheduler {
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        headers: HeaderMap,
        work_dir: impl Into<PathBuf>,
        max_workers: usize,
    ) -> Self {
        Self {
            fetcher,
            headers: Arc::new(headers),
            work_dir: work_dir.into(),
            max_workers: max_workers.max(1),
        }
    }

    fn spawn_fetch(&self, tasks: &mut JoinSet<(usize, u64)>, index: usize, segment: &Segment) {
        let fetcher = Arc::clone(&self.fetcher);
        let headers = Arc::clone(&self.headers);
        let url = segment.source_uri.clone();
        let path = segment.local_path(&self.work_dir);
        tasks.spawn(async move {
            let written = fetch_to_file(fetcher.as_ref(), &url, &headers, &path).await;
            (index, written)
        });
    }

    /// Download `segments` into the working directory.
    ///
    /// Returns `Cancelled` as soon as the token is observed; outstanding fetches are
    /// aborted rather than awaited.
    pub async fn run(
        &self,
        segments: &[Segment],
        token: &CancellationToken,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<SchedulerReport, HlsDownloadError> {
        if token.is_cancelled() {
            return Err(HlsDownloadError::Cancelled);
        }

        info!(
            segments = segments.len(),
            workers = self.max_workers,
            "SegmentScheduler started"
        );

        let total = segments.len();
        let meter = SpeedMeter::start();
        let mut report = SchedulerReport::default();
        let mut tasks = JoinSet::new();
        let mut pending = segments.iter().enumerate();

        for (index, segment) in pending.by_ref().take(self.max_workers) {
            self.spawn_fetch(&mut tasks, index, segment);
        }

        loop {
            let joined = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!(in_flight = tasks.len(), "Cancellation observed, abandoning segment fetches");
                    abandon(&mut tasks).await;
                    return Err(HlsDownloadError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((_, written)) if written > 0 => {
                    report.completed += 1;
                    report.total_bytes += written;
                }
                Ok((index, _)) => {
                    debug!(segment = index, "Segment marked for retry");
                    report.failed.push(segments[index].clone());
                }
                Err(e) => error!(error = %e, "Segment fetch task failed"),
            }

            if token.is_cancelled() {
                abandon(&mut tasks).await;
                return Err(HlsDownloadError::Cancelled);
            }
            if let Some((index, segment)) = pending.next() {
                self.spawn_fetch(&mut tasks, index, segment);
            }

            if let Some(sink) = progress {
                sink.on_progress(&DownloadProgress {
                    completed_segments: report.completed,
                    total_segments: total,
                    total_bytes: report.total_bytes,
                    speed_bytes_per_sec: meter.rate(report.total_bytes),
                    stage: DownloadStage::Downloading,
                });
            }
        }

        info!(
            completed = report.completed,
            failed = report.failed.len(),
            bytes = report.total_bytes,
            "SegmentScheduler finished"
        );
        Ok(report)
    }
}

/// Abort outstanding fetches and wait only for the aborts to land, so no task is
/// still writing into the working directory when the caller removes it.
async fn abandon(tasks: &mut JoinSet<(usize, u64)>) {
    tasks.abort_all();
    while tasks.join_next().await.is_some() {}
}
