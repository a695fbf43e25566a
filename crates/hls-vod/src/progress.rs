use std::time::Instant;

const BYTE_PREFIXES: [&str; 5] = ["", "K", "M", "G", "T"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadStage {
    #[default]
    Downloading,
    /// Segments are on disk and the remux step is running.
    Merging,
}

/// Snapshot handed to the progress sink after every finished segment fetch.
///
/// `completed_segments` and `total_bytes` only grow within one download attempt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DownloadProgress {
    pub completed_segments: usize,
    pub total_segments: usize,
    pub total_bytes: u64,
    pub speed_bytes_per_sec: f64,
    pub stage: DownloadStage,
}

impl DownloadProgress {
    /// Human readable speed, e.g. `"1.50 MB/s"`, or `"Merging..."` during remux.
    pub fn speed_label(&self) -> String {
        match self.stage {
            DownloadStage::Merging => "Merging...".to_string(),
            DownloadStage::Downloading if self.speed_bytes_per_sec <= 0.0 => "0 B/s".to_string(),
            DownloadStage::Downloading => format!("{}/s", format_bytes(self.speed_bytes_per_sec)),
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total_segments == 0 {
            return 0.0;
        }
        self.completed_segments as f64 * 100.0 / self.total_segments as f64
    }
}

/// Receives progress snapshots. Implemented for any `Fn(&DownloadProgress)`.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: &DownloadProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&DownloadProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &DownloadProgress) {
        self(progress)
    }
}

/// Format a byte count with binary (1024) divisors: `"512.00 B"`, `"1.50 KB"`.
pub fn format_bytes(size: f64) -> String {
    let mut size = size.max(0.0);
    let mut n = 0;
    while size > 1024.0 && n < BYTE_PREFIXES.len() - 1 {
        size /= 1024.0;
        n += 1;
    }
    format!("{size:.2} {}B", BYTE_PREFIXES[n])
}

/// Average throughput since the meter was started.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpeedMeter {
    started: Instant,
}

impl SpeedMeter {
    pub(crate) fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub(crate) fn rate(&self, total_bytes: u64) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            total_bytes as f64 / elapsed
        } else {
            0.0
        }
    }
}
