use std::path::PathBuf;

use crate::error::HlsDownloadError;

/// Terminal state of one download attempt, as seen by a task layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The container file at this path is complete.
    Completed(PathBuf),
    /// Stopped through the cancellation token. Resumable by starting a new attempt.
    Paused,
    /// Any other terminal error, carrying its message.
    Failed(String),
}

impl DownloadOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }
}

impl From<Result<PathBuf, HlsDownloadError>> for DownloadOutcome {
    fn from(result: Result<PathBuf, HlsDownloadError>) -> Self {
        match result {
            Ok(path) => Self::Completed(path),
            Err(e) if e.is_cancelled() => Self::Paused,
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}
