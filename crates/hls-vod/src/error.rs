use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum HlsDownloadError {
    #[error("download cancelled")]
    Cancelled,

    #[error("no segments found in playlist `{url}`")]
    NoSegmentsFound { url: String },

    #[error("{} segment(s) still missing after {attempts} retry attempts", failed.len())]
    SegmentFetchExhausted { failed: Vec<usize>, attempts: u32 },

    #[error("remux failed with exit code {code:?}: {stderr}")]
    RemuxFailed { code: Option<i32>, stderr: String },

    #[error("failed to fetch decryption key `{uri}`: {reason}")]
    KeyFetchFailed { uri: String, reason: String },

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("playlist error: {reason}")]
    Playlist { reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl HlsDownloadError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn playlist(reason: impl Into<String>) -> Self {
        Self::Playlist {
            reason: reason.into(),
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// User-initiated stop. Callers map this to a resumable "paused" state
    /// instead of a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
