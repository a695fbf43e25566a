// Final remux step: stream-copy the localized playlist into one container with ffmpeg.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use process_utils::{run_command_captured, tokio_command};
use tracing::{debug, info};

use crate::error::HlsDownloadError;

#[async_trait]
pub trait Remuxer: Send + Sync {
    /// Combine the segments referenced by `manifest` into `output`, overwriting it.
    async fn remux(&self, manifest: &Path, output: &Path) -> Result<(), HlsDownloadError>;
}

/// ffmpeg-based remuxer. Streams are copied, never re-encoded.
#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    ffmpeg_path: String,
}

impl Default for FfmpegRemuxer {
    fn default() -> Self {
        Self::new(std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()))
    }
}

/// Resolve `path` against the current directory when it is relative.
fn make_absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

impl FfmpegRemuxer {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    /// `-allowed_extensions ALL` lets the demuxer open the local key files;
    /// `aac_adtstoasc` converts ADTS audio for MP4-family outputs.
    pub fn build_args(manifest: &Path, output: &Path) -> Vec<String> {
        vec![
            "-allowed_extensions".to_string(),
            "ALL".to_string(),
            "-i".to_string(),
            make_absolute(manifest).to_string_lossy().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-bsf:a".to_string(),
            "aac_adtstoasc".to_string(),
            make_absolute(output).to_string_lossy().to_string(),
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
        ]
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn remux(&self, manifest: &Path, output: &Path) -> Result<(), HlsDownloadError> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = Self::build_args(manifest, output);
        debug!(ffmpeg = %self.ffmpeg_path, ?args, "Running ffmpeg");

        let mut command = tokio_command(&self.ffmpeg_path);
        command.args(&args);
        let result = run_command_captured(&mut command).await.map_err(|e| {
            HlsDownloadError::RemuxFailed {
                code: None,
                stderr: format!("failed to run {}: {e}", self.ffmpeg_path),
            }
        })?;

        if !result.success() {
            return Err(HlsDownloadError::RemuxFailed {
                code: result.status.code(),
                stderr: result.stderr_text(),
            });
        }

        info!(
            output = %output.display(),
            duration_secs = format!("{:.2}", result.duration),
            "Remux completed"
        );
        Ok(())
    }
}
