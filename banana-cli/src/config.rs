use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use hls_vod::{HlsConfig, ProxyConfig};
use metadata_merge::FieldSources;
use serde::{Deserialize, Serialize};
use tracing::debug;

const CONFIG_DIR_NAME: &str = "banana";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_dir: Option<PathBuf>,
    pub download: DownloadSection,
    pub scrape: ScrapeSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSection {
    pub max_workers: usize,
    pub preferred_resolution: String,
    /// Falls back to `FFMPEG_PATH`, then `ffmpeg` on `PATH`
    pub ffmpeg_path: Option<String>,
    pub timeout_secs: u64,
    pub proxy: Option<String>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            max_workers: 16,
            preferred_resolution: "best".to_string(),
            ffmpeg_path: None,
            timeout_secs: 10,
            proxy: None,
            proxy_username: None,
            proxy_password: None,
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSection {
    /// Field key -> ordered source names. An empty list disables the field.
    pub field_sources: FieldSources,
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load `path`, or the default location. A missing default file yields defaults;
    /// a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                anyhow::bail!("config file not found: {}", path.display());
            }
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

impl DownloadSection {
    pub fn to_hls_config(&self, workers: Option<usize>, proxy: Option<&str>) -> HlsConfig {
        let mut config = HlsConfig {
            max_workers: workers.unwrap_or(self.max_workers),
            ..Default::default()
        };
        config.base.timeout = Duration::from_secs(self.timeout_secs.max(1));

        if let Some(url) = proxy.or(self.proxy.as_deref()) {
            let mut proxy = ProxyConfig::new(url);
            if let (Some(user), Some(pass)) = (&self.proxy_username, &self.proxy_password) {
                proxy = proxy.with_auth(user, pass);
            }
            config.base.proxy = Some(proxy);
        }
        if let Some(ffmpeg) = &self.ffmpeg_path {
            config.ffmpeg_path = ffmpeg.clone();
        }
        config
    }
}
