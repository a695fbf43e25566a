use reqwest::Proxy;

/// Proxy scheme accepted by [`ProxyConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Copy, Default)]
pub enum ProxyType {
    #[default]
    Http,
    Https,
    Socks5,
}

impl ProxyType {
    /// Infer the proxy type from the scheme of a proxy URL.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("socks5://") || lower.starts_with("socks5h://") {
            Self::Socks5
        } else if lower.starts_with("https://") {
            Self::Https
        } else {
            Self::Http
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// Proxy used for every playlist, key and segment request of a download.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Proxy server URL (e.g., "http://127.0.0.1:7890")
    pub url: String,
    pub proxy_type: ProxyType,
    pub auth: Option<ProxyAuth>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            proxy_type: ProxyType::from_url(&url),
            url,
            auth: None,
        }
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(ProxyAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }
}

/// Build a reqwest Proxy routing all traffic through the configured server.
///
/// Media CDNs mix http and https hosts, so both schemes go through the proxy.
pub fn build_proxy_from_config(config: &ProxyConfig) -> Result<Proxy, String> {
    let url = match config.proxy_type {
        ProxyType::Socks5
            if !(config.url.starts_with("socks5://") || config.url.starts_with("socks5h://")) =>
        {
            format!("socks5://{}", config.url)
        }
        _ => config.url.clone(),
    };

    let mut proxy = Proxy::all(&url).map_err(|e| format!("Invalid proxy URL {url}: {e}"))?;

    if let Some(auth) = &config.auth {
        proxy = proxy.basic_auth(&auth.username, &auth.password);
    }

    Ok(proxy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_type_is_inferred_from_scheme() {
        assert_eq!(ProxyType::from_url("socks5h://10.0.0.1:1080"), ProxyType::Socks5);
        assert_eq!(ProxyType::from_url("HTTPS://proxy:443"), ProxyType::Https);
        assert_eq!(ProxyType::from_url("127.0.0.1:7890"), ProxyType::Http);
    }

    #[test]
    fn build_proxy_accepts_plain_http_url() {
        let config = ProxyConfig::new("http://127.0.0.1:7890");
        assert!(build_proxy_from_config(&config).is_ok());
    }

    #[test]
    fn build_proxy_with_auth() {
        let config = ProxyConfig::new("socks5://127.0.0.1:1080").with_auth("user", "secret");
        assert_eq!(config.proxy_type, ProxyType::Socks5);
        assert!(build_proxy_from_config(&config).is_ok());
    }
}
