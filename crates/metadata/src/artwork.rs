// Artwork URL helpers: http(s) validation and the DMM poster/fanart naming convention.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

const DMM_PICS_HOST: &str = "pics.dmm.co.jp";

static DMM_POSTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ps\.jpg($|\?)").unwrap());
static DMM_FANART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pl\.jpg($|\?)").unwrap());

/// Poster (portrait, `ps.jpg`) and fanart (landscape, `pl.jpg`) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmmArtwork {
    pub poster: String,
    pub fanart: String,
}

/// Trimmed `s` when it is an absolute http(s) URL with a host.
pub fn valid_http_url(s: &str) -> Option<&str> {
    let t = s.trim();
    if !(t.starts_with("http://") || t.starts_with("https://")) {
        return None;
    }
    let parsed = Url::parse(t).ok()?;
    parsed.host_str()?;
    Some(t)
}

/// Derive both artwork variants from a DMM cover URL.
///
/// Only `pics.dmm.co.jp` URLs whose path ends in `ps.jpg` or `pl.jpg` (before any
/// query string) qualify; the first such suffix is swapped.
pub fn derive_dmm_artwork(cover_url: &str) -> Option<DmmArtwork> {
    let u = cover_url.trim();
    let host = Url::parse(u).ok()?.host_str()?.to_ascii_lowercase();
    if host != DMM_PICS_HOST {
        return None;
    }
    if DMM_POSTER_RE.is_match(u) {
        return Some(DmmArtwork {
            poster: u.to_string(),
            fanart: DMM_POSTER_RE.replacen(u, 1, "pl.jpg${1}").into_owned(),
        });
    }
    if DMM_FANART_RE.is_match(u) {
        return Some(DmmArtwork {
            poster: DMM_FANART_RE.replacen(u, 1, "ps.jpg${1}").into_owned(),
            fanart: u.to_string(),
        });
    }
    None
}
