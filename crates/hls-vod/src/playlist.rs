// HLS playlist handling: fetch + master->media resolution, rewriting of segment and key
// URIs to the local working directory, and serialization of the local manifest.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use m3u8_rs::{KeyMethod, MediaPlaylist, Playlist, parse_playlist_res};
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::error::HlsDownloadError;
use crate::fetcher::ResourceFetcher;
use crate::variant::{ResolutionPreference, VariantCandidate, select_variant};

/// Number of master->media hops followed before giving up.
const MAX_VARIANT_HOPS: usize = 1;

pub const LOCAL_MANIFEST_NAME: &str = "local.m3u8";
pub const KEY_FILE_NAME: &str = "key.key";

/// Media playlist ready to download, with the URL its relative URIs resolve against.
#[derive(Debug, Clone)]
pub struct ResolvedPlaylist {
    pub playlist: MediaPlaylist,
    pub url: Url,
}

/// One media segment. Identity is `sequence`, its position in the playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub sequence: usize,
    /// Absolute remote URI
    pub source_uri: String,
    /// File name inside the working directory, `seg_%05d.ts`
    pub local_file_name: String,
}

impl Segment {
    pub fn local_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.local_file_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    /// Absolute remote URI
    pub source_uri: String,
    pub local_file_name: String,
}

pub fn segment_file_name(sequence: usize) -> String {
    format!("seg_{sequence:05}.ts")
}

fn key_file_name(index: usize) -> String {
    if index == 0 {
        KEY_FILE_NAME.to_string()
    } else {
        format!("key_{index}.key")
    }
}

fn parse_url(input: &str) -> Result<Url, HlsDownloadError> {
    Url::parse(input).map_err(|e| HlsDownloadError::invalid_url(input, e.to_string()))
}

fn join_uri(base: &Url, uri: &str) -> Result<String, HlsDownloadError> {
    base.join(uri.trim())
        .map(|u| u.to_string())
        .map_err(|e| HlsDownloadError::invalid_url(uri, e.to_string()))
}

/// Fetch `url` and follow at most one master->media hop using `preference`.
///
/// Fails with `NoSegmentsFound` when the final playlist has no media segments, and
/// with `Cancelled` when the token fires between fetches.
pub async fn resolve_media_playlist(
    fetcher: &dyn ResourceFetcher,
    url: &str,
    headers: &HeaderMap,
    preference: ResolutionPreference,
    token: &CancellationToken,
) -> Result<ResolvedPlaylist, HlsDownloadError> {
    let mut current = parse_url(url)?;

    for hop in 0..=MAX_VARIANT_HOPS {
        if token.is_cancelled() {
            return Err(HlsDownloadError::Cancelled);
        }
        let bytes = fetcher.fetch(current.as_str(), headers).await?;
        if token.is_cancelled() {
            return Err(HlsDownloadError::Cancelled);
        }

        let parsed = parse_playlist_res(&bytes).map_err(|e| {
            HlsDownloadError::playlist(format!("Failed to parse playlist {current}: {e}"))
        })?;

        match parsed {
            Playlist::MediaPlaylist(playlist) if !playlist.segments.is_empty() => {
                info!(url = %current, segments = playlist.segments.len(), "Found media playlist");
                return Ok(ResolvedPlaylist {
                    playlist,
                    url: current,
                });
            }
            Playlist::MediaPlaylist(_) => break,
            Playlist::MasterPlaylist(master) => {
                if hop == MAX_VARIANT_HOPS {
                    break;
                }
                let candidates = VariantCandidate::from_master(&master, &current);
                let Some(selected) = select_variant(&candidates, preference.target_height())
                else {
                    break;
                };
                info!(
                    variant = %selected.uri,
                    height = ?selected.height,
                    bandwidth = selected.bandwidth,
                    preference = %preference,
                    "Selected variant from master playlist"
                );
                current = parse_url(&selected.uri)?;
            }
        }
    }

    Err(HlsDownloadError::NoSegmentsFound {
        url: url.to_string(),
    })
}

/// Rewrite every segment URI to its local file name and return the remote mapping.
///
/// The mapping is captured before the playlist is mutated, in playlist order.
pub fn localize_segments(
    playlist: &mut MediaPlaylist,
    base: &Url,
) -> Result<Vec<Segment>, HlsDownloadError> {
    let segments = playlist
        .segments
        .iter()
        .enumerate()
        .map(|(sequence, segment)| {
            Ok(Segment {
                sequence,
                source_uri: join_uri(base, &segment.uri)?,
                local_file_name: segment_file_name(sequence),
            })
        })
        .collect::<Result<Vec<_>, HlsDownloadError>>()?;

    for (segment, planned) in playlist.segments.iter_mut().zip(&segments) {
        segment.uri = planned.local_file_name.clone();
    }
    Ok(segments)
}

/// Distinct encryption keys declared by the playlist, in first-use order.
///
/// Keys with method NONE or without a URI need no download and are skipped.
pub fn collect_keys(
    playlist: &MediaPlaylist,
    base: &Url,
) -> Result<Vec<EncryptionKey>, HlsDownloadError> {
    let mut keys: Vec<EncryptionKey> = Vec::new();
    for key in playlist.segments.iter().filter_map(|s| s.key.as_ref()) {
        if key.method == KeyMethod::None {
            continue;
        }
        let Some(uri) = key.uri.as_deref().filter(|u| !u.trim().is_empty()) else {
            continue;
        };
        let source_uri = join_uri(base, uri)?;
        if keys.iter().any(|k| k.source_uri == source_uri) {
            continue;
        }
        keys.push(EncryptionKey {
            source_uri,
            local_file_name: key_file_name(keys.len()),
        });
    }
    Ok(keys)
}

/// Point every key tag at the local copy of its key file.
pub fn localize_keys(
    playlist: &mut MediaPlaylist,
    base: &Url,
    keys: &[EncryptionKey],
) -> Result<(), HlsDownloadError> {
    let local: HashMap<&str, &str> = keys
        .iter()
        .map(|k| (k.source_uri.as_str(), k.local_file_name.as_str()))
        .collect();

    for key in playlist.segments.iter_mut().filter_map(|s| s.key.as_mut()) {
        let Some(uri) = key.uri.as_deref() else {
            continue;
        };
        if key.method == KeyMethod::None || uri.trim().is_empty() {
            continue;
        }
        let absolute = join_uri(base, uri)?;
        if let Some(name) = local.get(absolute.as_str()) {
            key.uri = Some((*name).to_string());
        }
    }
    Ok(())
}

/// Serialize the localized playlist. The local copy is always complete, so it is
/// marked with ENDLIST to keep the demuxer from treating it as live.
pub fn render_manifest(playlist: &MediaPlaylist) -> Result<Vec<u8>, HlsDownloadError> {
    let mut playlist = playlist.clone();
    playlist.end_list = true;
    let mut out = Vec::new();
    playlist.write_to(&mut out)?;
    Ok(out)
}

pub async fn write_local_manifest(
    dir: &Path,
    playlist: &MediaPlaylist,
) -> Result<PathBuf, HlsDownloadError> {
    let path = dir.join(LOCAL_MANIFEST_NAME);
    tokio::fs::write(&path, render_manifest(playlist)?).await?;
    debug!(path = %path.display(), "Wrote local manifest");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_media(input: &str) -> MediaPlaylist {
        match parse_playlist_res(input.as_bytes()).expect("playlist should parse") {
            Playlist::MediaPlaylist(pl) => pl,
            Playlist::MasterPlaylist(_) => panic!("expected media playlist"),
        }
    }

    const ENCRYPTED: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-TARGETDURATION:4\n\
#EXT-X-MEDIA-SEQUENCE:0\n\
#EXT-X-KEY:METHOD=AES-128,URI=\"keys/k1.bin\"\n\
#EXTINF:4.0,\n\
a.ts\n\
#EXTINF:4.0,\n\
https://cdn.example.com/b.ts\n\
#EXT-X-KEY:METHOD=AES-128,URI=\"https://keys.example.com/k2.bin\"\n\
#EXTINF:4.0,\n\
c.ts\n\
#EXT-X-ENDLIST\n";

    #[test]
    fn localize_segments_records_absolute_uris_in_order() {
        let mut playlist = parse_media(ENCRYPTED);
        let base = Url::parse("https://example.com/hls/video/index.m3u8").unwrap();

        let segments = localize_segments(&mut playlist, &base).unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].source_uri, "https://example.com/hls/video/a.ts");
        assert_eq!(segments[1].source_uri, "https://cdn.example.com/b.ts");
        assert_eq!(segments[2].local_file_name, "seg_00002.ts");
        let local: Vec<_> = playlist.segments.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(local, ["seg_00000.ts", "seg_00001.ts", "seg_00002.ts"]);
    }

    #[test]
    fn keys_are_collected_once_and_localized() {
        let mut playlist = parse_media(ENCRYPTED);
        let base = Url::parse("https://example.com/hls/video/index.m3u8").unwrap();

        let keys = collect_keys(&playlist, &base).unwrap();
        assert_eq!(
            keys,
            vec![
                EncryptionKey {
                    source_uri: "https://example.com/hls/video/keys/k1.bin".to_string(),
                    local_file_name: "key.key".to_string(),
                },
                EncryptionKey {
                    source_uri: "https://keys.example.com/k2.bin".to_string(),
                    local_file_name: "key_1.key".to_string(),
                },
            ]
        );

        localize_keys(&mut playlist, &base, &keys).unwrap();
        let manifest = String::from_utf8(render_manifest(&playlist).unwrap()).unwrap();
        assert!(manifest.contains("URI=\"key.key\""));
        assert!(manifest.contains("URI=\"key_1.key\""));
        assert!(!manifest.contains("k1.bin"));
    }

    #[test]
    fn unencrypted_playlist_has_no_keys() {
        let playlist = parse_media(
            "#EXTM3U\n#EXT-X-TARGETDURATION:2\n#EXTINF:2.0,\na.ts\n#EXT-X-ENDLIST\n",
        );
        let base = Url::parse("https://example.com/index.m3u8").unwrap();
        assert!(collect_keys(&playlist, &base).unwrap().is_empty());
    }

    #[test]
    fn manifest_is_marked_complete() {
        let playlist =
            parse_media("#EXTM3U\n#EXT-X-TARGETDURATION:2\n#EXTINF:2.0,\nseg_00000.ts\n");
        let manifest = String::from_utf8(render_manifest(&playlist).unwrap()).unwrap();
        assert!(manifest.contains("#EXT-X-ENDLIST"));
        assert!(manifest.contains("seg_00000.ts"));
    }
}
