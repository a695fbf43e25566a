// Variant selection: picks one media playlist out of a master playlist by height cap.

use std::cmp::Reverse;
use std::convert::Infallible;
use std::str::FromStr;

use m3u8_rs::MasterPlaylist;
use url::Url;

/// Requested quality, parsed from strings like `"best"`, `"720p"` or `"1080"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPreference {
    /// Highest available quality. Also used for unrecognized input.
    #[default]
    Best,
    /// Best variant whose height does not exceed the cap.
    MaxHeight(u64),
}

impl ResolutionPreference {
    pub fn parse(input: &str) -> Self {
        let s = input.trim().to_ascii_lowercase();
        if s.is_empty() || s == "best" || s == "auto" {
            return Self::Best;
        }
        let digits = s.strip_suffix('p').unwrap_or(&s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Self::Best;
        }
        digits.parse().map(Self::MaxHeight).unwrap_or(Self::Best)
    }

    pub fn target_height(&self) -> Option<u64> {
        match self {
            Self::Best => None,
            Self::MaxHeight(h) => Some(*h),
        }
    }
}

impl FromStr for ResolutionPreference {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl std::fmt::Display for ResolutionPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Best => write!(f, "best"),
            Self::MaxHeight(h) => write!(f, "{h}p"),
        }
    }
}

/// One selectable stream of a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCandidate {
    /// Absolute media playlist URL
    pub uri: String,
    pub bandwidth: u64,
    pub height: Option<u64>,
}

impl VariantCandidate {
    /// Collect candidates from a master playlist, resolving relative URIs against `base`.
    ///
    /// I-frame only streams and variants without a URI are skipped.
    pub fn from_master(master: &MasterPlaylist, base: &Url) -> Vec<Self> {
        master
            .variants
            .iter()
            .filter(|v| !v.is_i_frame && !v.uri.trim().is_empty())
            .filter_map(|v| {
                let uri = base.join(v.uri.trim()).ok()?;
                Some(Self {
                    uri: uri.to_string(),
                    bandwidth: v.bandwidth,
                    height: v.resolution.map(|r| r.height),
                })
            })
            .collect()
    }
}

/// Pick a variant for the given height cap.
///
/// Without a cap the highest `(height, bandwidth)` wins and unknown heights rank
/// below known ones. With a cap the best variant not exceeding it wins; when all
/// known heights exceed the cap the closest height wins (higher bandwidth breaks
/// ties), and when no height is known at all the highest bandwidth wins.
/// Exact ties go to the variant listed first.
pub fn select_variant(
    candidates: &[VariantCandidate],
    target_height: Option<u64>,
) -> Option<&VariantCandidate> {
    let Some(target) = target_height else {
        return candidates.iter().rev().max_by_key(|c| (c.height, c.bandwidth));
    };

    let under_cap = candidates
        .iter()
        .filter(|c| c.height.is_some_and(|h| h <= target))
        .rev()
        .max_by_key(|c| (c.height, c.bandwidth));
    if under_cap.is_some() {
        return under_cap;
    }

    let closest = candidates
        .iter()
        .filter_map(|c| c.height.map(|h| (c, h.abs_diff(target))))
        .min_by_key(|(c, distance)| (*distance, Reverse(c.bandwidth)))
        .map(|(c, _)| c);
    if closest.is_some() {
        return closest;
    }

    candidates.iter().rev().max_by_key(|c| c.bandwidth)
}
