// Named metadata fields and the per-field source preference map.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Rank given to sources missing from a default priority list.
pub const SENTINEL_RANK: usize = 10_000;

/// Fields resolved through a source priority list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Plot,
    Actors,
    Studio,
    Series,
    Release,
    Runtime,
    Directors,
    Tags,
    TrailerUrl,
    PosterUrl,
    FanartUrl,
    PreviewUrls,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Title,
        Field::Plot,
        Field::Actors,
        Field::Studio,
        Field::Series,
        Field::Release,
        Field::Runtime,
        Field::Directors,
        Field::Tags,
        Field::TrailerUrl,
        Field::PosterUrl,
        Field::FanartUrl,
        Field::PreviewUrls,
    ];

    /// Fields copied as-is from the best source, without extra validation.
    pub const PLAIN: [Field; 7] = [
        Field::Actors,
        Field::Studio,
        Field::Series,
        Field::Release,
        Field::Runtime,
        Field::Directors,
        Field::Tags,
    ];

    /// Key used in `CrawlResult::data` and in the preference map.
    pub const fn key(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Plot => "plot",
            Field::Actors => "actors",
            Field::Studio => "studio",
            Field::Series => "series",
            Field::Release => "release",
            Field::Runtime => "runtime",
            Field::Directors => "directors",
            Field::Tags => "tags",
            Field::TrailerUrl => "trailer_url",
            Field::PosterUrl => "poster_url",
            Field::FanartUrl => "fanart_url",
            Field::PreviewUrls => "preview_urls",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Compiled-in priority used when the preference map has no entry.
    pub const fn default_sources(self) -> &'static [&'static str] {
        match self {
            Field::Plot => &["dmm"],
            _ => &["javtrailers"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How candidates for one field are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority<'a> {
    /// Present with an empty list: never populate the field.
    Disabled,
    /// Configured list: only these sources, in this order.
    Strict(&'a [String]),
    /// No entry: listed sources first, then everyone else in input order.
    Default(&'static [&'static str]),
}

/// Per-field ordered source names, keyed by field key (`"plot"`, `"poster_url"`).
///
/// Serialized as a plain map, e.g. `{"plot": ["dmm", "javbus"], "actors": []}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSources(HashMap<String, Vec<String>>);

impl FieldSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, sources: &[&str]) -> Self {
        self.set(field, sources.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn set(&mut self, field: Field, sources: Vec<String>) {
        self.0.insert(field.key().to_string(), sources);
    }

    /// Disable a field: it will stay empty in every merged record.
    pub fn disable(mut self, field: Field) -> Self {
        self.set(field, Vec::new());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys that do not name a known field. They are kept but have no effect.
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|k| Field::from_key(k).is_none())
    }

    pub fn priority(&self, field: Field) -> Priority<'_> {
        match self.0.get(field.key()) {
            Some(list) if list.is_empty() => Priority::Disabled,
            Some(list) => Priority::Strict(list),
            None => Priority::Default(field.default_sources()),
        }
    }

    pub fn is_disabled(&self, field: Field) -> bool {
        self.priority(field) == Priority::Disabled
    }

    /// Rank of `source` for `field`; lower wins. `None` means the source is not a
    /// candidate at all (field disabled, or missing from a configured list).
    pub fn rank(&self, field: Field, source: &str) -> Option<usize> {
        match self.priority(field) {
            Priority::Disabled => None,
            Priority::Strict(list) => list.iter().position(|s| s == source),
            Priority::Default(list) => {
                Some(list.iter().position(|s| *s == source).unwrap_or(SENTINEL_RANK))
            }
        }
    }
}

impl From<HashMap<String, Vec<String>>> for FieldSources {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_key(field.key()), Some(field));
        }
        assert_eq!(Field::from_key("cover_url"), None);
    }

    #[test]
    fn default_ranking_puts_unlisted_sources_last() {
        let sources = FieldSources::new();
        assert_eq!(sources.rank(Field::Plot, "dmm"), Some(0));
        assert_eq!(sources.rank(Field::Plot, "javbus"), Some(SENTINEL_RANK));
        assert_eq!(sources.rank(Field::Actors, "javtrailers"), Some(0));
    }

    #[test]
    fn configured_list_is_strict() {
        let sources = FieldSources::new().with(Field::Actors, &["javbus", "dmm"]);
        assert_eq!(sources.rank(Field::Actors, "javbus"), Some(0));
        assert_eq!(sources.rank(Field::Actors, "dmm"), Some(1));
        assert_eq!(sources.rank(Field::Actors, "javtrailers"), None);
        // Other fields keep their defaults.
        assert_eq!(sources.rank(Field::Tags, "javtrailers"), Some(0));
    }

    #[test]
    fn empty_list_disables_field() {
        let sources = FieldSources::new().disable(Field::Actors);
        assert!(sources.is_disabled(Field::Actors));
        assert_eq!(sources.rank(Field::Actors, "javtrailers"), None);
        assert!(!sources.is_disabled(Field::Plot));
    }

    #[test]
    fn deserializes_from_plain_map() {
        let sources: FieldSources =
            serde_json::from_str(r#"{"plot": ["javbus"], "actors": [], "bogus": ["x"]}"#)
                .unwrap();
        assert_eq!(sources.priority(Field::Actors), Priority::Disabled);
        assert_eq!(sources.rank(Field::Plot, "javbus"), Some(0));
        assert_eq!(sources.unknown_keys().collect::<Vec<_>>(), vec!["bogus"]);
    }
}
