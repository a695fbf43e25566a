// FieldMerger: reconciles per-source crawl results into one record.
//
// Every named field goes through a typed accessor and the source ranking of
// `FieldSources`; untyped copying happens only in the final long-tail pass.

use serde_json::Value;
use tracing::debug;

use crate::artwork::{derive_dmm_artwork, valid_http_url};
use crate::fields::{Field, FieldSources};
use crate::quality::{is_probably_code, looks_bad_plot, normalize_whitespace};
use crate::types::{CrawlResult, MERGED_SOURCE, MergedRecord, is_empty_value};

const COVER_URL: &str = "cover_url";

#[derive(Debug, Clone, Default)]
pub struct FieldMerger {
    sources: FieldSources,
}

impl FieldMerger {
    pub fn new(sources: FieldSources) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &FieldSources {
        &self.sources
    }

    /// Results eligible for `field`, best first: by rank, then by input order.
    fn ranked<'r>(&self, results: &'r [CrawlResult], field: Field) -> Vec<&'r CrawlResult> {
        let mut ranked: Vec<(usize, usize, &CrawlResult)> = results
            .iter()
            .enumerate()
            .filter_map(|(index, r)| {
                self.sources
                    .rank(field, &r.source)
                    .map(|rank| (rank, index, r))
            })
            .collect();
        ranked.sort_by_key(|(rank, index, _)| (*rank, *index));
        ranked.into_iter().map(|(_, _, r)| r).collect()
    }

    /// First non-empty value produced by `get` over the ranked results.
    fn pick<'r, T>(
        &self,
        results: &'r [CrawlResult],
        field: Field,
        get: impl Fn(&'r CrawlResult) -> Option<T>,
    ) -> Option<T> {
        self.ranked(results, field).into_iter().find_map(get)
    }

    /// Merge `results` into one record. Never fails: missing or low quality input
    /// only leaves fields empty.
    pub fn merge(&self, results: &[CrawlResult]) -> MergedRecord {
        let mut merged = CrawlResult::new(MERGED_SOURCE);

        merged.external_id = results
            .iter()
            .find_map(|r| r.external_id.as_deref().filter(|s| !s.is_empty()))
            .map(str::to_string);
        merged.original_url = results
            .iter()
            .find_map(|r| r.original_url.as_deref().filter(|s| !s.is_empty()))
            .map(str::to_string);

        merged.title = self.merge_title(results);

        if let Some(plot) = self.merge_plot(results) {
            merged.data.insert(Field::Plot.key().to_string(), plot.into());
        }

        for field in Field::PLAIN {
            if let Some(value) = self.pick(results, field, |r| plain_value(r, field)) {
                merged.data.insert(field.key().to_string(), value.clone());
            }
        }

        let trailer = self
            .pick(results, Field::TrailerUrl, |r| {
                url_value(r, Field::TrailerUrl.key())
            })
            .map(str::to_string);
        let poster = self.pick(results, Field::PosterUrl, poster_candidate);
        let fanart = self.pick(results, Field::FanartUrl, fanart_candidate);
        for (field, value) in [
            (Field::TrailerUrl, trailer),
            (Field::PosterUrl, poster),
            (Field::FanartUrl, fanart),
        ] {
            if let Some(url) = value {
                merged.data.insert(field.key().to_string(), url.into());
            }
        }

        if let Some(previews) = self.pick(results, Field::PreviewUrls, preview_urls) {
            merged
                .data
                .insert(Field::PreviewUrls.key().to_string(), previews.clone());
        }

        fill_long_tail(&mut merged, results);

        debug!(
            sources = ?results.iter().map(|r| r.source.as_str()).collect::<Vec<_>>(),
            plot_source = infer_plot_source(results, &merged).unwrap_or("-"),
            fields = merged.data.len(),
            "Merged crawl results"
        );
        merged
    }

    /// Merge for one video file; `title` and `external_id` fall back to the file
    /// stem so the record is usable even without any crawler hit.
    pub fn merge_for_file(&self, results: &[CrawlResult], file_stem: &str) -> MergedRecord {
        let mut merged = self.merge(results);
        let stem = file_stem.trim();
        if stem.is_empty() {
            return merged;
        }
        if merged.title.as_deref().is_none_or(str::is_empty) {
            merged.title = Some(stem.to_string());
        }
        if merged.external_id.as_deref().is_none_or(str::is_empty) {
            merged.external_id = Some(stem.to_string());
        }
        merged
    }

    /// Priority pick, rejecting bare codes. The last resort is the first non-empty
    /// title in input order, whatever it looks like.
    fn merge_title(&self, results: &[CrawlResult]) -> Option<String> {
        if self.sources.is_disabled(Field::Title) {
            return None;
        }
        let picked = self.pick(results, Field::Title, |r| {
            r.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
        });
        if let Some(title) = picked.filter(|t| !is_probably_code(t)) {
            return Some(title.to_string());
        }
        results
            .iter()
            .find_map(|r| r.title.as_deref().map(str::trim).filter(|t| !t.is_empty()))
            .map(str::to_string)
    }

    /// Priority pick, rejecting placeholders and meta blobs. If the pick is bad, any
    /// good plot from any source wins; failing that the bad pick is kept.
    fn merge_plot(&self, results: &[CrawlResult]) -> Option<String> {
        if self.sources.is_disabled(Field::Plot) {
            return None;
        }
        let picked = self
            .pick(results, Field::Plot, plot_text)
            .map(str::trim)
            .filter(|p| !p.is_empty());
        if let Some(plot) = picked.filter(|p| !looks_bad_plot(p)) {
            return Some(plot.to_string());
        }
        let good = results
            .iter()
            .filter_map(plot_text)
            .map(str::trim)
            .find(|p| !p.is_empty() && !looks_bad_plot(p));
        good.or(picked).map(str::to_string)
    }
}

/// Convenience wrapper around [`FieldMerger::merge`].
pub fn merge_results(results: &[CrawlResult], sources: &FieldSources) -> MergedRecord {
    FieldMerger::new(sources.clone()).merge(results)
}

/// Name of the source whose plot, whitespace-normalized, equals the merged plot.
pub fn infer_plot_source<'r>(results: &'r [CrawlResult], merged: &MergedRecord) -> Option<&'r str> {
    let target = normalize_whitespace(merged.get_str(Field::Plot.key())?);
    if target.is_empty() {
        return None;
    }
    results
        .iter()
        .find(|r| plot_text(r).is_some_and(|p| normalize_whitespace(p) == target))
        .map(|r| r.source.as_str())
}

fn plot_text(r: &CrawlResult) -> Option<&str> {
    r.get_str(Field::Plot.key())
}

fn plain_value(r: &CrawlResult, field: Field) -> Option<&Value> {
    r.get(field.key()).filter(|v| !is_empty_value(v))
}

fn url_value<'r>(r: &'r CrawlResult, key: &str) -> Option<&'r str> {
    r.get_str(key).and_then(valid_http_url)
}

fn poster_candidate(r: &CrawlResult) -> Option<String> {
    if let Some(url) = url_value(r, Field::PosterUrl.key()) {
        return Some(url.to_string());
    }
    let cover = url_value(r, COVER_URL)?;
    Some(derive_dmm_artwork(cover).map_or_else(|| cover.to_string(), |art| art.poster))
}

fn fanart_candidate(r: &CrawlResult) -> Option<String> {
    if let Some(url) = url_value(r, Field::FanartUrl.key()) {
        return Some(url.to_string());
    }
    derive_dmm_artwork(url_value(r, COVER_URL)?).map(|art| art.fanart)
}

fn preview_urls(r: &CrawlResult) -> Option<&Value> {
    r.get(Field::PreviewUrls.key())
        .filter(|v| v.as_array().is_some_and(|items| !items.is_empty()))
}

/// Copy keys no named field owns, first non-empty value in input order.
fn fill_long_tail(merged: &mut MergedRecord, results: &[CrawlResult]) {
    for result in results {
        for (key, value) in &result.data {
            if Field::from_key(key).is_some()
                || merged.data.contains_key(key)
                || is_empty_value(value)
            {
                continue;
            }
            merged.data.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CLEAN_PLOT: &str = "A quiet office worker discovers a hidden talent for painting.";
    const META_PLOT: &str =
        "[发布日期] 2024-01-01，[时长] 120 分钟，(ABC-123)\"Title\" some real plot text here";

    fn result(source: &str) -> CrawlResult {
        CrawlResult::new(source)
    }

    #[test]
    fn identity_fields_take_first_non_empty() {
        let results = vec![
            result("a").with_external_id(""),
            result("b")
                .with_external_id("ABC-123")
                .with_original_url("https://b.example/abc-123"),
            result("c").with_external_id("XYZ-999"),
        ];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(merged.source, MERGED_SOURCE);
        assert_eq!(merged.external_id.as_deref(), Some("ABC-123"));
        assert_eq!(merged.original_url.as_deref(), Some("https://b.example/abc-123"));
    }

    #[test]
    fn configured_priority_beats_input_order() {
        let results = vec![
            result("a").with_data("studio", "Studio A"),
            result("b").with_data("studio", "Studio B"),
        ];
        let sources = FieldSources::new().with(Field::Studio, &["b", "a"]);
        let merged = merge_results(&results, &sources);
        assert_eq!(merged.get_str("studio"), Some("Studio B"));
    }

    #[test]
    fn configured_list_excludes_other_sources() {
        let results = vec![
            result("a").with_data("series", "Series A"),
            result("b").with_data("series", ""),
        ];
        let sources = FieldSources::new().with(Field::Series, &["b"]);
        let merged = merge_results(&results, &sources);
        assert!(merged.get("series").is_none());
    }

    #[test]
    fn default_priority_falls_back_to_other_sources() {
        let results = vec![
            result("javbus").with_data("actors", json!(["Actor B"])),
            result("javtrailers").with_data("actors", json!([])),
            result("dmm").with_data("actors", json!(["Actor D"])),
        ];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(merged.get("actors"), Some(&json!(["Actor B"])));
    }

    #[test]
    fn default_priority_prefers_listed_source() {
        let results = vec![
            result("javbus").with_data("tags", json!(["b"])),
            result("javtrailers").with_data("tags", json!(["t"])),
        ];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(merged.get("tags"), Some(&json!(["t"])));
    }

    #[test]
    fn disabled_field_stays_absent() {
        let results = vec![
            result("javtrailers").with_data("actors", json!(["A"])),
            result("dmm").with_data("actors", json!(["B"])),
        ];
        let sources = FieldSources::new().disable(Field::Actors);
        let merged = merge_results(&results, &sources);
        assert!(merged.get("actors").is_none());
    }

    #[test]
    fn code_title_is_rejected_for_first_non_empty() {
        let results = vec![
            result("dmm").with_title("Real Title From DMM"),
            result("javtrailers").with_title("ADN-529"),
        ];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(merged.title.as_deref(), Some("Real Title From DMM"));
    }

    #[test]
    fn code_title_is_kept_as_last_resort() {
        let results = vec![result("javtrailers").with_title("  ADN-529 ")];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(merged.title.as_deref(), Some("ADN-529"));
    }

    #[test]
    fn disabled_title_is_never_set() {
        let results = vec![result("dmm").with_title("Title")];
        let merged = merge_results(&results, &FieldSources::new().disable(Field::Title));
        assert!(merged.title.is_none());
    }

    #[test]
    fn bad_priority_plot_is_replaced_by_clean_one() {
        let results = vec![
            result("javbus").with_data("plot", CLEAN_PLOT),
            result("dmm").with_data("plot", META_PLOT),
        ];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(merged.get_str("plot"), Some(CLEAN_PLOT));
    }

    #[test]
    fn plot_escape_ignores_strict_list() {
        let results = vec![
            result("dmm").with_data("plot", "JavaScriptを有効にしてください"),
            result("other").with_data("plot", format!("  {CLEAN_PLOT}\n")),
        ];
        let sources = FieldSources::new().with(Field::Plot, &["dmm"]);
        let merged = merge_results(&results, &sources);
        assert_eq!(merged.get_str("plot"), Some(CLEAN_PLOT));
    }

    #[test]
    fn bad_plot_is_kept_when_nothing_better_exists() {
        let results = vec![result("dmm").with_data("plot", META_PLOT)];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(merged.get_str("plot"), Some(META_PLOT));
    }

    #[test]
    fn invalid_trailer_is_treated_as_empty() {
        let results = vec![
            result("javtrailers").with_data("trailer_url", "//cdn.example.com/t.mp4"),
            result("dmm").with_data("trailer_url", "https://cc3001.dmm.co.jp/t.mp4"),
        ];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(
            merged.get_str("trailer_url"),
            Some("https://cc3001.dmm.co.jp/t.mp4")
        );
    }

    #[test]
    fn artwork_is_derived_from_dmm_cover() {
        let cover = "https://pics.dmm.co.jp/digital/video/abc00123/abc00123pl.jpg";
        let results = vec![result("dmm").with_data("cover_url", cover)];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(
            merged.get_str("poster_url"),
            Some("https://pics.dmm.co.jp/digital/video/abc00123/abc00123ps.jpg")
        );
        assert_eq!(merged.get_str("fanart_url"), Some(cover));
        // The cover itself survives through the long-tail pass.
        assert_eq!(merged.get_str("cover_url"), Some(cover));
    }

    #[test]
    fn plain_cover_becomes_poster_only() {
        let cover = "https://img.example.com/cover.jpg";
        let results = vec![result("javbus").with_data("cover_url", cover)];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(merged.get_str("poster_url"), Some(cover));
        assert!(merged.get("fanart_url").is_none());
    }

    #[test]
    fn own_artwork_wins_over_cover() {
        let results = vec![
            result("javtrailers")
                .with_data("poster_url", "https://a.example/p.jpg")
                .with_data("cover_url", "https://pics.dmm.co.jp/x/abcps.jpg"),
        ];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(merged.get_str("poster_url"), Some("https://a.example/p.jpg"));
        assert_eq!(
            merged.get_str("fanart_url"),
            Some("https://pics.dmm.co.jp/x/abcpl.jpg")
        );
    }

    #[test]
    fn previews_must_be_a_non_empty_list() {
        let results = vec![
            result("javtrailers").with_data("preview_urls", "https://x/1.jpg"),
            result("dmm").with_data("preview_urls", json!(["https://x/1.jpg"])),
        ];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(merged.get("preview_urls"), Some(&json!(["https://x/1.jpg"])));
    }

    #[test]
    fn long_tail_keys_are_copied_first_non_empty() {
        let results = vec![
            result("a")
                .with_data("publisher", "")
                .with_data("trailer_file", "a.mp4"),
            result("b")
                .with_data("publisher", "Pub B")
                .with_data("trailer_file", "b.mp4")
                .with_data("rating", 4.5),
        ];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(merged.get_str("publisher"), Some("Pub B"));
        assert_eq!(merged.get_str("trailer_file"), Some("a.mp4"));
        assert_eq!(merged.get("rating"), Some(&json!(4.5)));
    }

    #[test]
    fn empty_results_seed_from_file_stem() {
        let merged = FieldMerger::default().merge_for_file(&[], "ABC-123");
        assert_eq!(merged.title.as_deref(), Some("ABC-123"));
        assert_eq!(merged.external_id.as_deref(), Some("ABC-123"));
        assert!(merged.data.is_empty());
    }

    #[test]
    fn file_stem_does_not_override_found_values() {
        let results = vec![result("dmm").with_title("Found").with_external_id("ABC-123")];
        let merged = FieldMerger::default().merge_for_file(&results, "abc123-file");
        assert_eq!(merged.title.as_deref(), Some("Found"));
        assert_eq!(merged.external_id.as_deref(), Some("ABC-123"));
    }

    #[test]
    fn plot_source_is_inferred_with_normalized_whitespace() {
        let results = vec![
            result("javbus").with_data("plot", "something else entirely, long enough"),
            result("dmm").with_data("plot", "A quiet   office worker\ndiscovers a hidden talent for painting."),
        ];
        let merged = FieldMerger::default().merge(&results);
        assert_eq!(infer_plot_source(&results, &merged), Some("dmm"));
        assert_eq!(infer_plot_source(&results, &result("x")), None);
    }
}
