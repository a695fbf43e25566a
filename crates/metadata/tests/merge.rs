use metadata_merge::{CrawlResult, Field, FieldMerger, FieldSources, infer_plot_source};
use proptest::prelude::*;
use serde_json::json;

fn scraped() -> Vec<CrawlResult> {
    serde_json::from_value(json!([
        {
            "source": "javbus",
            "title": "ABC-123",
            "external_id": "ABC-123",
            "original_url": "https://www.javbus.com/ABC-123",
            "data": {
                "plot": "【發行日期】2024-01-01 【長度】120分鐘",
                "actors": ["Actor One", "Actor Two"],
                "studio": "Studio Bus",
                "release": "2024-01-01",
                "cover_url": "https://pics.dmm.co.jp/digital/video/abc00123/abc00123pl.jpg",
                "publisher": "Label Bus"
            }
        },
        {
            "source": "dmm",
            "title": "A Long Proper Title",
            "data": {
                "plot": "JavaScriptを有効にしてご利用ください。",
                "runtime": "120",
                "directors": ["Director D"],
                "trailer_url": "https://cc3001.dmm.co.jp/litevideo/abc00123_mhb_w.mp4"
            }
        },
        {
            "source": "javtrailers",
            "title": "Trailer Site Title",
            "data": {
                "plot": "A quiet office worker discovers a hidden talent for painting.",
                "actors": [],
                "tags": ["Drama", "Office"],
                "preview_urls": ["https://img.example.com/1.jpg", "https://img.example.com/2.jpg"],
                "trailer_file": "abc-123.mp4"
            }
        }
    ]))
    .unwrap()
}

#[test]
fn realistic_sources_merge_with_defaults() {
    let results = scraped();
    let merged = FieldMerger::default().merge(&results);

    assert_eq!(merged.source, "merged");
    assert_eq!(merged.external_id.as_deref(), Some("ABC-123"));
    assert_eq!(
        merged.original_url.as_deref(),
        Some("https://www.javbus.com/ABC-123")
    );
    assert_eq!(merged.title.as_deref(), Some("Trailer Site Title"));
    assert_eq!(
        merged.get_str("plot"),
        Some("A quiet office worker discovers a hidden talent for painting.")
    );
    assert_eq!(infer_plot_source(&results, &merged), Some("javtrailers"));
    // javtrailers has an empty actors list, so the next source in input order wins.
    assert_eq!(merged.get("actors"), Some(&json!(["Actor One", "Actor Two"])));
    assert_eq!(merged.get_str("studio"), Some("Studio Bus"));
    assert_eq!(merged.get("tags"), Some(&json!(["Drama", "Office"])));
    assert_eq!(merged.get_str("runtime"), Some("120"));
    assert_eq!(
        merged.get_str("poster_url"),
        Some("https://pics.dmm.co.jp/digital/video/abc00123/abc00123ps.jpg")
    );
    assert_eq!(
        merged.get_str("fanart_url"),
        Some("https://pics.dmm.co.jp/digital/video/abc00123/abc00123pl.jpg")
    );
    assert_eq!(
        merged.get_str("trailer_url"),
        Some("https://cc3001.dmm.co.jp/litevideo/abc00123_mhb_w.mp4")
    );
    assert_eq!(merged.get_str("publisher"), Some("Label Bus"));
    assert_eq!(merged.get_str("trailer_file"), Some("abc-123.mp4"));
}

#[test]
fn user_preferences_reorder_and_disable_fields() {
    let results = scraped();
    let sources: FieldSources = serde_json::from_value(json!({
        "title": ["dmm"],
        "studio": ["dmm"],
        "actors": [],
        "poster_url": ["javtrailers"]
    }))
    .unwrap();
    let merged = FieldMerger::new(sources).merge(&results);

    assert_eq!(merged.title.as_deref(), Some("A Long Proper Title"));
    assert!(merged.get("studio").is_none());
    assert!(merged.get("actors").is_none());
    assert!(merged.get("poster_url").is_none());
    // Fanart keeps its default priority and falls back to the DMM cover.
    assert!(merged.get("fanart_url").is_some());
}

#[test]
fn merged_record_serializes_as_crawl_result() {
    let merged = FieldMerger::default().merge_for_file(&[], "XYZ-001");
    assert_eq!(
        serde_json::to_value(&merged).unwrap(),
        json!({
            "source": "merged",
            "title": "XYZ-001",
            "external_id": "XYZ-001",
            "data": {}
        })
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A configured order wins over input order for every plain field.
    #[test]
    fn prop_configured_priority_is_respected(
        a_value in "[a-z]{1,12}",
        b_value in "[a-z]{1,12}",
        field_index in 0usize..Field::PLAIN.len(),
    ) {
        let field = Field::PLAIN[field_index];
        let results = vec![
            CrawlResult::new("a").with_data(field.key(), a_value),
            CrawlResult::new("b").with_data(field.key(), b_value.clone()),
        ];
        let merger = FieldMerger::new(FieldSources::new().with(field, &["b", "a"]));
        let merged = merger.merge(&results);
        prop_assert_eq!(merged.get_str(field.key()), Some(b_value.as_str()));
    }

    /// A disabled field is absent no matter what the sources hold.
    #[test]
    fn prop_disabled_field_is_absent(
        values in prop::collection::vec("[a-z]{1,8}", 1..5),
        field_index in 0usize..Field::PLAIN.len(),
    ) {
        let field = Field::PLAIN[field_index];
        let results: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, v)| CrawlResult::new(format!("s{i}")).with_data(field.key(), v.clone()))
            .collect();
        let merged = FieldMerger::new(FieldSources::new().disable(field)).merge(&results);
        prop_assert!(merged.get(field.key()).is_none());
    }
}
