//! # metadata-merge
//!
//! Reconciles metadata scraped from several unreliable sources into one record
//! per video file.
//!
//! Each named field (title, plot, actors, artwork, ...) is resolved through a
//! per-field source priority ([`FieldSources`]) with field-specific quality
//! checks: bare product codes are not titles, blocked-page boilerplate and
//! release-date summaries are not plots, trailer and artwork URLs must be
//! absolute http(s). DMM cover URLs yield both poster and fanart. Keys no named
//! field owns are carried over first-non-empty.
//!
//! ```
//! use metadata_merge::{CrawlResult, Field, FieldMerger, FieldSources};
//!
//! let results = vec![
//!     CrawlResult::new("a").with_data("studio", "Studio A"),
//!     CrawlResult::new("b").with_data("studio", "Studio B"),
//! ];
//! let merger = FieldMerger::new(FieldSources::new().with(Field::Studio, &["b", "a"]));
//! let merged = merger.merge(&results);
//! assert_eq!(merged.get_str("studio"), Some("Studio B"));
//! ```

pub mod artwork;
pub mod crawler;
pub mod fields;
pub mod merger;
pub mod quality;
pub mod types;

pub use artwork::{DmmArtwork, derive_dmm_artwork, valid_http_url};
pub use crawler::{CrawlError, Crawler, collect_results};
pub use fields::{Field, FieldSources, Priority, SENTINEL_RANK};
pub use merger::{FieldMerger, infer_plot_source, merge_results};
pub use quality::{is_probably_code, looks_bad_plot, looks_meta_plot, looks_placeholder_plot};
pub use types::{CrawlResult, MERGED_SOURCE, MergedRecord, is_empty_value};
