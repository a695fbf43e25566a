use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use metadata_merge::{CrawlResult, FieldMerger, infer_plot_source};
use tracing::{info, warn};

use crate::config::AppConfig;

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))
}

/// Merge the crawl results in `input` and return the record as pretty JSON.
pub fn merge_file(config: &AppConfig, input: &Path, file_stem: Option<&str>) -> Result<String> {
    let results: Vec<CrawlResult> = serde_json::from_str(&read_input(input)?)
        .context("expected a JSON array of crawl results")?;

    let sources = &config.scrape.field_sources;
    for key in sources.unknown_keys() {
        warn!(field = key, "Unknown field in field_sources, ignored");
    }

    let merger = FieldMerger::new(sources.clone());
    let merged = match file_stem {
        Some(stem) => merger.merge_for_file(&results, stem),
        None => merger.merge(&results),
    };

    info!(
        results = results.len(),
        title = merged.title.as_deref().unwrap_or(""),
        plot_source = infer_plot_source(&results, &merged).unwrap_or("-"),
        "Merged metadata"
    );
    Ok(serde_json::to_string_pretty(&merged)?)
}

pub fn run(config: &AppConfig, input: &Path, file_stem: Option<&str>) -> Result<()> {
    println!("{}", merge_file(config, input, file_stem)?);
    Ok(())
}
