use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "banana",
    author,
    version,
    about = "Download HLS videos and merge scraped metadata"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to <config dir>/banana/config.toml)
    #[arg(short, long, global = true, env = "BANANA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write daily-rotated log files into this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only, no progress bar
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download an HLS stream into a single video file
    Download {
        /// Master or media playlist URL
        url: String,

        /// Output file, e.g. `ABC-123.mp4`
        #[arg(short, long)]
        output: PathBuf,

        /// `best`, `720p`, `1080`, ... (overrides the config file)
        #[arg(short, long)]
        resolution: Option<String>,

        /// Concurrent segment downloads (overrides the config file)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Extra request header, `Name: value`. Repeatable.
        #[arg(short = 'H', long = "header", value_name = "HEADER")]
        headers: Vec<String>,

        /// Proxy URL (overrides the config file)
        #[arg(long)]
        proxy: Option<String>,
    },

    /// Merge crawl results (JSON array) into one metadata record
    Merge {
        /// JSON file with an array of crawl results, `-` for stdin
        input: PathBuf,

        /// Video file stem used when no title or id was found
        #[arg(long)]
        file_stem: Option<String>,
    },
}

/// Split a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Option<(&str, &str)> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}
