//! Command-line interface definitions for News Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every flag is optional: unset flags fall back to the YAML config file
//! (when given) and then to the built-in defaults. Some flags can also be
//! set through environment variables.

use crate::config::{ConfigError, OutputFormat, PipelineConfig};
use chrono::NaiveDate;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Command-line arguments for the News Digest application.
///
/// # Examples
///
/// ```sh
/// # Defaults: 3 workers, pages 1..=10, HTML output in ./output
/// news_digest
///
/// # Rank September only, keep the top 10, write JSON
/// news_digest --start-date 2024-09-01 --end-date 2024-09-30 --top 10 -f json
///
/// # Settings from a file, with a two-minute budget for the whole run
/// news_digest -c digest.yaml --deadline-secs 120
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory for the rendered documents
    #[arg(short, long, env = "NEWS_DIGEST_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output document format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of concurrent workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Entries requested per page
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Highest page number to fetch (inclusive)
    #[arg(long)]
    pub max_page: Option<u32>,

    /// Maximum number of requests in flight across all workers
    #[arg(long, env = "MAX_CONCURRENT_REQUESTS")]
    pub max_concurrent_requests: Option<usize>,

    /// Stop issuing requests after this many seconds and finalize
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// First publication date of the ranking window (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Last publication date of the ranking window (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Number of most rated entries to keep
    #[arg(short, long)]
    pub top: Option<usize>,

    /// Feed endpoint
    #[arg(long, env = "NEWS_FEED_URL")]
    pub base_url: Option<String>,

    /// Location filter sent to the feed
    #[arg(long)]
    pub location: Option<String>,
}

impl Cli {
    /// Resolve the final run configuration: file (if any), then flags, then
    /// validation.
    pub fn resolve(&self) -> Result<PipelineConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_yaml_file(Path::new(path))?,
            None => PipelineConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut PipelineConfig) {
        let pipeline = &mut config.pipeline;
        if let Some(v) = self.workers {
            pipeline.workers = v;
        }
        if let Some(v) = self.page_size {
            pipeline.page_size = v;
        }
        if let Some(v) = self.max_page {
            pipeline.max_page = v;
        }
        if let Some(v) = self.max_concurrent_requests {
            pipeline.max_concurrent_requests = v;
        }
        if self.deadline_secs.is_some() {
            pipeline.deadline_secs = self.deadline_secs;
        }

        let ranking = &mut config.ranking;
        if let Some(v) = self.start_date {
            ranking.start_date = v;
        }
        if let Some(v) = self.end_date {
            ranking.end_date = v;
        }
        if let Some(v) = self.top {
            ranking.top_k = v;
        }

        if let Some(v) = &self.base_url {
            config.feed.base_url = v.clone();
        }
        if let Some(v) = &self.location {
            config.feed.location = v.clone();
        }

        if let Some(v) = &self.output_dir {
            config.output.dir = v.clone();
        }
        if let Some(v) = self.format {
            config.output.format = v;
        }
    }
}
