//! Run configuration.
//!
//! A [`PipelineConfig`] is resolved once before the pipeline starts and is
//! never changed afterwards. Values come from, in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. An optional YAML file (`--config`)
//! 3. Command-line flags and their environment variables
//!
//! # YAML Layout
//!
//! ```yaml
//! pipeline:
//!   workers: 3
//!   page_size: 50
//!   max_page: 10
//!   max_concurrent_requests: 5
//!   deadline_secs: 120
//! ranking:
//!   start_date: 2024-08-01
//!   end_date: 2024-10-10
//!   top_k: 20
//! feed:
//!   base_url: https://kudago.com/public-api/v1.4/news/
//!   location: msk
//!   request_timeout_secs: 30
//! output:
//!   dir: ./output
//!   format: html
//! ```
//!
//! Every section and field is optional.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default feed endpoint.
pub const DEFAULT_BASE_URL: &str = "https://kudago.com/public-api/v1.4/news/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete configuration for one run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pipeline: PipelineSettings,
    pub ranking: RankingSettings,
    pub feed: FeedSettings,
    pub output: OutputSettings,
}

/// Worker pool and admission control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Number of concurrent workers (`N`).
    pub workers: usize,
    /// Entries requested per page (`P`).
    pub page_size: u32,
    /// Highest page number fetched, inclusive (`B`).
    pub max_page: u32,
    /// Maximum fetches in flight across all workers (`C`).
    pub max_concurrent_requests: usize,
    /// Optional wall-clock budget for the whole run.
    pub deadline_secs: Option<u64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: 3,
            page_size: 50,
            max_page: 10,
            max_concurrent_requests: 5,
            deadline_secs: None,
        }
    }
}

impl PipelineSettings {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Date window and size of the ranked result.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    /// First publication date included, inclusive.
    pub start_date: NaiveDate,
    /// Last publication date included, inclusive.
    pub end_date: NaiveDate,
    /// Number of entries kept in the ranked result (`K`).
    pub top_k: usize,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 10, 10).unwrap_or_default(),
            top_k: 20,
        }
    }
}

impl RankingSettings {
    /// Whether `date` falls inside the inclusive window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Remote feed endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub base_url: String,
    /// Location filter sent with every request.
    pub location: String,
    pub request_timeout_secs: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            location: "msk".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Document format written by the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
        }
    }
}

/// Where and how results are persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./output"),
            format: OutputFormat::Html,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        if p.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if p.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if p.max_page == 0 {
            return Err(ConfigError::Invalid("max_page must be at least 1".into()));
        }
        if p.max_concurrent_requests == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_requests must be at least 1".into(),
            ));
        }

        let r = &self.ranking;
        if r.start_date > r.end_date {
            return Err(ConfigError::Invalid(format!(
                "start_date {} is after end_date {}",
                r.start_date, r.end_date
            )));
        }

        match Url::parse(&self.feed.base_url) {
            Ok(url) if url.has_host() => Ok(()),
            Ok(_) => Err(ConfigError::Invalid(format!(
                "base_url {} has no host",
                self.feed.base_url
            ))),
            Err(e) => Err(ConfigError::Invalid(format!(
                "base_url {} is not a valid URL: {e}",
                self.feed.base_url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.pipeline.workers, 3);
        assert_eq!(config.pipeline.max_page, 10);
        assert_eq!(config.ranking.top_k, 20);
        assert_eq!(config.output.format, OutputFormat::Html);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = PipelineConfig::from_yaml_str(
            r#"
pipeline:
  workers: 4
  deadline_secs: 90
ranking:
  start_date: 2020-01-01
  end_date: 2024-12-31
output:
  format: json
"#,
        )
        .unwrap();

        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.pipeline.page_size, 50);
        assert_eq!(config.pipeline.deadline(), Some(Duration::from_secs(90)));
        assert_eq!(
            config.ranking.start_date,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
        assert_eq!(config.ranking.top_k, 20);
        assert_eq!(config.feed.location, "msk");
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_unknown_format_fails_to_parse() {
        let err = PipelineConfig::from_yaml_str("output:\n  format: pdf\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let mut config = PipelineConfig::default();
        config.pipeline.max_concurrent_requests = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let mut config = PipelineConfig::default();
        config.ranking.start_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("after end_date"));
    }

    #[test]
    fn test_relative_base_url_is_rejected() {
        let mut config = PipelineConfig::default();
        config.feed.base_url = "/news/".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_window_is_inclusive() {
        let ranking = RankingSettings::default();
        assert!(ranking.contains(ranking.start_date));
        assert!(ranking.contains(ranking.end_date));
        assert!(!ranking.contains(ranking.end_date.succ_opt().unwrap()));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = PipelineConfig::from_yaml_file(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/config.yaml"));
    }
}
