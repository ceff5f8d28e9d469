//! Runtime configuration.
//!
//! Everything has a default, so the service runs without a config file. A
//! YAML file passed with `--config` overrides any subset of the fields:
//!
//! ```yaml
//! language: en-US
//! region: US
//! edition: US:en
//! max_results: 500
//! display_utc_offset: "-05:00"
//! summary:
//!   model: gemini-2.0-flash
//! ```
//!
//! The summary API key may also come from the `API_KEY` or `GEMINI_API_KEY`
//! environment variables.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

use crate::error::NewsError;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// RSS search endpoint.
    pub feed_endpoint: String,
    /// `hl` parameter.
    pub language: String,
    /// `gl` parameter.
    pub region: String,
    /// `ceid` parameter.
    pub edition: String,
    /// Items kept from a single window's feed.
    pub per_window_limit: usize,
    /// Aggregation cap.
    pub max_results: usize,
    pub fetch_timeout_secs: u64,
    pub resolve_timeout_secs: u64,
    pub resolve_concurrency: usize,
    /// Host of the redirect wrapper links.
    pub wrapper_host: String,
    /// Offset used to render publish dates, e.g. `+08:00`.
    pub display_utc_offset: String,
    /// `Cache-Control` value on search responses.
    pub cache_control: String,
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Generative Language REST base, without the `/models/...` suffix.
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Items included in one prompt; `None` means the aggregation cap.
    pub max_items: Option<usize>,
    pub max_retries: usize,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_endpoint: "https://news.google.com/rss/search".to_string(),
            language: "zh-CN".to_string(),
            region: "CN".to_string(),
            edition: "CN:zh-Hans".to_string(),
            per_window_limit: 100,
            max_results: 300,
            fetch_timeout_secs: 8,
            resolve_timeout_secs: 4,
            resolve_concurrency: 24,
            wrapper_host: "news.google.com".to_string(),
            display_utc_offset: "+08:00".to_string(),
            cache_control: "s-maxage=1800, stale-while-revalidate".to_string(),
            summary: SummaryConfig::default(),
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            max_items: None,
            max_retries: 2,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load from an optional YAML file, then pick up the API key from the
    /// environment if the file did not set one.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, NewsError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        if config.summary.api_key.is_none() {
            config.summary.api_key = std::env::var("API_KEY")
                .or_else(|_| std::env::var("GEMINI_API_KEY"))
                .ok()
                .filter(|k| !k.trim().is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, NewsError> {
        if !Path::new(path).exists() {
            return Err(NewsError::Config(format!("config file {path} not found")));
        }
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&text)?;
        info!(path, "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), NewsError> {
        self.display_offset()?;
        url::Url::parse(&self.feed_endpoint)
            .map_err(|e| NewsError::Config(format!("feed_endpoint: {e}")))?;
        if self.max_results == 0 || self.per_window_limit == 0 {
            return Err(NewsError::Config(
                "max_results and per_window_limit must be positive".to_string(),
            ));
        }
        if self.resolve_concurrency == 0 {
            return Err(NewsError::Config(
                "resolve_concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn display_offset(&self) -> Result<FixedOffset, NewsError> {
        self.display_utc_offset.parse::<FixedOffset>().map_err(|e| {
            NewsError::Config(format!(
                "display_utc_offset {:?}: {e}",
                self.display_utc_offset
            ))
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn summary_max_items(&self) -> usize {
        self.summary.max_items.unwrap_or(self.max_results)
    }
}
