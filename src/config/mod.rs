//! Configuration management for the newsgate collector
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Site definitions live in a separate sites file,
//! see [`sites`].

pub mod sites;

pub use sites::{load_sites, parse_sites, SiteConfig, SiteEntry, SitesFormat};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::crawler::headers::{DEFAULT_ACCEPT_LANGUAGE, DEFAULT_USER_AGENT};
use crate::parser::date::{parse_timezone, DEFAULT_TIMEZONE};

/// Placeholder title for articles whose title could not be recovered
pub const DEFAULT_TITLE_PLACEHOLDER: &str = "Без назви";

/// Upper bound for `crawler.max_retries`
pub const MAX_RETRIES: u32 = 10;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP and politeness settings
    pub crawler: CrawlerConfig,

    /// What to collect and how much
    pub collection: CollectionConfig,

    /// Moderation queue location
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Crawler-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// User agent string
    pub user_agent: String,

    /// Accept-Language header value
    pub accept_language: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Retries on 429/5xx before a page is given up
    pub max_retries: u32,

    /// Base delay for exponential retry backoff, in milliseconds
    pub retry_base_delay_ms: u64,

    /// Rate limit (requests per second)
    pub requests_per_second: u32,

    /// Polite delay between page fetches within a site, in milliseconds
    pub delay_ms: u64,

    /// Upper bound of the random jitter added to the polite delay
    pub jitter_ms: u64,

    /// Maximum page fetches per site per run
    pub max_fetches_per_site: usize,

    /// Wall-clock limit for one run, in seconds
    pub run_deadline_secs: u64,

    /// Honour robots.txt
    pub respect_robots: bool,
}

impl CrawlerConfig {
    /// Per-request timeout
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Wall-clock limit for one run
    #[must_use]
    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }
}

/// Collection run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Sites file (YAML or TOML)
    pub sites_path: PathBuf,

    /// Global cap on records per run
    pub max_items: usize,

    /// Default per-site cap
    pub max_per_site: usize,

    /// IANA timezone for published dates
    pub timezone: String,

    /// Title used when none can be extracted
    pub title_placeholder: String,
}

/// Moderation queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    pub db_path: PathBuf,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            request_timeout_secs: 20,
            max_retries: 2,
            retry_base_delay_ms: 1000,
            requests_per_second: 2,
            delay_ms: 700,
            jitter_ms: 300,
            max_fetches_per_site: 50,
            run_deadline_secs: 600,
            respect_robots: true,
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            sites_path: PathBuf::from("sites.yaml"),
            max_items: 20,
            max_per_site: 10,
            timezone: DEFAULT_TIMEZONE.to_string(),
            title_placeholder: DEFAULT_TITLE_PLACEHOLDER.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/news.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: LogFormat::Text,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl Config {
    /// Load configuration from `NEWSGATE_*` environment variables
    ///
    /// Unset or unparseable variables keep their default value.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Overlay `NEWSGATE_*` environment variables onto this configuration
    pub fn apply_env(&mut self) {
        let crawler = &mut self.crawler;
        if let Ok(v) = std::env::var("NEWSGATE_USER_AGENT") {
            crawler.user_agent = v;
        }
        if let Ok(v) = std::env::var("NEWSGATE_ACCEPT_LANGUAGE") {
            crawler.accept_language = v;
        }
        if let Some(v) = env_parse("NEWSGATE_REQUEST_TIMEOUT") {
            crawler.request_timeout_secs = v;
        }
        if let Some(v) = env_parse("NEWSGATE_MAX_RETRIES") {
            crawler.max_retries = v;
        }
        if let Some(v) = env_parse("NEWSGATE_RATE_LIMIT") {
            crawler.requests_per_second = v;
        }
        if let Some(v) = env_parse("NEWSGATE_DELAY_MS") {
            crawler.delay_ms = v;
        }
        if let Some(v) = env_parse("NEWSGATE_JITTER_MS") {
            crawler.jitter_ms = v;
        }
        if let Some(v) = env_parse("NEWSGATE_MAX_FETCHES_PER_SITE") {
            crawler.max_fetches_per_site = v;
        }
        if let Some(v) = env_parse("NEWSGATE_RUN_DEADLINE") {
            crawler.run_deadline_secs = v;
        }
        if let Some(v) = env_parse("NEWSGATE_RESPECT_ROBOTS") {
            crawler.respect_robots = v;
        }

        let collection = &mut self.collection;
        if let Ok(v) = std::env::var("NEWSGATE_SITES") {
            collection.sites_path = v.into();
        }
        if let Some(v) = env_parse("NEWSGATE_MAX_ITEMS") {
            collection.max_items = v;
        }
        if let Some(v) = env_parse("NEWSGATE_MAX_PER_SITE") {
            collection.max_per_site = v;
        }
        if let Ok(v) = std::env::var("NEWSGATE_TIMEZONE") {
            collection.timezone = v;
        }

        if let Ok(v) = std::env::var("NEWSGATE_DB_PATH") {
            self.storage.db_path = v.into();
        }

        if let Ok(v) = std::env::var("NEWSGATE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env_parse("NEWSGATE_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Load configuration from a TOML file
    ///
    /// Missing sections and keys take their default values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.crawler.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.crawler.max_retries > MAX_RETRIES {
            anyhow::bail!("max_retries must be at most {MAX_RETRIES}");
        }

        if self.crawler.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        if self.crawler.max_fetches_per_site == 0 {
            anyhow::bail!("max_fetches_per_site must be greater than 0");
        }

        if self.crawler.run_deadline_secs == 0 {
            anyhow::bail!("run_deadline_secs must be greater than 0");
        }

        if self.collection.max_items == 0 {
            anyhow::bail!("max_items must be greater than 0");
        }

        if self.collection.max_per_site == 0 {
            anyhow::bail!("max_per_site must be greater than 0");
        }

        parse_timezone(&self.collection.timezone)
            .with_context(|| format!("Invalid timezone: {}", self.collection.timezone))?;

        Ok(())
    }
}
