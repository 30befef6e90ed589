use crate::crawler::CrawlStrategy;
use crate::range::DEFAULT_EPOCH;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Cityment
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Archive API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Endpoint URL requests are sent to
    pub endpoint: String,

    /// Number of items after which the API truncates a response
    #[serde(rename = "page-size")]
    pub page_size: usize,

    /// Request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra query parameters sent with every request
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// Crawl planning configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// First date to crawl when no explicit start is given
    #[serde(default = "default_epoch")]
    pub epoch: NaiveDate,

    /// Request planning strategy
    #[serde(default)]
    pub strategy: CrawlStrategy,

    /// Maximum number of requests a single crawl may issue
    #[serde(rename = "max-requests", default)]
    pub max_requests: Option<u32>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            epoch: default_epoch(),
            strategy: CrawlStrategy::default(),
            max_requests: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory raw response bodies are archived to, if any
    #[serde(rename = "archive-dir", default)]
    pub archive_dir: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_epoch() -> NaiveDate {
    DEFAULT_EPOCH
}
