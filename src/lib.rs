//! Cityment: a date-windowed archive crawler
//!
//! This crate covers an arbitrary date span of a remote news API with a short
//! sequence of bounded requests. The API only serves bounded windows and may
//! truncate a response to an older-edge sub-window, so the crawler shrinks its
//! request after every partial answer until the whole span is covered.

pub mod config;
pub mod crawler;
pub mod output;
pub mod range;
pub mod storage;

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for Cityment operations
#[derive(Debug, Error)]
pub enum CitymentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Interval error: {0}")]
    Interval(#[from] IntervalError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised when building date intervals
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("Interval start {start} is after its end {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },

    #[error("Invalid date {0}")]
    Parse(String),

    #[error("Date out of range after {0}")]
    OutOfRange(NaiveDate),
}

/// Errors produced by a [`crawler::Fetcher`] for a single request window
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {interval}: {source}")]
    Http {
        interval: DateInterval,
        source: reqwest::Error,
    },

    #[error("HTTP status {status} for {interval}")]
    Status { interval: DateInterval, status: u16 },

    #[error("Undecodable response for {interval}: {message}")]
    Decode {
        interval: DateInterval,
        message: String,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Error type a batch consumer may return to abort a crawl
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that end a crawl invocation
///
/// Every variant carries the interval that is still not confirmed covered, so
/// the caller can resume by crawling it as a new target.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Fetch failed, {remaining} left uncovered: {source}")]
    Fetch {
        source: FetchError,
        remaining: DateInterval,
    },

    #[error("Fetcher answered {requested} with {satisfied}, {remaining} left uncovered")]
    MalformedResponse {
        requested: DateInterval,
        satisfied: DateInterval,
        remaining: DateInterval,
    },

    #[error("Batch consumer failed, {remaining} left uncovered: {source}")]
    Sink {
        source: SinkError,
        remaining: DateInterval,
    },

    #[error("Crawl cancelled, {remaining} left uncovered")]
    Cancelled { remaining: DateInterval },

    #[error("Request limit of {limit} reached, {remaining} left uncovered")]
    RequestLimit { limit: u32, remaining: DateInterval },
}

impl CrawlError {
    /// The interval the crawl did not confirm as covered
    pub fn remaining(&self) -> DateInterval {
        match self {
            Self::Fetch { remaining, .. }
            | Self::MalformedResponse { remaining, .. }
            | Self::Sink { remaining, .. }
            | Self::Cancelled { remaining }
            | Self::RequestLimit { remaining, .. } => *remaining,
        }
    }
}

/// Result type alias for Cityment operations
pub type Result<T> = std::result::Result<T, CitymentError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlStrategy, Fetcher, RangeCrawler};
pub use range::{complete_range, contains, DateInterval};
