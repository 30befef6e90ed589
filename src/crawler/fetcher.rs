//! HTTP fetcher implementation
//!
//! This module defines the single-request interface the crawl loop consumes and
//! its implementation against the archive API:
//! - Building HTTP clients with proper user agent strings
//! - Encoding request windows in the API's date format
//! - Decoding article lists from JSON responses
//! - Working out which part of a request window a truncated page covers

use crate::config::{ApiConfig, UserAgentConfig};
use crate::range::DateInterval;
use crate::FetchError;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

/// Date-time format the archive API expects in query parameters
pub const API_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Compact date-time format used to name archived payloads
pub const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Formats a date-time the way the archive API expects it
pub fn api_format(dt: NaiveDateTime) -> String {
    dt.format(API_DATETIME_FORMAT).to_string()
}

/// Formats a date-time as a compact stamp
pub fn stamp(dt: NaiveDateTime) -> String {
    dt.format(STAMP_FORMAT).to_string()
}

/// One answered request
#[derive(Debug, Clone)]
pub struct FetchedBatch<R> {
    /// The part of the requested window the response actually covers
    pub satisfied: DateInterval,

    /// Records returned for `satisfied`, passed through unmodified
    pub records: Vec<R>,

    /// Raw response body, if the fetcher keeps it
    pub raw: Option<String>,
}

impl<R> FetchedBatch<R> {
    pub fn new(satisfied: DateInterval, records: Vec<R>) -> Self {
        Self {
            satisfied,
            records,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: String) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// Performs a single bounded request for a date window
///
/// Implementations must answer with a satisfied window that ends where the
/// request ends and starts no earlier than the request starts. The server is
/// assumed to always serve the recent edge of a window and to truncate only
/// from the older edge.
#[async_trait]
pub trait Fetcher: Send + Sync {
    type Record: Send;

    async fn fetch(&self, interval: DateInterval)
        -> Result<FetchedBatch<Self::Record>, FetchError>;
}

/// An article as returned by the archive API
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Stable identifier, used as the storage key
    pub id: String,

    /// Publication time
    pub published_at: NaiveDateTime,

    /// Headline, if present
    pub title: Option<String>,

    /// The full item as returned by the API
    pub payload: Value,
}

impl Article {
    /// Builds an article from one item of an API response
    fn from_item(item: Map<String, Value>) -> Result<Self, String> {
        let id = match item.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err("item without id".to_string()),
        };

        let published_at = item
            .get("date")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("item {} without date", id))
            .and_then(|s| {
                NaiveDateTime::parse_from_str(s, API_DATETIME_FORMAT)
                    .map_err(|e| format!("item {} has bad date '{}': {}", id, s, e))
            })?;

        let title = item
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            id,
            published_at,
            title,
            payload: Value::Object(item),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Vec<Map<String, Value>>,
}

/// Works out which part of `requested` a response with these item dates covers
///
/// A response with fewer than `page_size` items is complete. A full page was
/// probably cut off, so only the days after the oldest returned day count as
/// covered; that day is asked for again by the next request. If every item
/// falls on the last requested day, the page is accepted down to that day to
/// guarantee progress.
pub fn satisfied_window(
    requested: DateInterval,
    dates: &[NaiveDate],
    page_size: usize,
) -> DateInterval {
    if dates.len() < page_size {
        return requested;
    }

    let Some(oldest) = dates.iter().min().copied() else {
        return requested;
    };
    let last_day = requested.last_day().unwrap_or(requested.start());
    let oldest = oldest.clamp(requested.start(), last_day);

    let start = match oldest.succ_opt() {
        Some(next) if next < requested.end() => next,
        _ => {
            tracing::warn!(
                "Page for {} is full within {}, some records of that day may be missing",
                requested,
                oldest
            );
            oldest
        }
    };

    DateInterval::from_ordered(start, requested.end())
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `api` - The API configuration (for the timeout)
/// * `user_agent` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    api: &ApiConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(api.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher for the archive API
pub struct HttpFetcher {
    client: Client,
    endpoint: Url,
    params: Vec<(String, String)>,
    page_size: usize,
}

impl HttpFetcher {
    /// Creates a fetcher from configuration
    pub fn new(api: &ApiConfig, user_agent: &UserAgentConfig) -> Result<Self, FetchError> {
        let endpoint = Url::parse(&api.endpoint)
            .map_err(|e| FetchError::Other(format!("Invalid endpoint '{}': {}", api.endpoint, e)))?;
        let client = build_http_client(api, user_agent)?;

        Ok(Self {
            client,
            endpoint,
            params: api
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            page_size: api.page_size,
        })
    }

    /// Query parameters for a request window
    fn window_params(interval: DateInterval) -> [(&'static str, String); 2] {
        [
            ("betweena", api_format(interval.start().and_time(NaiveTime::default()))),
            ("betweenb", api_format(interval.end().and_time(NaiveTime::default()))),
        ]
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    type Record = Article;

    async fn fetch(&self, interval: DateInterval) -> Result<FetchedBatch<Article>, FetchError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&self.params)
            .query(&Self::window_params(interval))
            .send()
            .await
            .map_err(|source| FetchError::Http { interval, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                interval,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Http { interval, source })?;

        let decoded: ApiResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode {
                interval,
                message: e.to_string(),
            })?;

        let item_count = decoded.items.len();
        let mut articles = Vec::with_capacity(item_count);
        for item in decoded.items {
            match Article::from_item(item) {
                Ok(article) => articles.push(article),
                Err(message) => return Err(FetchError::Decode { interval, message }),
            }
        }

        let dates: Vec<NaiveDate> = articles.iter().map(|a| a.published_at.date()).collect();
        if let Some(outside) = dates.iter().find(|d| !interval.includes(**d)) {
            return Err(FetchError::Decode {
                interval,
                message: format!("item dated {} lies outside the requested window", outside),
            });
        }
        let satisfied = satisfied_window(interval, &dates, self.page_size);

        tracing::debug!(
            "Fetched {} items for {}, satisfied {}",
            item_count,
            interval,
            satisfied
        );

        Ok(FetchedBatch::new(satisfied, articles).with_raw(body))
    }
}
