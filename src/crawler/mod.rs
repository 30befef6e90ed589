//! Crawler module for date-windowed fetching
//!
//! This module contains the core crawling logic, including:
//! - The adaptive range crawl loop and its calendar-walk variant
//! - The fetcher interface and its HTTP implementation
//! - Cooperative cancellation between requests
//! - Overall crawl coordination

mod cancel;
mod coordinator;
mod fetcher;
mod range_crawler;

pub use cancel::CancelFlag;
pub use coordinator::{Coordinator, RunOptions};
pub use fetcher::{
    api_format, build_http_client, satisfied_window, stamp, Article, FetchedBatch, Fetcher,
    HttpFetcher, API_DATETIME_FORMAT, STAMP_FORMAT,
};
pub use range_crawler::{CrawlReport, CrawlStrategy, RangeCrawler};
