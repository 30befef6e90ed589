//! Output module for crawl artifacts and reports
//!
//! This module handles:
//! - Archiving raw response payloads
//! - Recording and displaying archive statistics

pub mod archive;
pub mod stats;

pub use archive::{archive_file_name, archive_payload};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
