//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! archive statistics from the storage layer.

use crate::range::{map_years, DateInterval};
use crate::storage::{RunRecord, RunStatus, Storage};
use crate::CitymentError;
use chrono::Datelike;
use std::collections::HashMap;

/// Archive statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of stored articles
    pub total_articles: u64,

    /// Oldest to newest stored article
    pub saved_range: Option<DateInterval>,

    /// Stored articles per calendar year of `saved_range`
    pub articles_by_year: Vec<(i32, u64)>,

    /// Count of runs by status
    pub runs_by_status: HashMap<RunStatus, u64>,

    /// The most recent run
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CitymentError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, CitymentError> {
    let total_articles = storage.count_articles()?;
    let saved_range = storage.saved_range()?;

    let articles_by_year = match saved_range {
        Some(range) => map_years(range, |year| {
            storage
                .count_articles_in(year)
                .map(|count| (year.start().year(), count))
        })
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let mut runs_by_status = HashMap::new();
    for status in RunStatus::all() {
        let count = storage.count_runs_by_status(status)?;
        if count > 0 {
            runs_by_status.insert(status, count);
        }
    }

    let latest_run = storage.get_latest_run()?;

    Ok(CrawlStatistics {
        total_articles,
        saved_range,
        articles_by_year,
        runs_by_status,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Overview:");
    println!("  Total articles: {}", stats.total_articles);
    match stats.saved_range {
        Some(range) => println!("  Saved range: {}", range),
        None => println!("  Saved range: (empty)"),
    }
    println!();

    if !stats.articles_by_year.is_empty() {
        println!("Articles by Year:");
        for (year, count) in &stats.articles_by_year {
            println!("  {}: {}", year, count);
        }
        println!();
    }

    println!("Runs by Status:");
    let mut status_counts: Vec<_> = stats.runs_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));
    for (status, count) in status_counts {
        println!("  {:?}: {}", status, count);
    }
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run #{}:", run.id);
        println!("  Status: {:?}", run.status);
        println!("  Target: {}", run.target);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        if run.is_resumable() {
            if let Some(remaining) = run.remaining {
                println!("  Uncovered: {} (resume to continue)", remaining);
            }
        }
    }
}
