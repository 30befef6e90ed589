//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::Article;
use crate::range::DateInterval;
use crate::storage::{ArticleRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Storing an article is idempotent: storing the same id again replaces the
/// previous row instead of adding a duplicate.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `target` - The interval the run should cover
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, target: DateInterval) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Records the part of a run's target that is not yet covered
    fn update_remaining(&mut self, run_id: i64, remaining: DateInterval) -> StorageResult<()>;

    /// Marks a run as completed, clearing its remaining interval
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    /// Counts runs with the given status
    fn count_runs_by_status(&self, status: RunStatus) -> StorageResult<u64>;

    // ===== Article Management =====

    /// Inserts or replaces articles, returning how many were stored
    fn upsert_articles(&mut self, articles: &[Article], run_id: i64) -> StorageResult<usize>;

    /// Gets an article by ID
    fn get_article(&self, id: &str) -> StorageResult<Option<ArticleRecord>>;

    /// Gets total article count
    fn count_articles(&self) -> StorageResult<u64>;

    /// Counts articles published within an interval
    fn count_articles_in(&self, interval: DateInterval) -> StorageResult<u64>;

    /// Interval spanning the oldest to the newest stored article
    ///
    /// Returns `None` when nothing is stored yet.
    fn saved_range(&self) -> StorageResult<Option<DateInterval>>;
}
