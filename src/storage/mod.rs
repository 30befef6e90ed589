//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Idempotent article persistence
//! - Run tracking and resumption support

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::range::DateInterval;
use crate::CitymentError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(CitymentError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CitymentError> {
    SqliteStorage::new(path)
}

/// Represents a stored article
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub id: String,
    pub published_at: String,
    pub title: Option<String>,
    pub payload: String,
    pub fetched_at: String,
    pub fetched_run: i64,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub target: DateInterval,
    /// Part of `target` not yet covered; `None` once the run completed
    pub remaining: Option<DateInterval>,
}

impl RunRecord {
    /// Returns true if the run stopped with part of its target uncovered
    pub fn is_resumable(&self) -> bool {
        !matches!(self.status, RunStatus::Completed)
            && self.remaining.is_some_and(|r| !r.is_empty())
    }
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn all() -> [Self; 4] {
        [
            Self::Running,
            Self::Completed,
            Self::Interrupted,
            Self::Failed,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::parse_date;

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
        assert_eq!(RunStatus::from_db_string("Running"), None);
    }

    #[test]
    fn test_run_resumable() {
        let target = DateInterval::new(
            parse_date("2009-01-01").unwrap(),
            parse_date("2009-04-01").unwrap(),
        )
        .unwrap();
        let mut run = RunRecord {
            id: 1,
            started_at: "2011-01-01T00:00:00+00:00".to_string(),
            finished_at: None,
            config_hash: "abc".to_string(),
            status: RunStatus::Interrupted,
            target,
            remaining: Some(target),
        };
        assert!(run.is_resumable());

        run.remaining = Some(DateInterval::empty_at(target.start()));
        assert!(!run.is_resumable());

        run.remaining = Some(target);
        run.status = RunStatus::Completed;
        assert!(!run.is_resumable());
    }
}
