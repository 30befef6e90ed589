//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::{api_format, Article};
use crate::range::{parse_date, DateInterval};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ArticleRecord, RunRecord, RunStatus};
use crate::CitymentError;
use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, \
     target_start, target_end, remaining_start, remaining_end";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CitymentError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CitymentError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, CitymentError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    parse_date(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn interval_columns(row: &Row<'_>, start: usize, end: usize) -> rusqlite::Result<DateInterval> {
    let interval = DateInterval::new(date_column(row, start)?, date_column(row, end)?);
    interval.map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(start, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let status: String = row.get(4)?;
    let remaining = match row.get::<_, Option<String>>(7)? {
        Some(_) => Some(interval_columns(row, 7, 8)?),
        None => None,
    };

    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&status).unwrap_or(RunStatus::Failed),
        target: interval_columns(row, 5, 6)?,
        remaining,
    })
}

/// Day bounds of an interval as `published_at` comparison strings
fn published_bounds(interval: DateInterval) -> (String, String) {
    let midnight = |d: NaiveDate| api_format(d.and_time(NaiveTime::default()));
    (midnight(interval.start()), midnight(interval.end()))
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str, target: DateInterval) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status, target_start, target_end,
             remaining_start, remaining_end) VALUES (?1, ?2, ?3, ?4, ?5, ?4, ?5)",
            params![
                now,
                config_hash,
                RunStatus::Running.to_db_string(),
                target.start().to_string(),
                target.end().to_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?;

        run.ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn update_remaining(&mut self, run_id: i64, remaining: DateInterval) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET remaining_start = ?1, remaining_end = ?2 WHERE id = ?3",
            params![
                remaining.start().to_string(),
                remaining.end().to_string(),
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, remaining_start = NULL,
             remaining_end = NULL WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn count_runs_by_status(&self, status: RunStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM runs WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Article Management =====

    fn upsert_articles(&mut self, articles: &[Article], run_id: i64) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO articles (id, published_at, title, payload, fetched_at, fetched_run)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    published_at = excluded.published_at,
                    title = excluded.title,
                    payload = excluded.payload,
                    fetched_at = excluded.fetched_at,
                    fetched_run = excluded.fetched_run",
            )?;

            for article in articles {
                let payload = serde_json::to_string(&article.payload)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                stmt.execute(params![
                    article.id,
                    api_format(article.published_at),
                    article.title,
                    payload,
                    now,
                    run_id
                ])?;
            }
        }
        tx.commit()?;

        Ok(articles.len())
    }

    fn get_article(&self, id: &str) -> StorageResult<Option<ArticleRecord>> {
        let article = self
            .conn
            .query_row(
                "SELECT id, published_at, title, payload, fetched_at, fetched_run
                 FROM articles WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ArticleRecord {
                        id: row.get(0)?,
                        published_at: row.get(1)?,
                        title: row.get(2)?,
                        payload: row.get(3)?,
                        fetched_at: row.get(4)?,
                        fetched_run: row.get(5)?,
                    })
                },
            )
            .optional()?;

        Ok(article)
    }

    fn count_articles(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_articles_in(&self, interval: DateInterval) -> StorageResult<u64> {
        let (start, end) = published_bounds(interval);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE published_at >= ?1 AND published_at < ?2",
            params![start, end],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn saved_range(&self) -> StorageResult<Option<DateInterval>> {
        let (first, last): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(published_at), MAX(published_at) FROM articles",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (Some(first), Some(last)) = (first, last) else {
            return Ok(None);
        };

        // Stored as "YYYY-MM-DD HH:MM:SS"; the date is the first ten characters
        let day = |s: &str| {
            parse_date(s.get(..10).unwrap_or(s))
                .map_err(|e| StorageError::Corrupt(e.to_string()))
        };
        let first = day(&first)?;
        let last = day(&last)?;
        let end = last
            .succ_opt()
            .ok_or_else(|| StorageError::Corrupt(format!("no date follows {}", last)))?;

        DateInterval::new(first, end)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(e.to_string()))
    }
}
