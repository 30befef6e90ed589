//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the Cityment database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs and how much of their target is still uncovered
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    target_start TEXT NOT NULL,
    target_end TEXT NOT NULL,
    remaining_start TEXT,
    remaining_end TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);

-- Archived articles, keyed by the API's id
CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY,
    published_at TEXT NOT NULL,
    title TEXT,
    payload TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    fetched_run INTEGER NOT NULL REFERENCES runs(id)
);

CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
