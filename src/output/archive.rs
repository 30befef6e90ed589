//! Raw payload archive
//!
//! Every fetched response body can be kept on disk next to the database, one
//! file per answered window, named after the window's bounds.

use crate::crawler::stamp;
use crate::range::DateInterval;
use chrono::NaiveTime;
use std::fs;
use std::path::{Path, PathBuf};

/// File name for the payload of an answered window
pub fn archive_file_name(interval: DateInterval) -> String {
    format!(
        "{}-{}.json",
        stamp(interval.start().and_time(NaiveTime::default())),
        stamp(interval.end().and_time(NaiveTime::default()))
    )
}

/// Writes a raw response body into `dir`, creating the directory if needed
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written file
/// * `Err(std::io::Error)` - Failed to create the directory or write the file
pub fn archive_payload(dir: &Path, interval: DateInterval, raw: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(archive_file_name(interval));
    fs::write(&path, raw)?;
    tracing::debug!("Archived payload for {} to {}", interval, path.display());
    Ok(path)
}
