//! Construction of the complete interval a crawl should cover

use crate::range::DateInterval;
use crate::IntervalError;
use chrono::{Local, NaiveDate};

/// Earliest date the archive API has data for
pub const DEFAULT_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(2007, 1, 1) {
    Some(date) => date,
    None => panic!("invalid default epoch"),
};

/// Returns the interval from `start` (or [`DEFAULT_EPOCH`]) up to and including today
///
/// The end bound is tomorrow, so today's records fall inside the half-open
/// interval. Today is read from the local clock.
///
/// # Returns
///
/// * `Ok(DateInterval)` - The complete interval
/// * `Err(IntervalError::Inverted)` - `start` lies after today
pub fn complete_range(start: Option<NaiveDate>) -> Result<DateInterval, IntervalError> {
    complete_range_at(start, Local::now().date_naive())
}

/// Same as [`complete_range`] with an explicit notion of "today"
pub fn complete_range_at(
    start: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateInterval, IntervalError> {
    let start = start.unwrap_or(DEFAULT_EPOCH);
    let end = today.succ_opt().ok_or(IntervalError::OutOfRange(today))?;
    DateInterval::new(start, end)
}
