//! Half-open date interval used as the unit of request and coverage
//!
//! An interval includes its start date and excludes its end date. An interval
//! whose start equals its end is empty and denotes "nothing to crawl".

use crate::IntervalError;
use chrono::NaiveDate;
use std::fmt;

/// A half-open `[start, end)` range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateInterval {
    /// Creates a new interval, rejecting `start > end`
    ///
    /// # Arguments
    ///
    /// * `start` - First date covered by the interval
    /// * `end` - First date after the interval
    ///
    /// # Returns
    ///
    /// * `Ok(DateInterval)` - The interval
    /// * `Err(IntervalError::Inverted)` - `start` is after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, IntervalError> {
        if start > end {
            return Err(IntervalError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds an interval from bounds already known to be ordered
    pub(crate) fn from_ordered(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "unordered bounds {}..{}", start, end);
        Self { start, end }
    }

    /// Creates an empty interval anchored at `date`
    pub fn empty_at(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns true if the interval covers no dates
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Number of days covered
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Returns true if `date` lies inside the interval
    pub fn includes(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Last date covered by the interval, or `None` if it is empty
    pub fn last_day(&self) -> Option<NaiveDate> {
        if self.is_empty() {
            None
        } else {
            self.end.pred_opt()
        }
    }
}

impl fmt::Display for DateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Parses a `YYYY-MM-DD` date, the format used by config files and the CLI
pub fn parse_date(s: &str) -> Result<NaiveDate, IntervalError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| IntervalError::Parse(format!("'{}': {}", s, e)))
}
