//! Calendar partitioning of date intervals
//!
//! Splits an interval into contiguous sub-intervals aligned to calendar year or
//! calendar month boundaries. The sequences are lazy, restartable (`Clone`)
//! and can be walked from either end, which is what the calendar-walk crawl
//! strategy uses to plan most-recent-first requests.

use crate::range::DateInterval;
use chrono::{Datelike, NaiveDate};

/// Calendar unit a bucket is aligned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarUnit {
    Year,
    Month,
}

impl CalendarUnit {
    /// First day of the unit containing `date`
    fn floor(self, date: NaiveDate) -> NaiveDate {
        let floored = match self {
            Self::Year => date.with_ordinal(1),
            Self::Month => date.with_day(1),
        };
        floored.unwrap_or(date)
    }

    /// First day of the unit following the one containing `date`
    ///
    /// Returns `None` past the last representable date.
    fn next_start(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Year => NaiveDate::from_ymd_opt(date.year() + 1, 1, 1),
            Self::Month if date.month() == 12 => NaiveDate::from_ymd_opt(date.year() + 1, 1, 1),
            Self::Month => NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1),
        }
    }
}

/// A sub-interval produced by partitioning, tagged with its calendar unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarBucket {
    pub unit: CalendarUnit,
    pub interval: DateInterval,
}

/// Lazy sequence of calendar-aligned sub-intervals
///
/// The union of all yielded intervals equals the partitioned interval; each
/// one lies within a single calendar unit and they never overlap.
#[derive(Debug, Clone)]
pub struct Partition {
    unit: CalendarUnit,
    front: NaiveDate,
    back: NaiveDate,
}

impl Partition {
    pub fn new(interval: DateInterval, unit: CalendarUnit) -> Self {
        Self {
            unit,
            front: interval.start(),
            back: interval.end(),
        }
    }

    fn bucket(&self, start: NaiveDate, end: NaiveDate) -> CalendarBucket {
        CalendarBucket {
            unit: self.unit,
            interval: DateInterval::from_ordered(start, end),
        }
    }
}

impl Iterator for Partition {
    type Item = CalendarBucket;

    fn next(&mut self) -> Option<CalendarBucket> {
        if self.front >= self.back {
            return None;
        }

        let start = self.front;
        let end = match self.unit.next_start(start) {
            Some(boundary) if boundary < self.back => boundary,
            _ => self.back,
        };
        self.front = end;

        Some(self.bucket(start, end))
    }
}

impl DoubleEndedIterator for Partition {
    fn next_back(&mut self) -> Option<CalendarBucket> {
        if self.front >= self.back {
            return None;
        }

        let end = self.back;
        let last_day = end.pred_opt()?;
        let start = self.unit.floor(last_day).max(self.front);
        self.back = start;

        Some(self.bucket(start, end))
    }
}

/// Partitions an interval by calendar year
///
/// # Example
///
/// ```
/// use cityment::range::{parse_date, years, DateInterval};
///
/// let interval = DateInterval::new(
///     parse_date("2009-01-01").unwrap(),
///     parse_date("2011-01-01").unwrap(),
/// )
/// .unwrap();
/// assert_eq!(years(interval).count(), 2);
/// ```
pub fn years(interval: DateInterval) -> Partition {
    Partition::new(interval, CalendarUnit::Year)
}

/// Partitions an interval by calendar month
pub fn months(interval: DateInterval) -> Partition {
    Partition::new(interval, CalendarUnit::Month)
}

/// Passes every by-year sub-interval to `f` and collects the results in order
pub fn map_years<T, F>(interval: DateInterval, f: F) -> Vec<T>
where
    F: FnMut(DateInterval) -> T,
{
    years(interval).map(|bucket| bucket.interval).map(f).collect()
}

/// Passes every by-month sub-interval to `f` and collects the results in order
pub fn map_months<T, F>(interval: DateInterval, f: F) -> Vec<T>
where
    F: FnMut(DateInterval) -> T,
{
    months(interval).map(|bucket| bucket.interval).map(f).collect()
}
