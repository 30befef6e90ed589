//! Date range module
//!
//! This module contains the date arithmetic used to plan crawl requests:
//! - `DateInterval`: the half-open interval value type
//! - Calendar partitioning by year and by month
//! - Interval containment
//! - Construction of the complete interval to crawl

mod containment;
mod factory;
mod interval;
mod partition;

pub use containment::contains;
pub use factory::{complete_range, complete_range_at, DEFAULT_EPOCH};
pub use interval::{parse_date, DateInterval};
pub use partition::{map_months, map_years, months, years, CalendarBucket, CalendarUnit, Partition};
