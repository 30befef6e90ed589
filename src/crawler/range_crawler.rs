//! Adaptive date-range crawl loop
//!
//! The crawler covers a target interval most-recent-first. Every request asks
//! for the whole still-uncovered interval; the fetcher reports the sub-window
//! the server actually answered, which always shares the request's end date.
//! Whatever older part was cut off becomes the next request, until nothing is
//! left.
//!
//! # State machine
//!
//! | State | Event | Next |
//! |-------|-------|------|
//! | Pending(r) | satisfied.start == r.start | Done |
//! | Pending(r) | satisfied.start > r.start | Pending(r.start..satisfied.start) |
//! | Pending(r) | fetch error / malformed answer / cancel | stop, `r` is resumable |

use crate::crawler::{CancelFlag, FetchedBatch, Fetcher};
use crate::range::{contains, months, DateInterval};
use crate::{CrawlError, SinkError};
use chrono::NaiveDate;
use serde::Deserialize;

/// How the crawler generates its request sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlStrategy {
    /// Request the whole remaining interval and shrink after every partial answer
    #[default]
    Adaptive,

    /// Walk the month partition newest-first, shrinking within a month if needed
    CalendarMonths,
}

/// Summary of a finished crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlReport {
    /// The interval that is now fully covered
    pub covered: DateInterval,

    /// Number of fetches issued
    pub requests: u32,

    /// Number of records delivered to the batch consumer
    pub records: usize,
}

/// Drives the bounded request loop over a target interval
#[derive(Debug, Clone, Default)]
pub struct RangeCrawler {
    strategy: CrawlStrategy,
    max_requests: Option<u32>,
    cancel: CancelFlag,
}

impl RangeCrawler {
    pub fn new(strategy: CrawlStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Caps the number of fetches a single crawl may issue
    pub fn with_max_requests(mut self, limit: Option<u32>) -> Self {
        self.max_requests = limit;
        self
    }

    /// Flag that stops this crawler before its next request
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Covers `target` by repeatedly calling `fetcher`
    ///
    /// `on_batch` receives every successful answer, most recent first, before
    /// the next request is computed. A failing fetch, a response that breaks the
    /// fetcher contract, a failing `on_batch`, cancellation and the request cap
    /// all stop the crawl with an error carrying the interval left uncovered.
    ///
    /// # Arguments
    ///
    /// * `target` - The interval to cover
    /// * `fetcher` - Performs one bounded request
    /// * `on_batch` - Consumes each answered batch
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - `target` is fully covered
    /// * `Err(CrawlError)` - The crawl stopped early
    pub async fn crawl<F, B>(
        &self,
        target: DateInterval,
        fetcher: &F,
        mut on_batch: B,
    ) -> Result<CrawlReport, CrawlError>
    where
        F: Fetcher + ?Sized,
        B: FnMut(FetchedBatch<F::Record>) -> Result<(), SinkError>,
    {
        let mut report = CrawlReport {
            covered: target,
            requests: 0,
            records: 0,
        };

        if target.is_empty() {
            tracing::debug!("Target {} is empty, nothing to crawl", target);
            return Ok(report);
        }

        tracing::info!("Crawling {} ({:?} strategy)", target, self.strategy);

        match self.strategy {
            CrawlStrategy::Adaptive => {
                self.shrink(target, target.start(), fetcher, &mut on_batch, &mut report)
                    .await?;
            }
            CrawlStrategy::CalendarMonths => {
                for month in months(target).rev() {
                    self.shrink(
                        month.interval,
                        target.start(),
                        fetcher,
                        &mut on_batch,
                        &mut report,
                    )
                    .await?;
                }
            }
        }

        tracing::info!(
            "Covered {} with {} requests ({} records)",
            target,
            report.requests,
            report.records
        );

        Ok(report)
    }

    /// Shrinks requests within `window` until it is covered
    ///
    /// `floor` is the start of the whole crawl target; errors report everything
    /// from `floor` up to the uncovered end as remaining.
    async fn shrink<F, B>(
        &self,
        window: DateInterval,
        floor: NaiveDate,
        fetcher: &F,
        on_batch: &mut B,
        report: &mut CrawlReport,
    ) -> Result<(), CrawlError>
    where
        F: Fetcher + ?Sized,
        B: FnMut(FetchedBatch<F::Record>) -> Result<(), SinkError>,
    {
        let mut remaining = window;

        while !remaining.is_empty() {
            let pending = DateInterval::from_ordered(floor, remaining.end());

            if self.cancel.is_cancelled() {
                tracing::info!("Crawl cancelled with {} uncovered", pending);
                return Err(CrawlError::Cancelled { remaining: pending });
            }

            if let Some(limit) = self.max_requests {
                if report.requests >= limit {
                    tracing::warn!("Request limit {} reached with {} uncovered", limit, pending);
                    return Err(CrawlError::RequestLimit {
                        limit,
                        remaining: pending,
                    });
                }
            }

            tracing::debug!("Requesting {}", remaining);
            let batch = fetcher
                .fetch(remaining)
                .await
                .map_err(|source| CrawlError::Fetch {
                    source,
                    remaining: pending,
                })?;
            report.requests += 1;

            let satisfied = batch.satisfied;
            if satisfied.end() != remaining.end() || !contains(&remaining, &satisfied) {
                tracing::error!("Fetcher answered {} with {}", remaining, satisfied);
                return Err(CrawlError::MalformedResponse {
                    requested: remaining,
                    satisfied,
                    remaining: pending,
                });
            }

            if satisfied.start() != remaining.start() {
                tracing::debug!(
                    "Request {} truncated to {}, shrinking",
                    remaining,
                    satisfied
                );
            }
            if satisfied.is_empty() {
                tracing::warn!("Request {} was answered with no coverage", remaining);
            }

            report.records += batch.records.len();
            on_batch(batch).map_err(|source| CrawlError::Sink {
                source,
                remaining: pending,
            })?;

            remaining = DateInterval::from_ordered(remaining.start(), satisfied.start());
        }

        Ok(())
    }
}
