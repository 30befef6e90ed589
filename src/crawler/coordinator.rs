//! Crawler coordinator - main crawl orchestration logic
//!
//! This module connects the range crawler to the rest of the system:
//! - Initializing storage and deciding between a fresh and a resumed run
//! - Building the HTTP fetcher
//! - Persisting every answered batch and the interval still uncovered
//! - Archiving raw payloads
//! - Recording how the run ended

use crate::config::Config;
use crate::crawler::{Article, CancelFlag, CrawlReport, FetchedBatch, Fetcher, HttpFetcher, RangeCrawler};
use crate::output::archive_payload;
use crate::range::{complete_range, DateInterval};
use crate::storage::{RunStatus, SqliteStorage, Storage};
use crate::{CitymentError, CrawlError, SinkError};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// How a coordinator picks the interval to crawl
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// First date to crawl; defaults to the configured epoch
    pub since: Option<NaiveDate>,

    /// Ignore an interrupted run instead of resuming it
    pub fresh: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator<F = HttpFetcher> {
    storage: SqliteStorage,
    fetcher: F,
    crawler: RangeCrawler,
    archive_dir: Option<PathBuf>,
    run_id: i64,
    target: DateInterval,
}

impl Coordinator<HttpFetcher> {
    /// Creates a new coordinator talking to the configured API
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, stored with the run
    /// * `options` - Start date and resume behaviour
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CitymentError)` - Failed to initialize
    pub fn new(config: Config, config_hash: &str, options: RunOptions) -> Result<Self, CitymentError> {
        let fetcher = HttpFetcher::new(&config.api, &config.user_agent)?;
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        Self::with_parts(config, config_hash, options, storage, fetcher)
    }
}

impl<F> Coordinator<F>
where
    F: Fetcher<Record = Article>,
{
    /// Creates a coordinator from an already opened storage and a fetcher
    pub fn with_parts(
        config: Config,
        config_hash: &str,
        options: RunOptions,
        mut storage: SqliteStorage,
        fetcher: F,
    ) -> Result<Self, CitymentError> {
        let resumable = if options.fresh {
            None
        } else {
            storage
                .get_latest_run()?
                .filter(|run| run.is_resumable())
        };

        // An explicit start date only resumes a run that began there
        let resumable = match (resumable, options.since) {
            (Some(run), Some(since)) if run.target.start() != since => {
                tracing::warn!(
                    "Not resuming run {} ({}): --since {} asks for a different start",
                    run.id,
                    run.target,
                    since
                );
                None
            }
            (resumable, _) => resumable,
        };

        let (run_id, target) = match resumable.and_then(|run| run.remaining.map(|r| (run.id, r))) {
            Some((run_id, remaining)) => {
                tracing::info!("Resuming run {} with {} uncovered", run_id, remaining);
                storage.update_run_status(run_id, RunStatus::Running)?;
                (run_id, remaining)
            }
            None => {
                let target = complete_range(Some(options.since.unwrap_or(config.crawl.epoch)))?;
                let run_id = storage.create_run(config_hash, target)?;
                tracing::info!("Starting run {} for {}", run_id, target);
                (run_id, target)
            }
        };

        let crawler = RangeCrawler::new(config.crawl.strategy)
            .with_max_requests(config.crawl.max_requests);

        Ok(Self {
            storage,
            fetcher,
            crawler,
            archive_dir: config.output.archive_dir.map(PathBuf::from),
            run_id,
            target,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// The interval this run covers
    pub fn target(&self) -> DateInterval {
        self.target
    }

    /// Flag that stops the crawl before its next request
    pub fn cancel_flag(&self) -> CancelFlag {
        self.crawler.cancel_flag()
    }

    /// Runs the crawl to completion or until it stops
    ///
    /// Every answered batch is stored before the next request goes out, and the
    /// run's uncovered interval is updated after each one so an interrupted
    /// run can be resumed.
    pub async fn run(&mut self) -> Result<CrawlReport, CitymentError> {
        let run_id = self.run_id;
        let target = self.target;
        let storage = &mut self.storage;
        let archive_dir = self.archive_dir.as_deref();
        let start_time = std::time::Instant::now();

        let result = self
            .crawler
            .crawl(target, &self.fetcher, |batch: FetchedBatch<Article>| -> Result<(), SinkError> {
                let stored = storage.upsert_articles(&batch.records, run_id)?;

                if let (Some(dir), Some(raw)) = (archive_dir, batch.raw.as_deref()) {
                    archive_payload(dir, batch.satisfied, raw)?;
                }

                let remaining = DateInterval::from_ordered(target.start(), batch.satisfied.start());
                storage.update_remaining(run_id, remaining)?;

                tracing::info!(
                    "Stored {} articles for {}, {} left",
                    stored,
                    batch.satisfied,
                    remaining
                );
                Ok(())
            })
            .await;

        match result {
            Ok(report) => {
                self.storage.complete_run(run_id)?;
                tracing::info!(
                    "Run {} completed: {} requests, {} articles in {:?}",
                    run_id,
                    report.requests,
                    report.records,
                    start_time.elapsed()
                );
                Ok(report)
            }
            Err(e) => {
                let status = match e {
                    CrawlError::Cancelled { .. } => RunStatus::Interrupted,
                    _ => RunStatus::Failed,
                };
                if let Err(store_err) = self.storage.update_remaining(run_id, e.remaining()) {
                    tracing::error!(
                        "Failed to record {} left uncovered by run {}: {}",
                        e.remaining(),
                        run_id,
                        store_err
                    );
                }
                if let Err(store_err) = self.storage.update_run_status(run_id, status) {
                    tracing::error!("Failed to mark run {} {:?}: {}", run_id, status, store_err);
                }
                tracing::warn!("Run {} stopped ({:?}): {}", run_id, status, e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, CrawlConfig, OutputConfig, UserAgentConfig};
    use crate::crawler::API_DATETIME_FORMAT;
    use crate::range::parse_date;
    use crate::FetchError;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_test_config(epoch: &str) -> Config {
        Config {
            api: ApiConfig {
                endpoint: "https://api.example.com/news".to_string(),
                page_size: 10,
                timeout_secs: 5,
                params: BTreeMap::new(),
            },
            crawl: CrawlConfig {
                epoch: parse_date(epoch).unwrap(),
                ..CrawlConfig::default()
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestBot".to_string(),
                crawler_version: "1.0.0".to_string(),
                contact_url: "https://example.com/contact".to_string(),
                contact_email: "test@example.com".to_string(),
            },
            output: OutputConfig {
                database_path: ":memory:".to_string(),
                archive_dir: None,
            },
        }
    }

    /// Answers one day per request, failing on request number `fail_at`
    struct DayFetcher {
        calls: AtomicUsize,
        fail_at: Option<usize>,
    }

    #[async_trait]
    impl Fetcher for DayFetcher {
        type Record = Article;

        async fn fetch(&self, interval: DateInterval) -> Result<FetchedBatch<Article>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_at {
                return Err(FetchError::Other("server error".to_string()));
            }
            let day = interval.last_day().unwrap_or(interval.start());
            let published = format!("{} 12:00:00", day);
            let article = Article {
                id: day.to_string(),
                published_at: NaiveDateTime::parse_from_str(&published, API_DATETIME_FORMAT)
                    .unwrap(),
                title: None,
                payload: serde_json::json!({"id": day.to_string(), "date": published}),
            };
            let satisfied = DateInterval::new(day, interval.end()).unwrap();
            Ok(FetchedBatch::new(satisfied, vec![article]))
        }
    }

    #[tokio::test]
    async fn test_run_stores_every_batch() {
        let config = create_test_config("2009-01-01");
        let storage = SqliteStorage::new_in_memory().unwrap();
        let today = chrono::Local::now().date_naive();
        let since = today - chrono::Duration::days(4);
        let fetcher = DayFetcher {
            calls: AtomicUsize::new(0),
            fail_at: None,
        };
        let options = RunOptions {
            since: Some(since),
            fresh: false,
        };

        let mut coordinator =
            Coordinator::with_parts(config, "hash", options, storage, fetcher).unwrap();
        let report = coordinator.run().await.unwrap();

        assert_eq!(report.requests, 5);
        assert_eq!(coordinator.storage.count_articles().unwrap(), 5);
        let run = coordinator.storage.get_run(coordinator.run_id()).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.remaining, None);
    }

    #[tokio::test]
    async fn test_failed_run_is_resumed() {
        let config = create_test_config("2009-01-01");
        let today = chrono::Local::now().date_naive();
        let since = today - chrono::Duration::days(4);
        let options = RunOptions {
            since: Some(since),
            fresh: false,
        };

        let fetcher = DayFetcher {
            calls: AtomicUsize::new(0),
            fail_at: Some(2),
        };
        let storage = SqliteStorage::new_in_memory().unwrap();
        let mut first =
            Coordinator::with_parts(config.clone(), "hash", options, storage, fetcher).unwrap();
        assert!(first.run().await.is_err());

        let run = first.storage.get_run(first.run_id()).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        let remaining = run.remaining.unwrap();
        assert_eq!(remaining.start(), since);
        assert_eq!(remaining.num_days(), 3);

        let fetcher = DayFetcher {
            calls: AtomicUsize::new(0),
            fail_at: None,
        };
        let Coordinator { storage, run_id, .. } = first;
        let mut second =
            Coordinator::with_parts(config, "hash", options, storage, fetcher).unwrap();

        assert_eq!(second.run_id(), run_id);
        assert_eq!(second.target(), remaining);
        let report = second.run().await.unwrap();
        assert_eq!(report.requests, 3);
        assert_eq!(second.storage.count_articles().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_fresh_run_ignores_interrupted_run() {
        let config = create_test_config("2009-01-01");
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let old_target = DateInterval::new(
            parse_date("2009-01-01").unwrap(),
            parse_date("2009-02-01").unwrap(),
        )
        .unwrap();
        let old_run = storage.create_run("hash", old_target).unwrap();
        storage
            .update_run_status(old_run, RunStatus::Interrupted)
            .unwrap();

        let fetcher = DayFetcher {
            calls: AtomicUsize::new(0),
            fail_at: None,
        };
        let options = RunOptions {
            since: None,
            fresh: true,
        };
        let coordinator =
            Coordinator::with_parts(config, "hash", options, storage, fetcher).unwrap();

        assert_ne!(coordinator.run_id(), old_run);
        assert_eq!(coordinator.target().start(), parse_date("2009-01-01").unwrap());
        assert_eq!(
            coordinator.target().last_day(),
            Some(chrono::Local::now().date_naive())
        );
    }

    fn storage_with_interrupted_run() -> (SqliteStorage, i64, DateInterval) {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let target = DateInterval::new(
            parse_date("2009-01-01").unwrap(),
            parse_date("2009-02-01").unwrap(),
        )
        .unwrap();
        let run_id = storage.create_run("hash", target).unwrap();
        storage
            .update_run_status(run_id, RunStatus::Interrupted)
            .unwrap();
        (storage, run_id, target)
    }

    #[tokio::test]
    async fn test_since_only_resumes_run_with_same_start() {
        let config = create_test_config("2009-01-01");

        let (storage, old_run, _) = storage_with_interrupted_run();
        let since = chrono::Local::now().date_naive() - chrono::Duration::days(2);
        let options = RunOptions {
            since: Some(since),
            fresh: false,
        };
        let fetcher = DayFetcher {
            calls: AtomicUsize::new(0),
            fail_at: None,
        };
        let other =
            Coordinator::with_parts(config.clone(), "hash", options, storage, fetcher).unwrap();
        assert_ne!(other.run_id(), old_run);
        assert_eq!(other.target().start(), since);

        let (storage, old_run, old_target) = storage_with_interrupted_run();
        let options = RunOptions {
            since: Some(parse_date("2009-01-01").unwrap()),
            fresh: false,
        };
        let fetcher = DayFetcher {
            calls: AtomicUsize::new(0),
            fail_at: None,
        };
        let resumed = Coordinator::with_parts(config, "hash", options, storage, fetcher).unwrap();
        assert_eq!(resumed.run_id(), old_run);
        assert_eq!(resumed.target(), old_target);
    }

    /// Fails its first request after deleting every run behind the coordinator's back
    struct VanishingRunFetcher {
        db_path: PathBuf,
    }

    #[async_trait]
    impl Fetcher for VanishingRunFetcher {
        type Record = Article;

        async fn fetch(&self, _interval: DateInterval) -> Result<FetchedBatch<Article>, FetchError> {
            let conn = rusqlite::Connection::open(&self.db_path).unwrap();
            conn.execute("DELETE FROM runs", []).unwrap();
            Err(FetchError::Other("server error".to_string()))
        }
    }

    #[tokio::test]
    async fn test_crawl_error_survives_bookkeeping_failure() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("archive.db");
        let config = create_test_config("2009-01-01");
        let storage = SqliteStorage::new(&db_path).unwrap();
        let fetcher = VanishingRunFetcher {
            db_path: db_path.clone(),
        };
        let options = RunOptions {
            since: Some(chrono::Local::now().date_naive()),
            fresh: true,
        };

        let mut coordinator =
            Coordinator::with_parts(config, "hash", options, storage, fetcher).unwrap();
        let err = coordinator.run().await.unwrap_err();

        assert!(matches!(
            err,
            CitymentError::Crawl(CrawlError::Fetch {
                source: FetchError::Other(_),
                ..
            })
        ));
    }
}
