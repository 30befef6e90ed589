//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the archive API and exercise the
//! HTTP fetcher, the range crawler and the coordinator end-to-end.

use chrono::{Duration, Local, NaiveDate};
use cityment::config::{ApiConfig, Config, CrawlConfig, OutputConfig, UserAgentConfig};
use cityment::crawler::{Coordinator, HttpFetcher, RangeCrawler, RunOptions};
use cityment::range::{parse_date, DateInterval};
use cityment::storage::{RunStatus, SqliteStorage, Storage};
use cityment::{CrawlError, FetchError};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(endpoint: String, page_size: usize, db_path: &str) -> Config {
    let mut params = BTreeMap::new();
    params.insert("format".to_string(), "json".to_string());

    Config {
        api: ApiConfig {
            endpoint,
            page_size,
            timeout_secs: 5,
            params,
        },
        crawl: CrawlConfig::default(),
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
            archive_dir: None,
        },
    }
}

fn interval(start: &str, end: &str) -> DateInterval {
    DateInterval::new(parse_date(start).unwrap(), parse_date(end).unwrap()).unwrap()
}

fn midnight(date: NaiveDate) -> String {
    format!("{} 00:00:00", date)
}

fn items(entries: &[(&str, &str)]) -> serde_json::Value {
    let items: Vec<_> = entries
        .iter()
        .map(|(id, date)| json!({"id": id, "date": date, "title": format!("Artikel {}", id)}))
        .collect();
    json!({ "items": items })
}

/// Mounts an answer for one exact request window
async fn mount_window(server: &MockServer, start: &str, end: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("format", "json"))
        .and(query_param("betweena", format!("{} 00:00:00", start)))
        .and(query_param("betweenb", format!("{} 00:00:00", end)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_truncated_pages_shrink_the_request() {
    let mock_server = MockServer::start().await;

    // Full pages of two items are truncated; the oldest day is asked for again
    mount_window(
        &mock_server,
        "2009-01-01",
        "2009-04-01",
        items(&[("1", "2009-03-20 10:00:00"), ("2", "2009-03-10 09:00:00")]),
    )
    .await;
    mount_window(
        &mock_server,
        "2009-01-01",
        "2009-03-11",
        items(&[("2", "2009-03-10 09:00:00"), ("3", "2009-02-01 08:00:00")]),
    )
    .await;
    mount_window(
        &mock_server,
        "2009-01-01",
        "2009-02-02",
        items(&[("3", "2009-02-01 08:00:00")]),
    )
    .await;

    let config = create_test_config(format!("{}/news", mock_server.uri()), 2, ":memory:");
    let fetcher = HttpFetcher::new(&config.api, &config.user_agent).expect("fetcher");

    let mut satisfied = Vec::new();
    let mut ids = Vec::new();
    let report = RangeCrawler::default()
        .crawl(interval("2009-01-01", "2009-04-01"), &fetcher, |batch| {
            satisfied.push(batch.satisfied);
            ids.extend(batch.records.into_iter().map(|a| a.id));
            Ok(())
        })
        .await
        .expect("crawl failed");

    assert_eq!(report.requests, 3);
    assert_eq!(
        satisfied,
        vec![
            interval("2009-03-11", "2009-04-01"),
            interval("2009-02-02", "2009-03-11"),
            interval("2009-01-01", "2009-02-02"),
        ]
    );
    assert_eq!(ids, vec!["1", "2", "2", "3", "3"]);
}

#[tokio::test]
async fn test_server_error_stops_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}/news", mock_server.uri()), 2, ":memory:");
    let fetcher = HttpFetcher::new(&config.api, &config.user_agent).expect("fetcher");
    let target = interval("2009-01-01", "2009-04-01");

    let mut batches = 0;
    let err = RangeCrawler::default()
        .crawl(target, &fetcher, |_| {
            batches += 1;
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Fetch {
            source: FetchError::Status { status: 503, .. },
            ..
        }
    ));
    assert_eq!(err.remaining(), target);
    assert_eq!(batches, 0);
}

#[tokio::test]
async fn test_undecodable_body_is_a_fetch_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<xml>not json</xml>"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}/news", mock_server.uri()), 2, ":memory:");
    let fetcher = HttpFetcher::new(&config.api, &config.user_agent).expect("fetcher");

    let err = RangeCrawler::default()
        .crawl(interval("2009-01-01", "2009-04-01"), &fetcher, |_| Ok(()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Fetch {
            source: FetchError::Decode { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_items_outside_the_window_stop_the_crawl() {
    let mock_server = MockServer::start().await;

    // A full page of items newer than anything asked for
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&[
            ("20", "2010-05-12 10:00:00"),
            ("21", "2010-05-03 09:00:00"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}/news", mock_server.uri()), 2, ":memory:");
    let fetcher = HttpFetcher::new(&config.api, &config.user_agent).expect("fetcher");
    let target = interval("2009-01-01", "2009-04-01");

    let mut batches = 0;
    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        RangeCrawler::default().crawl(target, &fetcher, |_| {
            batches += 1;
            Ok(())
        }),
    )
    .await
    .expect("crawl should stop on its own");

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        CrawlError::Fetch {
            source: FetchError::Decode { .. },
            ..
        }
    ));
    assert_eq!(err.remaining(), target);
    assert_eq!(batches, 0);
}

#[tokio::test]
async fn test_full_run_stores_and_archives() {
    let mock_server = MockServer::start().await;

    let today = Local::now().date_naive();
    let since = today - Duration::days(2);
    let tomorrow = today + Duration::days(1);
    let newest = format!("{} 07:15:00", today);
    let oldest = format!("{} 18:40:00", since);

    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("betweena", midnight(since)))
        .and(query_param("betweenb", midnight(tomorrow)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(items(&[("10", newest.as_str()), ("11", oldest.as_str())])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("archive.db");
    let archive_dir = dir.path().join("payloads");

    let mut config = create_test_config(
        format!("{}/news", mock_server.uri()),
        50,
        db_path.to_str().expect("utf-8 path"),
    );
    config.output.archive_dir = Some(archive_dir.to_string_lossy().into_owned());

    let options = RunOptions {
        since: Some(since),
        fresh: true,
    };
    let mut coordinator =
        Coordinator::new(config, "test-hash", options).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Crawl failed");
    let run_id = coordinator.run_id();
    drop(coordinator);

    assert_eq!(report.requests, 1);
    assert_eq!(report.records, 2);

    let storage = SqliteStorage::new(Path::new(&db_path)).expect("Failed to open DB");
    assert_eq!(storage.count_articles().expect("count"), 2);
    assert_eq!(
        storage.saved_range().expect("saved range"),
        Some(DateInterval::new(since, tomorrow).unwrap())
    );

    let run = storage.get_run(run_id).expect("run");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.target, DateInterval::new(since, tomorrow).unwrap());

    let archived: Vec<_> = std::fs::read_dir(&archive_dir)
        .expect("archive dir")
        .collect();
    assert_eq!(archived.len(), 1);
}
