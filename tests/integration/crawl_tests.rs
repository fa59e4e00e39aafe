//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the GitHub GraphQL endpoint and
//! run the full fetch, upsert and throttle cycle end-to-end.

use repo_crawler::config::Config;
use repo_crawler::crawler::{run_crawl, Coordinator};
use repo_crawler::state::CrawlState;
use repo_crawler::storage::{RunStatus, SqliteStorage, Storage};
use repo_crawler::{ConfigError, CrawlerError, TransportError};
use chrono::Utc;
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(api_url: &str, db_path: &Path, max_repos: u64, thread_count: u32) -> Config {
    let mut config = Config::default();
    config.crawler.max_repos = max_repos;
    config.crawler.page_size = 100;
    config.crawler.thread_count = thread_count;
    config.crawler.sleep_between_pages = 0.0;
    config.github.api_url = format!("{}/graphql", api_url);
    config.github.token = Some("ghp_test_token".to_string());
    config.output.database_path = db_path.to_string_lossy().into_owned();
    config
}

/// Builds a search response body with a healthy quota
fn search_page(repos: &[(&str, &str, i64)], next_cursor: Option<&str>) -> Value {
    search_page_with_quota(repos, next_cursor, 4990, "2099-01-01T00:00:00Z")
}

/// Builds a search response body carrying the given rate-limit snapshot
fn search_page_with_quota(
    repos: &[(&str, &str, i64)],
    next_cursor: Option<&str>,
    remaining: i64,
    reset_at: &str,
) -> Value {
    let edges: Vec<Value> = repos
        .iter()
        .map(|(id, full_name, stars)| {
            json!({ "node": {
                "id": id,
                "nameWithOwner": full_name,
                "stargazerCount": stars,
                "updatedAt": "2024-04-30T10:00:00Z"
            } })
        })
        .collect();

    json!({
        "data": {
            "search": {
                "repositoryCount": 1000,
                "pageInfo": {
                    "hasNextPage": next_cursor.is_some(),
                    "endCursor": next_cursor
                },
                "edges": edges
            },
            "rateLimit": {
                "limit": 5000,
                "cost": 1,
                "remaining": remaining,
                "resetAt": reset_at
            }
        }
    })
}

/// Mounts a response for requests carrying the given cursor
async fn mount_page(server: &MockServer, cursor: Option<&str>, body: Value) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "variables": { "cursor": cursor } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_follows_cursor_chain() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", "Bearer ghp_test_token"))
        .and(body_partial_json(json!({ "variables": { "cursor": null, "pageSize": 100 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(
            &[("r1", "alice/one", 10), ("r2", "bob/two", 20)],
            Some("c1"),
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        Some("c1"),
        search_page(&[("r3", "carol/three", 30), ("r4", "dave/four", 40)], None),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), &db_path, 1000, 1);
    let mut coordinator = Coordinator::open(&config).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.rows_ingested, 4);
    assert_eq!(report.pages_processed, 2);
    assert!(!report.budget_reached);
    assert_eq!(coordinator.state(), CrawlState::Done);

    let storage = coordinator.into_storage();
    assert_eq!(storage.count_repos().unwrap(), 4);

    let repo = storage.get_repo("r3").unwrap().unwrap();
    assert_eq!(repo.owner, "carol");
    assert_eq!(repo.name, "three");
    assert_eq!(repo.stargazers_count, 30);
    assert!(repo.metadata.is_empty());

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, report.run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.rows_ingested, 4);
}

#[tokio::test]
async fn test_crawl_stops_at_budget() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    mount_page(
        &mock_server,
        None,
        search_page(&[("r1", "a/one", 1), ("r2", "a/two", 2)], Some("c1")),
    )
    .await;
    mount_page(
        &mock_server,
        Some("c1"),
        search_page(&[("r3", "a/three", 3), ("r4", "a/four", 4)], Some("c2")),
    )
    .await;

    // The budget is spent on the second page, so the third is never requested
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "variables": { "cursor": "c2" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(&[], None)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path, 3, 1);
    let report = run_crawl(&config).await.unwrap();

    assert!(report.budget_reached);
    assert_eq!(report.rows_ingested, 3);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_repos().unwrap(), 3);
    assert!(storage.get_repo("r4").unwrap().is_none());
}

#[tokio::test]
async fn test_parallel_lineages_never_exceed_budget() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    mount_page(
        &mock_server,
        None,
        search_page(
            &[("r1", "a/one", 1), ("r2", "a/two", 2), ("r3", "a/three", 3)],
            Some("c1"),
        ),
    )
    .await;
    mount_page(
        &mock_server,
        Some("c1"),
        search_page(
            &[("r4", "a/four", 4), ("r5", "a/five", 5), ("r6", "a/six", 6)],
            None,
        ),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), &db_path, 4, 2);
    let report = run_crawl(&config).await.unwrap();

    assert!(report.budget_reached);
    assert_eq!(report.rows_ingested, 4);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert!(storage.count_repos().unwrap() <= 4);
}

#[tokio::test]
async fn test_duplicate_ids_keep_latest_values() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    mount_page(
        &mock_server,
        None,
        search_page(&[("dup", "old-owner/project", 10)], Some("c1")),
    )
    .await;
    mount_page(
        &mock_server,
        Some("c1"),
        search_page(&[("dup", "new-owner/project", 25)], None),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), &db_path, 100, 1);
    let report = run_crawl(&config).await.unwrap();

    // Overwrites count toward the rows ingested
    assert_eq!(report.rows_ingested, 2);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_repos().unwrap(), 1);

    let repo = storage.get_repo("dup").unwrap().unwrap();
    assert_eq!(repo.full_name, "new-owner/project");
    assert_eq!(repo.owner, "new-owner");
    assert_eq!(repo.stargazers_count, 25);
}

#[tokio::test]
async fn test_server_error_fails_run() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path, 100, 1);
    let mut coordinator = Coordinator::open(&config).unwrap();
    let result = coordinator.run().await;

    match result {
        Err(CrawlerError::Transport(TransportError::Status { status, body })) => {
            assert_eq!(status, 502);
            assert_eq!(body, "bad gateway");
        }
        other => panic!("expected a 502 status error, got {:?}", other),
    }
    assert_eq!(coordinator.state(), CrawlState::Failed);

    let run = coordinator.storage().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error_message.unwrap().contains("502"));
}

#[tokio::test]
async fn test_graphql_errors_fail_run() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [
                { "type": "RATE_LIMITED", "message": "API rate limit exceeded" }
            ]
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path, 100, 1);
    let result = run_crawl(&config).await;

    match result {
        Err(CrawlerError::RemoteQuery { errors }) => {
            assert_eq!(errors, "RATE_LIMITED: API rate limit exceeded");
        }
        other => panic!("expected a remote query error, got {:?}", other),
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_repos().unwrap(), 0);
}

#[tokio::test]
async fn test_pages_before_failure_stay_committed() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    mount_page(
        &mock_server,
        None,
        search_page(&[("r1", "a/one", 1), ("r2", "a/two", 2)], Some("c1")),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "variables": { "cursor": "c1" } })))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path, 100, 1);
    assert!(run_crawl(&config).await.is_err());

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_repos().unwrap(), 2);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.rows_ingested, 2);
}

#[tokio::test]
async fn test_missing_token_fails_before_any_work() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), &db_path, 100, 1);
    config.github.token = None;

    let result = run_crawl(&config).await;

    assert!(matches!(
        result,
        Err(CrawlerError::Config(ConfigError::MissingCredential(_)))
    ));
    assert!(!db_path.exists());
}

#[tokio::test]
async fn test_empty_page_continues_lineage() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    mount_page(&mock_server, None, search_page(&[], Some("c1"))).await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "variables": { "cursor": "c1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(
            &[("r1", "a/one", 1), ("r2", "a/two", 2)],
            None,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path, 100, 1);
    let report = run_crawl(&config).await.unwrap();

    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.rows_ingested, 2);
    assert!(!report.budget_reached);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_repos().unwrap(), 2);
}

#[tokio::test]
async fn test_every_page_waits_polite_delay() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    // The middle page is empty and must still be paced
    mount_page(&mock_server, None, search_page(&[("r1", "a/one", 1)], Some("c1"))).await;
    mount_page(&mock_server, Some("c1"), search_page(&[], Some("c2"))).await;
    mount_page(&mock_server, Some("c2"), search_page(&[("r2", "a/two", 2)], None)).await;

    let mut config = create_test_config(&mock_server.uri(), &db_path, 100, 1);
    config.crawler.sleep_between_pages = 0.2;

    let started = Instant::now();
    let report = run_crawl(&config).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.pages_processed, 3);
    assert!(
        elapsed >= Duration::from_millis(600),
        "three pages at 0.2s each finished in {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_page_that_reaches_budget_is_still_paced() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    mount_page(
        &mock_server,
        None,
        search_page(&[("r1", "a/one", 1), ("r2", "a/two", 2)], Some("c1")),
    )
    .await;

    let mut config = create_test_config(&mock_server.uri(), &db_path, 2, 1);
    config.crawler.sleep_between_pages = 0.3;

    let started = Instant::now();
    let report = run_crawl(&config).await.unwrap();

    assert!(report.budget_reached);
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_low_quota_with_past_reset_skips_polite_delay() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    let reset_at = (Utc::now() - chrono::Duration::seconds(60)).to_rfc3339();
    mount_page(
        &mock_server,
        None,
        search_page_with_quota(&[("r1", "a/one", 1)], Some("c1"), 1, &reset_at),
    )
    .await;
    mount_page(
        &mock_server,
        Some("c1"),
        search_page_with_quota(&[("r2", "a/two", 2)], None, 0, &reset_at),
    )
    .await;

    // Two polite waits would take 20s; an elapsed reset means no wait at all
    let mut config = create_test_config(&mock_server.uri(), &db_path, 100, 1);
    config.crawler.sleep_between_pages = 10.0;

    let started = Instant::now();
    let report = run_crawl(&config).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.rows_ingested, 2);
    assert!(elapsed < Duration::from_secs(5), "crawl took {:?}", elapsed);
}

#[tokio::test]
async fn test_low_quota_waits_for_reset_plus_buffer() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("repos.db");

    // Reset was 4s ago, so the 5s buffer leaves about one second to wait
    let reset_at = (Utc::now() - chrono::Duration::seconds(4)).to_rfc3339();
    mount_page(
        &mock_server,
        None,
        search_page_with_quota(&[("r1", "a/one", 1)], None, 1, &reset_at),
    )
    .await;

    let mut config = create_test_config(&mock_server.uri(), &db_path, 100, 1);
    config.crawler.sleep_between_pages = 30.0;

    let started = Instant::now();
    run_crawl(&config).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(800), "crawl took {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(10), "crawl took {:?}", elapsed);
}
