//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates:
//! - A fixed pool of in-flight page fetches
//! - Per-page upserts committed as one transaction
//! - Rate-limit throttling after every page
//! - Resubmission along each cursor lineage until the budget is spent
//!
//! Every completed fetch is reaped by the single loop in
//! [`Coordinator::run`], so the row counter and the database connection are
//! only ever touched from one place.

use crate::config::{compute_config_hash, Config, CrawlerConfig};
use crate::crawler::fetcher::GitHubClient;
use crate::crawler::parser::Page;
use crate::crawler::scheduler::RateLimiter;
use crate::state::CrawlState;
use crate::storage::{open_storage, RepoRecord, SqliteStorage, Storage};
use crate::CrawlerError;
use chrono::Utc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Outcome of a successful crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    /// Run row id in the `runs` table
    pub run_id: i64,
    /// Items processed this run, inserts and overwrites alike
    pub rows_ingested: u64,
    /// Pages reaped from the fetch pool
    pub pages_processed: u64,
    /// True if the run stopped because the budget was reached
    pub budget_reached: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: CrawlerConfig,
    storage: SqliteStorage,
    client: GitHubClient,
    rate_limiter: RateLimiter,
    config_hash: String,
    state: CrawlState,
    rows_ingested: u64,
    pages_processed: u64,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `storage` - Store that receives the upserts
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlerError)` - No GitHub token, or the HTTP client failed to build
    pub fn new(config: &Config, storage: SqliteStorage) -> Result<Self, CrawlerError> {
        let client = GitHubClient::from_config(config)?;
        let config_hash = compute_config_hash(config)?;

        Ok(Self {
            rate_limiter: RateLimiter::new(config.crawler.polite_delay()),
            config: config.crawler.clone(),
            storage,
            client,
            config_hash,
            state: CrawlState::Idle,
            rows_ingested: 0,
            pages_processed: 0,
        })
    }

    /// Opens the configured database and creates a coordinator over it
    pub fn open(config: &Config) -> Result<Self, CrawlerError> {
        // Check the credential before touching the filesystem
        config.require_token()?;
        let storage = open_storage(&config.output.database_file())?;
        Self::new(config, storage)
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Consumes the coordinator, handing back its store
    pub fn into_storage(self) -> SqliteStorage {
        self.storage
    }

    /// Runs the crawl to completion
    ///
    /// A run row is opened first and closed as `completed` or `failed`.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Budget reached or pagination exhausted
    /// * `Err(CrawlerError)` - A fetch or write failed; pages committed
    ///   before the failure stay in the store
    pub async fn run(&mut self) -> Result<CrawlReport, CrawlerError> {
        self.state = self.state.transition(CrawlState::Running)?;
        let run_id = self.storage.create_run(&self.config_hash)?;

        tracing::info!(
            "Starting crawl run {} against {} with {} parallel fetchers (budget: {}, page size: {}, polite delay: {:?})",
            run_id,
            self.client.api_url(),
            self.config.thread_count,
            self.config.max_repos,
            self.config.page_size,
            self.rate_limiter.polite_delay()
        );

        match self.crawl().await {
            Ok(budget_reached) => {
                self.storage.complete_run(run_id, self.rows_ingested)?;
                self.state = self.state.transition(CrawlState::Done)?;
                tracing::info!(
                    "Crawl finished: {} repos fetched over {} pages",
                    self.rows_ingested,
                    self.pages_processed
                );
                Ok(CrawlReport {
                    run_id,
                    rows_ingested: self.rows_ingested,
                    pages_processed: self.pages_processed,
                    budget_reached,
                })
            }
            Err(e) => {
                tracing::error!(
                    "Crawl run {} failed after {} repos: {}",
                    run_id,
                    self.rows_ingested,
                    e
                );
                if let Err(store_err) =
                    self.storage
                        .fail_run(run_id, self.rows_ingested, &e.to_string())
                {
                    tracing::warn!("Could not mark run {} as failed: {}", run_id, store_err);
                }
                self.state = self.state.transition(CrawlState::Failed)?;
                Err(e)
            }
        }
    }

    /// Drives the fetch pool; returns whether the budget was reached
    async fn crawl(&mut self) -> Result<bool, CrawlerError> {
        let start_time = Instant::now();
        let mut in_flight: JoinSet<Result<Page, CrawlerError>> = JoinSet::new();

        // Every lineage starts from the top of the result set
        for _ in 0..self.config.thread_count {
            self.spawn_fetch(&mut in_flight, None);
        }

        // Dropping `in_flight` on an early return aborts the remaining fetches
        while let Some(joined) = in_flight.join_next().await {
            let page = joined??;
            let next_cursor = self.process_page(page).await?;

            if self.pages_processed % 10 == 0 {
                let elapsed = start_time.elapsed().as_secs_f64().max(f64::EPSILON);
                tracing::info!(
                    "Progress: {} repos over {} pages, {} fetches in flight, {:.2} repos/sec",
                    self.rows_ingested,
                    self.pages_processed,
                    in_flight.len(),
                    self.rows_ingested as f64 / elapsed
                );
            }

            if self.budget_reached() {
                tracing::info!("Reached budget of {} repos", self.config.max_repos);
                in_flight.abort_all();
                return Ok(true);
            }

            if let Some(cursor) = next_cursor {
                self.spawn_fetch(&mut in_flight, Some(cursor));
            }
        }

        tracing::info!("Search pagination exhausted");
        Ok(false)
    }

    fn spawn_fetch(
        &self,
        in_flight: &mut JoinSet<Result<Page, CrawlerError>>,
        cursor: Option<String>,
    ) {
        let client = self.client.clone();
        let page_size = self.config.page_size;
        in_flight.spawn(async move { client.fetch_page(cursor, page_size).await });
    }

    fn budget_reached(&self) -> bool {
        self.rows_ingested >= self.config.max_repos
    }

    /// Persists one page and returns the cursor to continue its lineage with
    ///
    /// Items beyond the remaining budget are dropped. The page is throttled
    /// on even when it carried no items.
    async fn process_page(&mut self, page: Page) -> Result<Option<String>, CrawlerError> {
        self.pages_processed += 1;

        let remaining = self.config.max_repos.saturating_sub(self.rows_ingested);
        let take = usize::try_from(remaining).unwrap_or(usize::MAX);

        let records = page
            .items
            .into_iter()
            .take(take)
            .map(|raw| raw.into_record(Utc::now()))
            .collect::<Result<Vec<RepoRecord>, _>>()?;

        let written = self.storage.upsert_page(&records)?;
        self.rows_ingested += written as u64;

        tracing::debug!(
            "Committed page {} with {} repos (total {}, quota remaining {})",
            self.pages_processed,
            written,
            self.rows_ingested,
            page.rate_limit.remaining
        );

        self.rate_limiter.throttle(&page.rate_limit).await;

        if self.budget_reached() {
            return Ok(None);
        }

        Ok(page.page_info.next_cursor().map(str::to_string))
    }
}

/// Runs a complete crawl against the configured database
///
/// # Example
///
/// ```no_run
/// use repo_crawler::config::load_config;
/// use repo_crawler::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(None)?;
/// let report = run_crawl(&config).await?;
/// println!("ingested {} repos", report.rows_ingested);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config) -> Result<CrawlReport, CrawlerError> {
    let mut coordinator = Coordinator::open(config)?;
    coordinator.run().await
}
