//! HTTP fetcher implementation
//!
//! This module handles all requests to the GitHub GraphQL endpoint:
//! - Building HTTP clients with a fixed user agent and timeouts
//! - Sending one search query per page
//! - Classifying transport failures (status, timeout, malformed body)
//!
//! There is no retry here. A failed fetch is returned to the coordinator,
//! which aborts the run.

use crate::config::{Config, MAX_PAGE_SIZE};
use crate::crawler::parser::{parse_search_response, Page, SearchRequest};
use crate::{CrawlerError, TransportError};
use reqwest::Client;
use std::time::Duration;

/// Per-request timeout for search calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds an HTTP client with proper configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use repo_crawler::crawler::build_http_client;
///
/// let client = build_http_client().unwrap();
/// ```
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Client for the repository search endpoint
///
/// Cloning is cheap and every clone shares the underlying connection pool,
/// so each fetch task gets its own handle.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: String,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl GitHubClient {
    /// Creates a client for `api_url` authenticating with `token`
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, CrawlerError> {
        let client = build_http_client().map_err(TransportError::Request)?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            token: token.into(),
        })
    }

    /// Creates a client from configuration
    ///
    /// Fails with `ConfigError::MissingCredential` when no token is set.
    pub fn from_config(config: &Config) -> Result<Self, CrawlerError> {
        let token = config.require_token()?;
        Self::new(config.github.api_url.clone(), token)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Fetches one page of search results
    ///
    /// # Arguments
    ///
    /// * `cursor` - End cursor of the previous page, or `None` for the first page
    /// * `page_size` - Requested page size, clamped to 1..=100
    ///
    /// # Returns
    ///
    /// * `Ok(Page)` - Items, pagination info and rate-limit snapshot
    /// * `Err(CrawlerError::Transport)` - Non-success status, timeout or malformed body
    /// * `Err(CrawlerError::RemoteQuery)` - The API answered with an `errors` list
    pub async fn fetch_page(
        &self,
        cursor: Option<String>,
        page_size: u32,
    ) -> Result<Page, CrawlerError> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let request = SearchRequest::new(cursor.as_deref(), page_size);

        tracing::trace!(
            "Fetching page (cursor: {}, size: {})",
            cursor.as_deref().unwrap_or("<start>"),
            page_size
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        parse_search_response(&body)
    }

    fn classify(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                url: self.api_url.clone(),
            }
        } else {
            TransportError::Request(error)
        }
    }
}
