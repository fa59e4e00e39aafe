use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default GitHub GraphQL endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";

/// Largest page the search API will serve
pub const MAX_PAGE_SIZE: u32 = 100;

/// Main configuration structure for repo-crawler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub github: GitHubConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Crawl budget and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of repositories to ingest in one run
    #[serde(rename = "max-repos")]
    pub max_repos: u64,

    /// Search page size (1..=100)
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Number of concurrent fetch lineages
    #[serde(rename = "thread-count")]
    pub thread_count: u32,

    /// Polite delay between pages (seconds)
    #[serde(rename = "sleep-between-pages")]
    pub sleep_between_pages: f64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_repos: 100_000,
            page_size: MAX_PAGE_SIZE,
            thread_count: 5,
            sleep_between_pages: 1.0,
        }
    }
}

impl CrawlerConfig {
    /// The polite inter-page delay as a `Duration`
    ///
    /// Negative or NaN values give zero; values too large for a `Duration`
    /// saturate instead of panicking.
    pub fn polite_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.sleep_between_pages.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// GitHub endpoint and credential
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GraphQL endpoint URL
    #[serde(rename = "api-url")]
    pub api_url: String,

    /// Bearer token; normally supplied through `GITHUB_TOKEN`
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// SQLite database file, optionally prefixed with `sqlite://`
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Destination of the CSV snapshot
    #[serde(rename = "csv-path")]
    pub csv_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "output/repos.db".to_string(),
            csv_path: "output/repos_dump.csv".to_string(),
        }
    }
}

impl OutputConfig {
    /// Filesystem path of the database, with any URL scheme stripped
    pub fn database_file(&self) -> PathBuf {
        let path = self
            .database_path
            .strip_prefix("sqlite://")
            .or_else(|| self.database_path.strip_prefix("sqlite:"))
            .unwrap_or(&self.database_path);
        PathBuf::from(path)
    }

    pub fn csv_file(&self) -> PathBuf {
        PathBuf::from(&self.csv_path)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter level when no `-v`/`-q` flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Returns the GitHub token, or fails if none was configured
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.github
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingCredential("GITHUB_TOKEN"))
    }

    /// A copy of this configuration with the credential removed
    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        copy.github.token = None;
        copy
    }
}
