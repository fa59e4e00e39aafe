//! Configuration module for repo-crawler
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables (`MAX_REPOS`, `PAGE_SIZE`, `THREAD_COUNT`,
//! `SLEEP_BETWEEN_PAGES`, `GITHUB_TOKEN`, `GITHUB_API_URL`, `DATABASE_URL`,
//! `OUTPUT_CSV`, `LOG_LEVEL`).
//!
//! # Example
//!
//! ```no_run
//! use repo_crawler::config::load_config;
//!
//! let config = load_config(None).unwrap();
//! println!("Crawler will fetch at most {} repositories", config.crawler.max_repos);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, GitHubConfig, LoggingConfig, OutputConfig, DEFAULT_API_URL,
    MAX_PAGE_SIZE,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_from_str,
    load_config_with_hash,
};
pub use validation::validate;
