use crate::config::types::{Config, CrawlerConfig, GitHubConfig, LoggingConfig, OutputConfig};
use crate::config::MAX_PAGE_SIZE;
use crate::ConfigError;
use url::Url;

const MAX_THREAD_COUNT: u32 = 64;

/// One day
const MAX_SLEEP_BETWEEN_PAGES: f64 = 86_400.0;

const LOG_LEVELS: [&str; 6] = ["error", "warn", "info", "debug", "trace", "off"];

/// Validates the entire configuration
///
/// The GitHub token is not checked here; it is only required for crawling
/// and is enforced by [`Config::require_token`].
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_github_config(&config.github)?;
    validate_output_config(&config.output)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_repos == 0 {
        return Err(ConfigError::Validation(
            "max_repos must be >= 1, got 0".to_string(),
        ));
    }

    if config.page_size < 1 || config.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, config.page_size
        )));
    }

    if config.thread_count < 1 || config.thread_count > MAX_THREAD_COUNT {
        return Err(ConfigError::Validation(format!(
            "thread_count must be between 1 and {}, got {}",
            MAX_THREAD_COUNT, config.thread_count
        )));
    }

    if !config.sleep_between_pages.is_finite() || config.sleep_between_pages < 0.0 {
        return Err(ConfigError::Validation(format!(
            "sleep_between_pages must be a non-negative number of seconds, got {}",
            config.sleep_between_pages
        )));
    }

    if config.sleep_between_pages > MAX_SLEEP_BETWEEN_PAGES {
        return Err(ConfigError::Validation(format!(
            "sleep_between_pages must be at most {} seconds, got {}",
            MAX_SLEEP_BETWEEN_PAGES, config.sleep_between_pages
        )));
    }

    Ok(())
}

/// Validates the endpoint URL
fn validate_github_config(config: &GitHubConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.api_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api_url '{}': {}", config.api_url, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "api_url '{}' must use http or https",
            config.api_url
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_file().as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.csv_path.is_empty() {
        return Err(ConfigError::Validation(
            "csv_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<(), ConfigError> {
    if !LOG_LEVELS.contains(&config.level.to_lowercase().as_str()) {
        return Err(ConfigError::Validation(format!(
            "log level must be one of {}, got '{}'",
            LOG_LEVELS.join(", "),
            config.level
        )));
    }
    Ok(())
}
