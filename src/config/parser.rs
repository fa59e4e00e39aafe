use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Loads the effective configuration
///
/// Reads the TOML file at `path` if one is given, applies environment
/// overrides from the process environment, then validates the result.
///
/// # Arguments
///
/// * `path` - Optional path to a TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use repo_crawler::config::load_config;
///
/// let config = load_config(Some(Path::new("crawler.toml"))).unwrap();
/// println!("Page size: {}", config.crawler.page_size);
/// ```
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    validate(&config)?;

    Ok(config)
}

/// Parses a configuration from TOML text without consulting the environment
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Applies environment-style overrides to a configuration
///
/// `lookup` resolves a variable name to its value. Empty values are treated
/// as unset.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("MAX_REPOS") {
        config.crawler.max_repos = parse_env("MAX_REPOS", &v)?;
    }
    if let Some(v) = get("PAGE_SIZE") {
        config.crawler.page_size = parse_env("PAGE_SIZE", &v)?;
    }
    if let Some(v) = get("THREAD_COUNT") {
        config.crawler.thread_count = parse_env("THREAD_COUNT", &v)?;
    }
    if let Some(v) = get("SLEEP_BETWEEN_PAGES") {
        config.crawler.sleep_between_pages = parse_env("SLEEP_BETWEEN_PAGES", &v)?;
    }
    if let Some(v) = get("GITHUB_TOKEN") {
        config.github.token = Some(v);
    }
    if let Some(v) = get("GITHUB_API_URL") {
        config.github.api_url = v;
    }
    if let Some(v) = get("DATABASE_URL") {
        config.output.database_path = v;
    }
    if let Some(v) = get("OUTPUT_CSV") {
        config.output.csv_path = v;
    }
    if let Some(v) = get("LOG_LEVEL") {
        config.logging.level = v.to_lowercase();
    }

    Ok(())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Computes a SHA-256 hash of the effective configuration
///
/// The credential is excluded so that rotating a token does not look like
/// a configuration change.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash
/// * `Err(ConfigError)` - Failed to serialize the configuration
pub fn compute_config_hash(config: &Config) -> Result<String, ConfigError> {
    let content = toml::to_string(&config.redacted())?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: Option<&Path>) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(&config)?;
    Ok((config, hash))
}
