//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::storage::{RepoRecord, RunRecord, Storage};
use crate::CrawlerError;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Number of rows in the `repos` table
    pub total_repos: u64,

    /// Most starred repositories, highest first
    pub top_repos: Vec<RepoRecord>,

    /// The most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `top_n` - How many of the most starred repositories to include
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CrawlerError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage, top_n: usize) -> Result<CrawlStatistics, CrawlerError> {
    Ok(CrawlStatistics {
        total_repos: storage.count_repos()?,
        top_repos: storage.top_repos(top_n)?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Formats statistics for the terminal
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Statistics ===\n\n");
    out.push_str(&format!("Repositories stored: {}\n", stats.total_repos));

    match &stats.latest_run {
        Some(run) => {
            out.push_str(&format!("\nLatest run #{}:\n", run.id));
            out.push_str(&format!("  Status: {}\n", run.status.to_db_string()));
            out.push_str(&format!("  Started: {}\n", run.started_at));
            if let Some(finished) = &run.finished_at {
                out.push_str(&format!("  Finished: {}\n", finished));
            }
            out.push_str(&format!("  Rows ingested: {}\n", run.rows_ingested));
            if let Some(error) = &run.error_message {
                out.push_str(&format!("  Error: {}\n", error));
            }
        }
        None => out.push_str("\nNo crawl runs recorded\n"),
    }

    if !stats.top_repos.is_empty() {
        out.push_str(&format!("\nTop {} by stars:\n", stats.top_repos.len()));
        for (rank, repo) in stats.top_repos.iter().enumerate() {
            out.push_str(&format!(
                "  {:>3}. {} ({} stars)\n",
                rank + 1,
                repo.full_name,
                repo.stargazers_count
            ));
        }
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}
