//! repo-crawler main entry point
//!
//! This is the command-line interface for the GitHub repository crawler.

use anyhow::Context;
use clap::Parser;
use repo_crawler::config::{load_config_with_hash, Config};
use repo_crawler::crawler::Coordinator;
use repo_crawler::output::{export_csv, load_statistics, print_statistics};
use repo_crawler::storage::open_storage;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Repositories listed by `--stats`
const STATS_TOP_N: usize = 10;

/// repo-crawler: collect GitHub repositories by star count
///
/// Pages through the GitHub GraphQL search API with several concurrent
/// cursors, upserts every repository into SQLite and dumps the table to
/// CSV sorted by stars.
#[derive(Parser, Debug)]
#[command(name = "repo-crawler")]
#[command(version)]
#[command(about = "A GitHub repository search crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults plus environment when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with_all = ["stats", "export_only"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_only"])]
    stats: bool,

    /// Export the CSV from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_hash) = load_config_with_hash(cli.config.as_deref())
        .context("Failed to load configuration")?;

    setup_logging(cli.verbose, cli.quiet, &config.logging.level);

    match &cli.config {
        Some(path) => tracing::info!("Configuration loaded from {} (hash: {})", path.display(), config_hash),
        None => tracing::info!("Configuration loaded from environment (hash: {})", config_hash),
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_only {
        handle_export(&config)?;
    } else {
        handle_crawl(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber
///
/// With no verbosity flags the configured level applies to this crate.
fn setup_logging(verbose: u8, quiet: bool, level: &str) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new(format!("repo_crawler={},warn", level)),
            1 => EnvFilter::new("repo_crawler=debug,info"),
            2 => EnvFilter::new("repo_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== repo-crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max repos: {}", config.crawler.max_repos);
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Parallel fetchers: {}", config.crawler.thread_count);
    println!(
        "  Sleep between pages: {}s",
        config.crawler.sleep_between_pages
    );

    println!("\nGitHub:");
    println!("  API URL: {}", config.github.api_url);
    println!(
        "  Token: {}",
        if config.require_token().is_ok() {
            "set"
        } else {
            "not set"
        }
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_file().display());
    println!("  CSV: {}", config.output.csv_file().display());

    println!("\n✓ Configuration is valid");
    if config.require_token().is_err() {
        println!("✗ GITHUB_TOKEN must be set before crawling");
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let db_path = config.output.database_file();
    println!("Database: {}\n", db_path.display());

    let storage = open_storage(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let stats = load_statistics(&storage, STATS_TOP_N)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-only mode: dumps the stored table to CSV
fn handle_export(config: &Config) -> anyhow::Result<()> {
    let db_path = config.output.database_file();
    let csv_path = config.output.csv_file();

    let storage = open_storage(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let rows = export_csv(&storage, &csv_path)
        .with_context(|| format!("Failed to export {}", csv_path.display()))?;

    println!("✓ Exported {} repos to: {}", rows, csv_path.display());

    Ok(())
}

/// Handles the main crawl operation followed by the CSV export
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    let mut coordinator = Coordinator::open(config).context("Failed to start crawler")?;

    let report = coordinator.run().await.context("Crawl failed")?;
    tracing::info!(
        "Run {} ingested {} repos over {} pages{}",
        report.run_id,
        report.rows_ingested,
        report.pages_processed,
        if report.budget_reached {
            " (budget reached)"
        } else {
            ""
        }
    );

    let csv_path = config.output.csv_file();
    let storage = coordinator.into_storage();
    export_csv(&storage, &csv_path)
        .with_context(|| format!("Failed to export {}", csv_path.display()))?;

    Ok(())
}
