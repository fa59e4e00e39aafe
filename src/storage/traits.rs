//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{RepoRecord, RunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to upsert repository {repo_id}: {source}")]
    Upsert {
        repo_id: String,
        source: rusqlite::Error,
    },

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the crawler and
/// the exporter.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed with its ingested row count
    fn complete_run(&mut self, run_id: i64, rows_ingested: u64) -> StorageResult<()>;

    /// Marks a run as failed, keeping the rows committed before the failure
    fn fail_run(&mut self, run_id: i64, rows_ingested: u64, error: &str) -> StorageResult<()>;

    // ===== Repository Upserts =====

    /// Inserts a repository or overwrites the existing row with the same id
    fn upsert_repo(&mut self, record: &RepoRecord) -> StorageResult<()>;

    /// Upserts all records of one fetched page inside a single transaction
    ///
    /// Either every record is committed or none is.
    ///
    /// # Returns
    ///
    /// The number of records written
    fn upsert_page(&mut self, records: &[RepoRecord]) -> StorageResult<usize>;

    // ===== Queries =====

    /// Gets a repository by its remote id
    fn get_repo(&self, repo_id: &str) -> StorageResult<Option<RepoRecord>>;

    /// Gets all repositories ordered by stargazer count, highest first
    fn repos_by_popularity(&self) -> StorageResult<Vec<RepoRecord>>;

    /// Gets the `limit` most starred repositories
    fn top_repos(&self, limit: usize) -> StorageResult<Vec<RepoRecord>>;

    /// Counts the rows in the `repos` table
    fn count_repos(&self) -> StorageResult<u64>;
}
