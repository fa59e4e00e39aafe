//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Repository upserts, one transaction per fetched page
//! - Ordered reads for export and statistics
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a repository row in the `repos` table
#[derive(Debug, Clone, PartialEq)]
pub struct RepoRecord {
    /// GitHub node id, the primary key
    pub repo_id: String,
    pub full_name: String,
    pub owner: String,
    pub name: String,
    pub stargazers_count: i64,
    pub last_crawled: DateTime<Utc>,
    /// Reserved; always written as an empty object
    pub metadata: Map<String, Value>,
}

impl RepoRecord {
    /// Builds a record from a `owner/name` full name
    ///
    /// Returns `None` if `full_name` contains no `/`.
    pub fn new(
        repo_id: impl Into<String>,
        full_name: impl Into<String>,
        stargazers_count: i64,
        last_crawled: DateTime<Utc>,
    ) -> Option<Self> {
        let full_name = full_name.into();
        let (owner, name) = split_full_name(&full_name)?;
        let (owner, name) = (owner.to_string(), name.to_string());

        Some(Self {
            repo_id: repo_id.into(),
            full_name,
            owner,
            name,
            stargazers_count,
            last_crawled,
            metadata: Map::new(),
        })
    }
}

/// Splits `owner/name` on the first `/`
pub fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    full_name.split_once('/')
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub rows_ingested: u64,
    pub error_message: Option<String>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
