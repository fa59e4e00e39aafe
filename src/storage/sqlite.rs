//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RepoRecord, RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use std::path::Path;

const REPO_COLUMNS: &str =
    "repo_id, full_name, owner, name, stargazers_count, last_crawled, metadata";

const UPSERT_SQL: &str = "
    INSERT INTO repos (repo_id, full_name, owner, name, stargazers_count, last_crawled, metadata)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(repo_id) DO UPDATE SET
        full_name = excluded.full_name,
        owner = excluded.owner,
        name = excluded.name,
        stargazers_count = excluded.stargazers_count,
        last_crawled = excluded.last_crawled,
        metadata = excluded.metadata";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// Missing parent directories of `path` are created.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Writes one record through any connection or open transaction
fn upsert_with(conn: &Connection, record: &RepoRecord) -> StorageResult<()> {
    let metadata = serde_json::to_string(&record.metadata)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    conn.execute(
        UPSERT_SQL,
        params![
            record.repo_id,
            record.full_name,
            record.owner,
            record.name,
            record.stargazers_count,
            record.last_crawled.to_rfc3339(),
            metadata
        ],
    )
    .map_err(|source| StorageError::Upsert {
        repo_id: record.repo_id.clone(),
        source,
    })?;

    Ok(())
}

fn repo_from_row(row: &Row<'_>) -> rusqlite::Result<RepoRecord> {
    let last_crawled: String = row.get(5)?;
    let last_crawled = last_crawled
        .parse::<DateTime<Utc>>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    let metadata: String = row.get(6)?;
    let metadata: Map<String, Value> = serde_json::from_str(&metadata)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(RepoRecord {
        repo_id: row.get(0)?,
        full_name: row.get(1)?,
        owner: row.get(2)?,
        name: row.get(3)?,
        stargazers_count: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        last_crawled,
        metadata,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        rows_ingested: row.get::<_, i64>(5)? as u64,
        error_message: row.get(6)?,
    })
}

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, rows_ingested, error_message";

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn complete_run(&mut self, run_id: i64, rows_ingested: u64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, rows_ingested = ?3 WHERE id = ?4",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                rows_ingested as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, rows_ingested: u64, error: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, rows_ingested = ?3, error_message = ?4
             WHERE id = ?5",
            params![
                RunStatus::Failed.to_db_string(),
                now,
                rows_ingested as i64,
                error,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Repository Upserts =====

    fn upsert_repo(&mut self, record: &RepoRecord) -> StorageResult<()> {
        upsert_with(&self.conn, record)
    }

    fn upsert_page(&mut self, records: &[RepoRecord]) -> StorageResult<usize> {
        // Dropping the transaction on error rolls the whole page back
        let tx = self.conn.transaction()?;
        for record in records {
            upsert_with(&tx, record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    // ===== Queries =====

    fn get_repo(&self, repo_id: &str) -> StorageResult<Option<RepoRecord>> {
        let repo = self
            .conn
            .query_row(
                &format!("SELECT {} FROM repos WHERE repo_id = ?1", REPO_COLUMNS),
                params![repo_id],
                repo_from_row,
            )
            .optional()?;
        Ok(repo)
    }

    fn repos_by_popularity(&self) -> StorageResult<Vec<RepoRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM repos ORDER BY stargazers_count DESC, repo_id ASC",
            REPO_COLUMNS
        ))?;

        let repos = stmt
            .query_map([], repo_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(repos)
    }

    fn top_repos(&self, limit: usize) -> StorageResult<Vec<RepoRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM repos ORDER BY stargazers_count DESC, repo_id ASC LIMIT ?1",
            REPO_COLUMNS
        ))?;

        let repos = stmt
            .query_map(params![limit as i64], repo_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(repos)
    }

    fn count_repos(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM repos", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
