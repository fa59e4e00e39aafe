//! CSV snapshot export
//!
//! Writes the whole `repos` table, most starred first, to a CSV file.

use crate::storage::{RepoRecord, Storage};
use crate::CrawlerError;
use serde::Serialize;
use std::path::Path;

/// Column order of the export
pub const CSV_HEADER: [&str; 7] = [
    "repo_id",
    "full_name",
    "owner",
    "name",
    "stargazers_count",
    "last_crawled",
    "metadata",
];

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    repo_id: &'a str,
    full_name: &'a str,
    owner: &'a str,
    name: &'a str,
    stargazers_count: i64,
    last_crawled: String,
    metadata: String,
}

impl<'a> CsvRow<'a> {
    fn from_record(record: &'a RepoRecord) -> Result<Self, CrawlerError> {
        let metadata = serde_json::to_string(&record.metadata).map_err(|e| {
            crate::storage::StorageError::Serialization(format!(
                "metadata of {}: {}",
                record.repo_id, e
            ))
        })?;

        Ok(Self {
            repo_id: &record.repo_id,
            full_name: &record.full_name,
            owner: &record.owner,
            name: &record.name,
            stargazers_count: record.stargazers_count,
            last_crawled: record.last_crawled.to_rfc3339(),
            metadata,
        })
    }
}

/// Exports every repository to `output_path` as CSV
///
/// Missing parent directories are created and an existing file is
/// overwritten. The header row is written even when the table is empty.
///
/// # Arguments
///
/// * `storage` - The storage backend to read from
/// * `output_path` - Destination CSV file
///
/// # Returns
///
/// * `Ok(usize)` - Number of data rows written
/// * `Err(CrawlerError)` - Failed to read the table or write the file
pub fn export_csv(storage: &dyn Storage, output_path: &Path) -> Result<usize, CrawlerError> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let repos = storage.repos_by_popularity()?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(output_path)?;
    writer.write_record(CSV_HEADER)?;

    for record in &repos {
        writer.serialize(CsvRow::from_record(record)?)?;
    }
    writer.flush()?;

    tracing::info!("CSV exported: {} ({} rows)", output_path.display(), repos.len());

    Ok(repos.len())
}
