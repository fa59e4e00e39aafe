//! Output module for exporting crawl results
//!
//! This module handles:
//! - Exporting the repository table as a sorted CSV snapshot
//! - Reporting crawl statistics

mod csv_export;
pub mod stats;

pub use csv_export::{export_csv, CSV_HEADER};
pub use stats::{format_statistics, load_statistics, print_statistics, CrawlStatistics};
