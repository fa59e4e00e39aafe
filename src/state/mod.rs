//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: lifecycle of a single crawl run (idle, running, done, failed)

mod crawl_state;

pub use crawl_state::CrawlState;
