//! Crawler module for paging through the repository search
//!
//! This module contains the core crawling logic, including:
//! - The GraphQL query and response decoding
//! - HTTP fetching of single pages
//! - Rate-limit aware pacing
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{build_http_client, GitHubClient, REQUEST_TIMEOUT};
pub use parser::{
    parse_search_response, GraphQlError, Page, PageInfo, RateLimitInfo, RawRepo, SearchRequest,
    SEARCH_QUERY,
};
pub use scheduler::{parse_reset_at, RateLimiter, LOW_QUOTA_THRESHOLD, RESET_BUFFER};
