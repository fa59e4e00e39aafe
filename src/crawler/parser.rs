//! GraphQL request and response types for the repository search
//!
//! This module owns the query document sent to the search endpoint and
//! decodes the response envelope into a [`Page`].

use crate::storage::RepoRecord;
use crate::{CrawlerError, TransportError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Search query sent on every page fetch
pub const SEARCH_QUERY: &str = r#"
query ($cursor: String, $pageSize: Int!) {
  search(query: "stars:>0", type: REPOSITORY, first: $pageSize, after: $cursor) {
    repositoryCount
    pageInfo { hasNextPage endCursor }
    edges {
      node {
        ... on Repository {
          id
          nameWithOwner
          stargazerCount
          updatedAt
        }
      }
    }
  }
  rateLimit {
    limit
    cost
    remaining
    resetAt
  }
}
"#;

/// Request body for one page
#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub variables: SearchVariables<'a>,
}

/// Variables bound into [`SEARCH_QUERY`]
#[derive(Debug, Serialize)]
pub struct SearchVariables<'a> {
    /// `null` on the first page of a lineage
    pub cursor: Option<&'a str>,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

impl<'a> SearchRequest<'a> {
    pub fn new(cursor: Option<&'a str>, page_size: u32) -> Self {
        Self {
            query: SEARCH_QUERY,
            variables: SearchVariables { cursor, page_size },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<SearchData>,
    errors: Option<Vec<GraphQlError>>,
}

/// An entry of the `errors` array of a GraphQL response
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    search: SearchConnection,
    rate_limit: RateLimitInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    #[serde(default)]
    repository_count: u64,
    page_info: PageInfo,
    #[serde(default)]
    edges: Vec<SearchEdge>,
}

#[derive(Debug, Deserialize)]
struct SearchEdge {
    node: RawRepo,
}

/// A repository node as returned by the search
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRepo {
    pub id: String,
    pub name_with_owner: String,
    #[serde(default)]
    pub stargazer_count: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl RawRepo {
    /// Converts the node into a storable record stamped with `crawled_at`
    pub fn into_record(self, crawled_at: DateTime<Utc>) -> Result<RepoRecord, TransportError> {
        let stars = self.stargazer_count.unwrap_or(0);
        RepoRecord::new(&self.id, &self.name_with_owner, stars, crawled_at).ok_or_else(|| {
            TransportError::Malformed(format!(
                "repository {} has nameWithOwner '{}' without an owner",
                self.id, self.name_with_owner
            ))
        })
    }
}

/// Pagination state of a search page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// The cursor of the next page, if the search has one
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

/// Rate-limit snapshot returned alongside every page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub cost: i64,
    #[serde(default)]
    pub remaining: i64,
    /// RFC 3339 timestamp, e.g. `2024-05-01T12:00:00Z`
    #[serde(default)]
    pub reset_at: Option<String>,
}

/// One decoded page of search results
#[derive(Debug, Clone)]
pub struct Page {
    pub repository_count: u64,
    pub items: Vec<RawRepo>,
    pub page_info: PageInfo,
    pub rate_limit: RateLimitInfo,
}

/// Decodes a response body into a [`Page`]
///
/// An `errors` array takes precedence over any `data` that accompanies it.
///
/// # Returns
///
/// * `Ok(Page)` - The decoded page
/// * `Err(CrawlerError::RemoteQuery)` - The API reported query errors
/// * `Err(CrawlerError::Transport)` - The body was not a valid search response
pub fn parse_search_response(body: &str) -> Result<Page, CrawlerError> {
    let response: GraphQlResponse = serde_json::from_str(body)
        .map_err(|e| TransportError::Malformed(format!("invalid search response: {}", e)))?;

    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        let errors = errors
            .iter()
            .map(|e| match &e.kind {
                Some(kind) => format!("{}: {}", kind, e.message),
                None => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(CrawlerError::RemoteQuery { errors });
    }

    let data = response
        .data
        .ok_or_else(|| TransportError::Malformed("response has neither data nor errors".into()))?;

    Ok(Page {
        repository_count: data.search.repository_count,
        items: data.search.edges.into_iter().map(|edge| edge.node).collect(),
        page_info: data.search.page_info,
        rate_limit: data.rate_limit,
    })
}
