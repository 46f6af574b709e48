//! Query engine - paginated, category-filtered reads of one snapshot
//!
//! A request is `(categories, cursor, page)`:
//! - categories: `all` (or nothing) expands to every concrete category
//! - page: 1..=249, each page is a 50-entry window at `(page - 1) * 50`
//! - cursor: pins the read to one snapshot id; without it the newest
//!   snapshot is used
//!
//! Validation happens before the store is touched. Slicing happens inside
//! the store (see `AppendLog::window`).

use super::category::Category;
use super::db::{AppendLog, StoreError, WindowRequest};
use super::ids::SnapshotId;
use super::types::Leaderboard;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub const PAGE_SIZE: usize = 50;
pub const MIN_PAGE: i64 = 1;
pub const MAX_PAGE: i64 = 249;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    #[error("invalid page: {0}, must be an integer between 1 and 249")]
    InvalidPage(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("failed to get leaderboard: {0}")]
    Store(#[from] StoreError),
}

impl QueryError {
    /// True for errors caused by the request rather than the store
    pub fn is_client_error(&self) -> bool {
        !matches!(self, QueryError::Store(_))
    }
}

/// Parse a comma-separated category list
///
/// Stops at the first unknown token. Surrounding whitespace on a token is
/// ignored; an empty token is unknown.
pub fn parse_categories(csv: &str) -> Result<Vec<Category>, QueryError> {
    csv.split(',')
        .map(|token| {
            let token = token.trim();
            Category::from_token(token).ok_or_else(|| QueryError::InvalidCategory(token.to_string()))
        })
        .collect()
}

/// Check the page bound and return the window offset for it
pub fn page_offset(page: i64) -> Result<usize, QueryError> {
    if !(MIN_PAGE..=MAX_PAGE).contains(&page) {
        return Err(QueryError::InvalidPage(page.to_string()));
    }
    Ok((page - 1) as usize * PAGE_SIZE)
}

/// A validated leaderboard request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRequest {
    pub categories: Vec<Category>,
    pub cursor: Option<SnapshotId>,
    pub page: i64,
}

impl Default for LeaderboardRequest {
    fn default() -> Self {
        Self {
            categories: vec![Category::All],
            cursor: None,
            page: MIN_PAGE,
        }
    }
}

impl LeaderboardRequest {
    /// Parse raw query parameters, checked in order: category, page, cursor
    ///
    /// Absent or empty values take the defaults (`all`, page 1, newest
    /// snapshot).
    pub fn from_params(
        category: Option<&str>,
        page: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Self, QueryError> {
        let categories = match category {
            None | Some("") => vec![Category::All],
            Some(csv) => parse_categories(csv)?,
        };

        let page = match page {
            None | Some("") => MIN_PAGE,
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| QueryError::InvalidPage(raw.to_string()))?,
        };
        page_offset(page)?;

        let cursor = match cursor {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<SnapshotId>()
                    .map_err(|_| QueryError::InvalidCursor(raw.to_string()))?,
            ),
        };

        Ok(Self {
            categories,
            cursor,
            page,
        })
    }
}

/// Read side of the append log
pub struct QueryEngine {
    append_log: Arc<dyn AppendLog>,
}

impl QueryEngine {
    pub fn new(append_log: Arc<dyn AppendLog>) -> Self {
        Self { append_log }
    }

    /// Fetch the requested windows of one snapshot
    ///
    /// A cursor that matches no snapshot (e.g. one already removed by
    /// retention) yields `Leaderboard::empty()`, not an error.
    pub async fn query(
        &self,
        categories: &[Category],
        cursor: Option<SnapshotId>,
        page: i64,
    ) -> Result<Leaderboard, QueryError> {
        let offset = page_offset(page)?;
        let categories = Category::resolve(categories.iter().copied());

        let request = WindowRequest {
            categories: categories.into_iter().collect(),
            cursor,
            offset,
            limit: PAGE_SIZE,
        };

        let started = Instant::now();
        let result = self.append_log.window(&request).await?;
        log::debug!("Query took {:?}", started.elapsed());

        Ok(result.unwrap_or_else(Leaderboard::empty))
    }

    pub async fn run(&self, request: &LeaderboardRequest) -> Result<Leaderboard, QueryError> {
        self.query(&request.categories, request.cursor, request.page).await
    }

    /// Parse raw query parameters and run the query
    pub async fn query_params(
        &self,
        category: Option<&str>,
        page: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Leaderboard, QueryError> {
        let request = LeaderboardRequest::from_params(category, page, cursor)?;
        self.run(&request).await
    }
}
