//! Pagination extractor.
//!
//! Extracts `page` and `pageSize` query parameters for table data reads.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use crate::error::RestError;
use crate::state::AppState;

/// Axum extractor for pagination parameters.
///
/// `page` is 1-based and coerced to at least 1. `pageSize` falls back to the
/// configured default and is capped at the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: i64,
    page_size: i64,
}

/// Query parameters for pagination.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginationQuery {
    page: Option<i64>,
    page_size: Option<i64>,
}

impl Pagination {
    /// Creates a Pagination, coercing both values into range.
    pub fn new(page: i64, page_size: i64, max_page_size: i64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, max_page_size.max(1)),
        }
    }

    /// Returns the 1-based page number.
    pub fn page(&self) -> i64 {
        self.page
    }

    /// Returns the page size.
    pub fn page_size(&self) -> i64 {
        self.page_size
    }
}

impl FromRequestParts<AppState> for Pagination {
    type Rejection = RestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PaginationQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| RestError::bad_request("invalid-query", e.body_text()))?;

        Ok(Pagination::new(
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(state.default_page_size()),
            state.max_page_size(),
        ))
    }
}
