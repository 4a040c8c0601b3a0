//! Axum extractors for the dbforge API.
//!
//! - [`OwnerExtractor`] - Authenticated owner from the `X-Owner-Id` header
//! - [`Pagination`] - `page` / `pageSize` query parameters
//! - [`JsonBody`] - JSON request bodies with structured rejections

mod json;
mod owner;
mod pagination;

pub use json::JsonBody;
pub use owner::{OwnerExtractor, X_OWNER_ID};
pub use pagination::Pagination;
