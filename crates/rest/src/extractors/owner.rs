//! Owner identity extractor.
//!
//! Reads the authenticated owner from the `X-Owner-Id` header set by the
//! gateway. Authentication itself happens upstream.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, request::Parts},
};
use dbforge_persistence::owner::OwnerId;

use crate::error::RestError;

/// Header carrying the authenticated owner id.
pub static X_OWNER_ID: HeaderName = HeaderName::from_static("x-owner-id");

/// Axum extractor for the calling owner.
///
/// Rejects the request with `401 Unauthorized` when the header is missing or
/// is not a positive integer.
///
/// # Example
///
/// ```rust,ignore
/// use dbforge_rest::extractors::OwnerExtractor;
///
/// async fn handler(owner: OwnerExtractor) {
///     println!("Owner: {}", owner.owner_id());
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct OwnerExtractor(OwnerId);

impl OwnerExtractor {
    /// Returns the owner id.
    pub fn owner_id(&self) -> OwnerId {
        self.0
    }
}

impl std::fmt::Display for OwnerExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extracts the owner id from headers.
fn extract_owner_from_headers(headers: &HeaderMap) -> Result<OwnerId, RestError> {
    let value = headers
        .get(&X_OWNER_ID)
        .ok_or_else(|| RestError::Unauthorized {
            message: "missing X-Owner-Id header".to_string(),
        })?;

    value
        .to_str()
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| RestError::Unauthorized {
            message: "invalid X-Owner-Id header".to_string(),
        })
}

impl<S> FromRequestParts<S> for OwnerExtractor
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_owner_from_headers(&parts.headers).map(OwnerExtractor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(&X_OWNER_ID, HeaderValue::from_static("42"));
        assert_eq!(
            extract_owner_from_headers(&headers).unwrap(),
            OwnerId::new(42)
        );
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let err = extract_owner_from_headers(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, RestError::Unauthorized { .. }));
    }

    #[test]
    fn test_invalid_header_is_unauthorized() {
        for value in ["abc", "0", "-3", ""] {
            let mut headers = HeaderMap::new();
            headers.insert(&X_OWNER_ID, HeaderValue::from_str(value).unwrap());
            let err = extract_owner_from_headers(&headers).unwrap_err();
            assert!(matches!(err, RestError::Unauthorized { .. }), "{value}");
        }
    }
}
