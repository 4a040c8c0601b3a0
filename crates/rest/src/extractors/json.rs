//! JSON body extractor with structured rejections.

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::RestError;

/// Like [`axum::Json`], but malformed bodies are rejected with the API's
/// error envelope (`400 invalid-body`) instead of plain text.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| RestError::bad_request("invalid-body", rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}
