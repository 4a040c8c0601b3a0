//! Provisioning handlers.
//!
//! `POST /provision`, `GET /provision`, `GET /provision/{id}` and
//! `DELETE /provision/{id}`.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dbforge_persistence::types::DatabaseInfo;
use serde::Deserialize;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::extractors::OwnerExtractor;
use crate::state::AppState;

/// Body of `POST /provision`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    /// Human-friendly name; sanitized before use.
    #[serde(default)]
    pub preferred_name: Option<String>,
}

/// Handler for provisioning a new database.
///
/// The body is optional; an empty body provisions a database with a
/// generated name.
///
/// # HTTP Request
///
/// `POST [base]/provision`
///
/// # Response
///
/// - `200 OK` - `{databaseName, username, password, connectionString}`
/// - `403 Forbidden` - Quota reached
/// - `409 Conflict` - The derived name is taken
pub async fn provision_handler(
    State(state): State<AppState>,
    owner: OwnerExtractor,
    body: Bytes,
) -> RestResult<Response> {
    let request: ProvisionRequest = if body.is_empty() {
        ProvisionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| RestError::bad_request("invalid-body", e.to_string()))?
    };

    debug!(owner = %owner, preferred_name = ?request.preferred_name, "Processing provision request");

    let provisioned = state
        .provisioner()
        .provision(owner.owner_id(), request.preferred_name.as_deref())
        .await?;

    Ok((StatusCode::OK, Json(provisioned.to_login())).into_response())
}

/// Handler for listing the caller's databases, newest first.
///
/// # HTTP Request
///
/// `GET [base]/provision`
pub async fn list_handler(
    State(state): State<AppState>,
    owner: OwnerExtractor,
) -> RestResult<Json<Vec<DatabaseInfo>>> {
    debug!(owner = %owner, "Processing database list request");

    let databases = state.provisioner().list(owner.owner_id()).await?;
    Ok(Json(databases.iter().map(DatabaseInfo::from).collect()))
}

/// Handler for reading one of the caller's databases.
///
/// # HTTP Request
///
/// `GET [base]/provision/{id}`
///
/// # Response
///
/// - `200 OK` - `{id, databaseName, createdAt}`
/// - `404 Not Found` - Absent or owned by someone else
pub async fn read_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    owner: OwnerExtractor,
) -> RestResult<Json<DatabaseInfo>> {
    debug!(owner = %owner, id, "Processing database read request");

    let database = state.provisioner().get(owner.owner_id(), id).await?;
    Ok(Json(DatabaseInfo::from(&database)))
}

/// Handler for deprovisioning a database.
///
/// # HTTP Request
///
/// `DELETE [base]/provision/{id}`
///
/// # Response
///
/// - `204 No Content` - Database dropped
/// - `404 Not Found` - Absent or owned by someone else
pub async fn deprovision_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    owner: OwnerExtractor,
) -> RestResult<Response> {
    debug!(owner = %owner, id, "Processing deprovision request");

    if state.provisioner().deprovision(owner.owner_id(), id).await? {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(RestError::NotFound {
            message: format!("database not found: {}", id),
        })
    }
}
