//! Table handlers.
//!
//! `GET /databases/{id}/tables`, `POST /databases/{id}/tables` and
//! `DELETE /databases/{id}/tables/{name}`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dbforge_persistence::types::{TableInfo, TableSpec};
use serde_json::json;
use tracing::debug;

use crate::error::RestResult;
use crate::extractors::{JsonBody, OwnerExtractor};
use crate::state::AppState;

/// Handler for listing tables with their row counts.
///
/// # HTTP Request
///
/// `GET [base]/databases/{id}/tables`
pub async fn list_tables_handler(
    State(state): State<AppState>,
    Path(database_id): Path<i64>,
    owner: OwnerExtractor,
) -> RestResult<Json<Vec<TableInfo>>> {
    debug!(owner = %owner, database_id, "Processing table list request");

    let tables = state
        .schema()
        .list_tables(owner.owner_id(), database_id)
        .await?;
    Ok(Json(tables))
}

/// Handler for creating a table.
///
/// # HTTP Request
///
/// `POST [base]/databases/{id}/tables` with `{tableName, columns[]}`
///
/// # Response
///
/// - `201 Created`
/// - `400 Bad Request` - No columns, or the engine rejected the definition
/// - `409 Conflict` - The table exists
pub async fn create_table_handler(
    State(state): State<AppState>,
    Path(database_id): Path<i64>,
    owner: OwnerExtractor,
    JsonBody(spec): JsonBody<TableSpec>,
) -> RestResult<Response> {
    debug!(
        owner = %owner,
        database_id,
        table = %spec.table_name,
        columns = spec.columns.len(),
        "Processing create table request"
    );

    state
        .schema()
        .create_table(owner.owner_id(), database_id, &spec)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "tableName": spec.table_name })),
    )
        .into_response())
}

/// Handler for dropping a table.
///
/// # HTTP Request
///
/// `DELETE [base]/databases/{id}/tables/{name}`
pub async fn drop_table_handler(
    State(state): State<AppState>,
    Path((database_id, table)): Path<(i64, String)>,
    owner: OwnerExtractor,
) -> RestResult<Response> {
    debug!(owner = %owner, database_id, table = %table, "Processing drop table request");

    state
        .schema()
        .drop_table(owner.owner_id(), database_id, &table)
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
