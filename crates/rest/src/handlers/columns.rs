//! Column handlers under `/databases/{id}/tables/{name}/columns`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dbforge_persistence::types::{ColumnInfo, ColumnSpec};
use serde_json::json;
use tracing::debug;

use crate::error::RestResult;
use crate::extractors::{JsonBody, OwnerExtractor};
use crate::state::AppState;

/// Handler for reading column metadata in ordinal order.
///
/// # HTTP Request
///
/// `GET [base]/databases/{id}/tables/{name}/columns`
pub async fn list_columns_handler(
    State(state): State<AppState>,
    Path((database_id, table)): Path<(i64, String)>,
    owner: OwnerExtractor,
) -> RestResult<Json<Vec<ColumnInfo>>> {
    debug!(owner = %owner, database_id, table = %table, "Processing column list request");

    let columns = state
        .schema()
        .list_columns(owner.owner_id(), database_id, &table)
        .await?;
    Ok(Json(columns))
}

/// Handler for adding a column.
///
/// # HTTP Request
///
/// `POST [base]/databases/{id}/tables/{name}/columns`
/// with `{name, dataType, isNullable, defaultValue?}`
pub async fn add_column_handler(
    State(state): State<AppState>,
    Path((database_id, table)): Path<(i64, String)>,
    owner: OwnerExtractor,
    JsonBody(column): JsonBody<ColumnSpec>,
) -> RestResult<Response> {
    debug!(owner = %owner, database_id, table = %table, column = %column.name, "Processing add column request");

    state
        .schema()
        .add_column(owner.owner_id(), database_id, &table, &column)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "columnName": column.name }))).into_response())
}

/// Handler for changing a column's type, nullability and default.
///
/// # HTTP Request
///
/// `PUT [base]/databases/{id}/tables/{name}/columns`
pub async fn modify_column_handler(
    State(state): State<AppState>,
    Path((database_id, table)): Path<(i64, String)>,
    owner: OwnerExtractor,
    JsonBody(column): JsonBody<ColumnSpec>,
) -> RestResult<Response> {
    debug!(owner = %owner, database_id, table = %table, column = %column.name, "Processing modify column request");

    state
        .schema()
        .modify_column(owner.owner_id(), database_id, &table, &column)
        .await?;

    Ok((StatusCode::OK, Json(json!({ "columnName": column.name }))).into_response())
}

/// Handler for dropping a column.
///
/// # HTTP Request
///
/// `DELETE [base]/databases/{id}/tables/{name}/columns/{column}`
pub async fn drop_column_handler(
    State(state): State<AppState>,
    Path((database_id, table, column)): Path<(i64, String, String)>,
    owner: OwnerExtractor,
) -> RestResult<Response> {
    debug!(owner = %owner, database_id, table = %table, column = %column, "Processing drop column request");

    state
        .schema()
        .drop_column(owner.owner_id(), database_id, &table, &column)
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
