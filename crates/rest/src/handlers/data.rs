//! Row handlers under `/databases/{id}/data`.
//!
//! Every mutation answers `{affectedRows}`.

use axum::{
    Json,
    extract::{Path, State},
};
use dbforge_persistence::types::TableData;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::RestResult;
use crate::extractors::{JsonBody, OwnerExtractor, Pagination};
use crate::state::AppState;

/// Body of `POST /databases/{id}/data/insert`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertRequest {
    /// Target table.
    pub table_name: String,
    /// Column values of the new row.
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Body of `PUT /databases/{id}/data/update`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Target table.
    pub table_name: String,
    /// Columns to set.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Equality filter; must not be empty.
    #[serde(default, rename = "where")]
    pub filter: Map<String, Value>,
}

/// Body of `DELETE /databases/{id}/data/delete`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    /// Target table.
    pub table_name: String,
    /// Equality filter; must not be empty.
    #[serde(default, rename = "where")]
    pub filter: Map<String, Value>,
}

/// Row count reported by data mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedRows {
    /// Rows inserted, updated or deleted.
    pub affected_rows: u64,
}

/// Handler for reading one page of a table.
///
/// # HTTP Request
///
/// `GET [base]/databases/{id}/data/tables/{name}?page&pageSize`
pub async fn query_handler(
    State(state): State<AppState>,
    Path((database_id, table)): Path<(i64, String)>,
    owner: OwnerExtractor,
    pagination: Pagination,
) -> RestResult<Json<TableData>> {
    debug!(
        owner = %owner,
        database_id,
        table = %table,
        page = pagination.page(),
        page_size = pagination.page_size(),
        "Processing table data request"
    );

    let data = state
        .data()
        .query(
            owner.owner_id(),
            database_id,
            &table,
            pagination.page(),
            pagination.page_size(),
        )
        .await?;
    Ok(Json(data))
}

/// Handler for inserting one row.
///
/// # HTTP Request
///
/// `POST [base]/databases/{id}/data/insert` with `{tableName, data}`
pub async fn insert_handler(
    State(state): State<AppState>,
    Path(database_id): Path<i64>,
    owner: OwnerExtractor,
    JsonBody(request): JsonBody<InsertRequest>,
) -> RestResult<Json<AffectedRows>> {
    debug!(owner = %owner, database_id, table = %request.table_name, "Processing insert request");

    let affected_rows = state
        .data()
        .insert(owner.owner_id(), database_id, &request.table_name, &request.data)
        .await?;
    Ok(Json(AffectedRows { affected_rows }))
}

/// Handler for updating rows.
///
/// # HTTP Request
///
/// `PUT [base]/databases/{id}/data/update` with `{tableName, data, where}`
pub async fn update_handler(
    State(state): State<AppState>,
    Path(database_id): Path<i64>,
    owner: OwnerExtractor,
    JsonBody(request): JsonBody<UpdateRequest>,
) -> RestResult<Json<AffectedRows>> {
    debug!(owner = %owner, database_id, table = %request.table_name, "Processing update request");

    let affected_rows = state
        .data()
        .update(
            owner.owner_id(),
            database_id,
            &request.table_name,
            &request.data,
            &request.filter,
        )
        .await?;
    Ok(Json(AffectedRows { affected_rows }))
}

/// Handler for deleting rows.
///
/// # HTTP Request
///
/// `DELETE [base]/databases/{id}/data/delete` with `{tableName, where}`
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(database_id): Path<i64>,
    owner: OwnerExtractor,
    JsonBody(request): JsonBody<DeleteRequest>,
) -> RestResult<Json<AffectedRows>> {
    debug!(owner = %owner, database_id, table = %request.table_name, "Processing delete request");

    let affected_rows = state
        .data()
        .delete(owner.owner_id(), database_id, &request.table_name, &request.filter)
        .await?;
    Ok(Json(AffectedRows { affected_rows }))
}
