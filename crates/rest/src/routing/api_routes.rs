//! API route configuration.

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::handlers;
use crate::state::AppState;

/// Creates all API routes.
///
/// # Routes
///
/// ## Probes
/// - `GET /health`, `GET /_liveness`, `GET /_readiness`
///
/// ## Provisioning
/// - `POST /provision` - Provision a database
/// - `GET /provision` - List databases
/// - `GET /provision/{id}` - Read a database
/// - `DELETE /provision/{id}` - Deprovision a database
///
/// ## Schema
/// - `GET|POST /databases/{id}/tables`
/// - `DELETE /databases/{id}/tables/{name}`
/// - `GET|POST|PUT /databases/{id}/tables/{name}/columns`
/// - `DELETE /databases/{id}/tables/{name}/columns/{column}`
///
/// ## Data
/// - `GET /databases/{id}/data/tables/{name}?page&pageSize`
/// - `POST /databases/{id}/data/insert`
/// - `PUT /databases/{id}/data/update`
/// - `DELETE /databases/{id}/data/delete`
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // Probes
        .route("/health", get(handlers::health_handler))
        .route("/_liveness", get(handlers::health::liveness_handler))
        .route("/_readiness", get(handlers::health::readiness_handler))
        // Provisioning
        .route(
            "/provision",
            post(handlers::provision_handler).get(handlers::list_handler),
        )
        .route(
            "/provision/{id}",
            get(handlers::read_handler).delete(handlers::deprovision_handler),
        )
        // Schema
        .route(
            "/databases/{id}/tables",
            get(handlers::list_tables_handler).post(handlers::create_table_handler),
        )
        .route(
            "/databases/{id}/tables/{name}",
            delete(handlers::drop_table_handler),
        )
        .route(
            "/databases/{id}/tables/{name}/columns",
            get(handlers::list_columns_handler)
                .post(handlers::add_column_handler)
                .put(handlers::modify_column_handler),
        )
        .route(
            "/databases/{id}/tables/{name}/columns/{column}",
            delete(handlers::drop_column_handler),
        )
        // Data
        .route(
            "/databases/{id}/data/tables/{name}",
            get(handlers::query_handler),
        )
        .route("/databases/{id}/data/insert", post(handlers::insert_handler))
        .route("/databases/{id}/data/update", put(handlers::update_handler))
        .route("/databases/{id}/data/delete", delete(handlers::delete_handler))
        // State
        .with_state(state)
}
