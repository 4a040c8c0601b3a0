//! HTTP API tests over an in-memory control plane.
//!
//! Run with: `cargo test -p dbforge-rest --test api_tests`

mod common;

use axum::http::{HeaderValue, StatusCode};
use serde_json::{Value, json};

use common::{TestApp, owner_header};

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

// ============================================================================
// Probes
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");

    app.server.get("/_liveness").await.assert_status_ok();

    let response = app.server.get("/_readiness").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ready");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_server() {
    let app = TestApp::new();
    app.admin.set_unreachable(true);

    let response = app.server.get("/_readiness").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// Owner identity
// ============================================================================

#[tokio::test]
async fn test_missing_owner_header_is_unauthorized() {
    let app = TestApp::new();

    for response in [
        app.server.get("/provision").await,
        app.server.post("/provision").await,
        app.server.get("/databases/1/tables").await,
        app.server.delete("/provision/1").await,
    ] {
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&response.json::<Value>()), "unauthorized");
    }
}

#[tokio::test]
async fn test_malformed_owner_header_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/provision")
        .add_header(owner_header(), HeaderValue::from_static("not-a-number"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/provision")
        .add_header(owner_header(), HeaderValue::from_static("0"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Provisioning
// ============================================================================

#[tokio::test]
async fn test_provision_returns_credentials() {
    let app = TestApp::new();

    let response = app
        .post("/provision", 1)
        .json(&json!({ "preferredName": "My Shop!" }))
        .await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["databaseName"], "myshop");
    assert!(body["username"].as_str().unwrap().starts_with('u'));
    assert!(!body["password"].as_str().unwrap().is_empty());

    let connection_string = body["connectionString"].as_str().unwrap();
    assert!(connection_string.starts_with("postgres://"));
    assert!(connection_string.contains("/myshop"));

    assert_eq!(app.admin.databases(), vec!["myshop".to_string()]);
}

#[tokio::test]
async fn test_provision_without_body_generates_name() {
    let app = TestApp::new();

    let response = app.post("/provision", 1).await;
    response.assert_status_ok();

    let name = response.json::<Value>()["databaseName"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(name.starts_with("tenant"));
    assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

#[tokio::test]
async fn test_provision_reuses_login() {
    let app = TestApp::new();

    let first = app
        .post("/provision", 1)
        .json(&json!({ "preferredName": "one" }))
        .await
        .json::<Value>();
    let second = app
        .post("/provision", 1)
        .json(&json!({ "preferredName": "two" }))
        .await
        .json::<Value>();

    assert_eq!(first["username"], second["username"]);
    assert_eq!(first["password"], second["password"]);
}

#[tokio::test]
async fn test_provision_quota_exceeded() {
    let app = TestApp::new();

    for name in ["a", "b", "c"] {
        app.provision(1, name).await;
    }

    let response = app
        .post("/provision", 1)
        .json(&json!({ "preferredName": "d" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(error_code(&response.json::<Value>()), "quota-exceeded");
    assert_eq!(app.admin.databases().len(), 3);

    // Quotas are per owner.
    app.provision(2, "other").await;
}

#[tokio::test]
async fn test_provision_name_collision_is_conflict() {
    let app = TestApp::new();
    app.provision(1, "shared").await;

    let response = app
        .post("/provision", 2)
        .json(&json!({ "preferredName": "shared" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&response.json::<Value>()), "conflict");

    let listed = app.get("/provision", 2).await.json::<Value>();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_provision_malformed_body() {
    let app = TestApp::new();

    let response = app
        .post("/provision", 1)
        .text("{not json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "invalid-body");
}

#[tokio::test]
async fn test_provision_admin_unreachable() {
    let app = TestApp::new();
    app.admin.set_unreachable(true);

    let response = app.post("/provision", 1).await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&response.json::<Value>()), "unavailable");
}

#[tokio::test]
async fn test_list_and_read_databases() {
    let app = TestApp::new();
    let first = app.provision(1, "first").await;
    let second = app.provision(1, "second").await;

    let listed = app.get("/provision", 1).await.json::<Value>();
    let ids: Vec<i64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|db| db["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![second, first]);
    assert!(listed[0]["createdAt"].is_string());

    let response = app.get(&format!("/provision/{}", first), 1).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["databaseName"], "first");
}

#[tokio::test]
async fn test_read_other_owners_database_is_not_found() {
    let app = TestApp::new();
    let id = app.provision(1, "private").await;

    let response = app.get(&format!("/provision/{}", id), 2).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&response.json::<Value>()), "not-found");

    let listed = app.get("/provision", 2).await.json::<Value>();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_deprovision() {
    let app = TestApp::new();
    let id = app.provision(1, "gone").await;

    let response = app.delete(&format!("/provision/{}", id), 1).await;
    response.assert_status(StatusCode::NO_CONTENT);
    assert!(app.admin.databases().is_empty());

    let response = app.delete(&format!("/provision/{}", id), 1).await;
    response.assert_status(StatusCode::NOT_FOUND);

    // The name is free again.
    app.provision(1, "gone").await;
}

#[tokio::test]
async fn test_deprovision_other_owner_is_not_found() {
    let app = TestApp::new();
    let id = app.provision(1, "mine").await;

    let response = app.delete(&format!("/provision/{}", id), 2).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(app.admin.databases(), vec!["mine".to_string()]);
}

// ============================================================================
// Schema and data validation
// ============================================================================

#[tokio::test]
async fn test_unknown_database_is_not_found() {
    let app = TestApp::new();

    let response = app.get("/databases/999/tables", 1).await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = app.get("/databases/999/data/tables/t", 1).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_owners_database_is_not_found() {
    let app = TestApp::new();
    let id = app.provision(1, "secret").await;

    let response = app.get(&format!("/databases/{}/tables", id), 2).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_table_without_columns() {
    let app = TestApp::new();
    let id = app.provision(1, "shop").await;

    let response = app
        .post(&format!("/databases/{}/tables", id), 1)
        .json(&json!({ "tableName": "people", "columns": [] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "empty-payload");
}

#[tokio::test]
async fn test_create_table_malformed_body() {
    let app = TestApp::new();
    let id = app.provision(1, "shop").await;

    let response = app
        .post(&format!("/databases/{}/tables", id), 1)
        .json(&json!({ "columns": [] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "invalid-body");
}

#[tokio::test]
async fn test_insert_with_empty_data() {
    let app = TestApp::new();
    let id = app.provision(1, "shop").await;

    let response = app
        .post(&format!("/databases/{}/data/insert", id), 1)
        .json(&json!({ "tableName": "people", "data": {} }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "empty-payload");
}

#[tokio::test]
async fn test_update_and_delete_require_filter() {
    let app = TestApp::new();
    let id = app.provision(1, "shop").await;

    let response = app
        .put(&format!("/databases/{}/data/update", id), 1)
        .json(&json!({ "tableName": "people", "data": { "name": "z" }, "where": {} }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "missing-filter");

    let response = app
        .delete(&format!("/databases/{}/data/delete", id), 1)
        .json(&json!({ "tableName": "people" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "missing-filter");
}

#[tokio::test]
async fn test_invalid_pagination_is_bad_request() {
    let app = TestApp::new();
    let id = app.provision(1, "shop").await;

    let response = app
        .get(&format!("/databases/{}/data/tables/people?page=abc", id), 1)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "invalid-query");
}

#[tokio::test]
async fn test_unreachable_tenant_server_is_unavailable() {
    let app = TestApp::new();
    let id = app.provision(1, "shop").await;

    let response = app.get(&format!("/databases/{}/tables", id), 1).await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&response.json::<Value>()), "unavailable");

    let response = app
        .post(&format!("/databases/{}/data/insert", id), 1)
        .json(&json!({ "tableName": "people", "data": { "name": "a" } }))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_missing_login_is_configuration_error() {
    use dbforge_persistence::control_plane::{AccountTransaction, ControlPlaneStore};
    use dbforge_persistence::owner::OwnerId;
    use dbforge_persistence::types::TenantAccount;

    let app = TestApp::new();
    let owner = OwnerId::new(5);
    app.store
        .create_account(TenantAccount::new(owner))
        .await
        .unwrap();

    let mut tx = app.store.lock_account(owner).await.unwrap();
    let record = tx.insert_database("orphan", None).await.unwrap();
    tx.commit().await.unwrap();

    let response = app
        .get(&format!("/databases/{}/tables", record.id), 5)
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&response.json::<Value>()), "configuration");
}
