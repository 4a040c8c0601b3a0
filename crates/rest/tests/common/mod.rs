//! Common test utilities for HTTP API testing.
//!
//! - [`FakeAdmin`] - In-memory stand-in for the privileged connection
//! - [`TestApp`] - Test server over an in-memory control plane

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use parking_lot::Mutex;

use dbforge_persistence::admin::DatabaseAdmin;
use dbforge_persistence::config::PostgresConfig;
use dbforge_persistence::control_plane::InMemoryControlPlane;
use dbforge_persistence::error::{BackendError, ResourceError, StorageError, StorageResult};
use dbforge_persistence::resolver::ServerEndpoint;
use dbforge_rest::extractors::X_OWNER_ID;
use dbforge_rest::{ServerConfig, create_app_with_config};

/// Records logins and databases without touching a server.
#[derive(Debug, Default)]
pub struct FakeAdmin {
    databases: Mutex<BTreeSet<String>>,
    logins: Mutex<BTreeSet<String>>,
    unreachable: AtomicBool,
}

impl FakeAdmin {
    /// Makes every call fail as if the server were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn databases(&self) -> Vec<String> {
        self.databases.lock().iter().cloned().collect()
    }

    fn check(&self) -> StorageResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "postgres".to_string(),
                message: "connection refused".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseAdmin for FakeAdmin {
    async fn create_login(&self, username: &str, _password: &str) -> StorageResult<()> {
        self.check()?;
        self.logins.lock().insert(username.to_string());
        Ok(())
    }

    async fn create_database(&self, database: &str, _owner: &str) -> StorageResult<()> {
        self.check()?;
        if !self.databases.lock().insert(database.to_string()) {
            return Err(ResourceError::AlreadyExists {
                resource_type: "database".to_string(),
                id: database.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn grant_all(&self, _database: &str, _username: &str) -> StorageResult<()> {
        self.check()
    }

    async fn drop_database(&self, database: &str) -> StorageResult<()> {
        self.check()?;
        self.databases.lock().remove(database);
        Ok(())
    }

    async fn drop_login(&self, username: &str) -> StorageResult<()> {
        self.check()?;
        self.logins.lock().remove(username);
        Ok(())
    }

    async fn list_databases(&self) -> StorageResult<Vec<String>> {
        self.check()?;
        Ok(self.databases())
    }
}

/// Test server wired to an in-memory control plane and a [`FakeAdmin`].
///
/// Tenant connections target a closed local port, so any request that gets
/// past validation and resolution fails with `503 unavailable`.
pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryControlPlane,
    pub admin: Arc<FakeAdmin>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::for_testing())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let store = InMemoryControlPlane::new();
        let admin = Arc::new(FakeAdmin::default());
        let endpoint = ServerEndpoint::from(&PostgresConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_secs: 1,
            ..Default::default()
        });

        let app = create_app_with_config(Arc::new(store.clone()), admin.clone(), endpoint, config);
        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            store,
            admin,
        }
    }

    /// Adds the owner header to a request.
    pub fn as_owner(request: TestRequest, owner: i64) -> TestRequest {
        request.add_header(owner_header(), HeaderValue::from(owner))
    }

    pub fn get(&self, path: &str, owner: i64) -> TestRequest {
        Self::as_owner(self.server.get(path), owner)
    }

    pub fn post(&self, path: &str, owner: i64) -> TestRequest {
        Self::as_owner(self.server.post(path), owner)
    }

    pub fn put(&self, path: &str, owner: i64) -> TestRequest {
        Self::as_owner(self.server.put(path), owner)
    }

    pub fn delete(&self, path: &str, owner: i64) -> TestRequest {
        Self::as_owner(self.server.delete(path), owner)
    }

    /// Provisions a database and returns its id.
    pub async fn provision(&self, owner: i64, name: &str) -> i64 {
        let response = self
            .post("/provision", owner)
            .json(&serde_json::json!({ "preferredName": name }))
            .await;
        response.assert_status_ok();

        let database_name = response.json::<serde_json::Value>()["databaseName"]
            .as_str()
            .unwrap()
            .to_string();

        let listed = self.get("/provision", owner).await.json::<serde_json::Value>();
        listed
            .as_array()
            .unwrap()
            .iter()
            .find(|db| db["databaseName"] == database_name.as_str())
            .and_then(|db| db["id"].as_i64())
            .unwrap()
    }
}

pub fn owner_header() -> HeaderName {
    X_OWNER_ID.clone()
}
