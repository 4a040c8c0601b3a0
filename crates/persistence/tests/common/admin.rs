//! A fake [`DatabaseAdmin`] that records calls and can be told to fail.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use dbforge_persistence::admin::DatabaseAdmin;
use dbforge_persistence::error::{BackendError, ResourceError, StorageError, StorageResult};

/// One call made against the admin connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCall {
    CreateLogin(String),
    CreateDatabase { database: String, owner: String },
    GrantAll { database: String, username: String },
    DropDatabase(String),
    DropLogin(String),
}

/// Which admin operation should fail next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    CreateLogin,
    CreateDatabase,
    GrantAll,
    DropDatabase,
    DropLogin,
}

#[derive(Debug, Default)]
struct Catalog {
    calls: Vec<AdminCall>,
    databases: BTreeSet<String>,
    logins: BTreeSet<String>,
    fail_on: Vec<FailPoint>,
}

/// Simulated server catalog.
#[derive(Debug, Clone, Default)]
pub struct RecordingAdmin {
    catalog: Arc<Mutex<Catalog>>,
}

fn injected(what: &str) -> StorageError {
    StorageError::Backend(BackendError::QueryError {
        code: "XX000".to_string(),
        message: format!("injected {} failure", what),
    })
}

impl RecordingAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call to `point` fail. Stacks with earlier calls.
    pub fn fail_on(&self, point: FailPoint) {
        self.catalog.lock().fail_on.push(point);
    }

    /// Pretends a database already exists on the server.
    pub fn add_existing_database(&self, name: &str) {
        self.catalog.lock().databases.insert(name.to_string());
    }

    /// Removes a database from the catalog without recording a call.
    pub fn drop_database_silently(&self, name: &str) {
        self.catalog.lock().databases.remove(name);
    }

    pub fn calls(&self) -> Vec<AdminCall> {
        self.catalog.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.catalog.lock().calls.clear();
    }

    pub fn databases(&self) -> Vec<String> {
        self.catalog.lock().databases.iter().cloned().collect()
    }

    pub fn logins(&self) -> Vec<String> {
        self.catalog.lock().logins.iter().cloned().collect()
    }

    fn take_failure(catalog: &mut Catalog, point: FailPoint) -> bool {
        match catalog.fail_on.iter().position(|p| *p == point) {
            Some(pos) => {
                catalog.fail_on.remove(pos);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl DatabaseAdmin for RecordingAdmin {
    async fn create_login(&self, username: &str, _password: &str) -> StorageResult<()> {
        let mut catalog = self.catalog.lock();
        catalog.calls.push(AdminCall::CreateLogin(username.to_string()));
        if Self::take_failure(&mut catalog, FailPoint::CreateLogin) {
            return Err(injected("create login"));
        }
        if !catalog.logins.insert(username.to_string()) {
            return Err(ResourceError::AlreadyExists {
                resource_type: "role".to_string(),
                id: username.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn create_database(&self, database: &str, owner: &str) -> StorageResult<()> {
        let mut catalog = self.catalog.lock();
        catalog.calls.push(AdminCall::CreateDatabase {
            database: database.to_string(),
            owner: owner.to_string(),
        });
        if Self::take_failure(&mut catalog, FailPoint::CreateDatabase) {
            return Err(injected("create database"));
        }
        if !catalog.databases.insert(database.to_string()) {
            return Err(ResourceError::AlreadyExists {
                resource_type: "database".to_string(),
                id: database.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn grant_all(&self, database: &str, username: &str) -> StorageResult<()> {
        let mut catalog = self.catalog.lock();
        catalog.calls.push(AdminCall::GrantAll {
            database: database.to_string(),
            username: username.to_string(),
        });
        if Self::take_failure(&mut catalog, FailPoint::GrantAll) {
            return Err(injected("grant"));
        }
        Ok(())
    }

    async fn drop_database(&self, database: &str) -> StorageResult<()> {
        let mut catalog = self.catalog.lock();
        catalog.calls.push(AdminCall::DropDatabase(database.to_string()));
        if Self::take_failure(&mut catalog, FailPoint::DropDatabase) {
            return Err(injected("drop database"));
        }
        catalog.databases.remove(database);
        Ok(())
    }

    async fn drop_login(&self, username: &str) -> StorageResult<()> {
        let mut catalog = self.catalog.lock();
        catalog.calls.push(AdminCall::DropLogin(username.to_string()));
        if Self::take_failure(&mut catalog, FailPoint::DropLogin) {
            return Err(injected("drop login"));
        }
        catalog.logins.remove(username);
        Ok(())
    }

    async fn list_databases(&self) -> StorageResult<Vec<String>> {
        Ok(self.databases())
    }
}
