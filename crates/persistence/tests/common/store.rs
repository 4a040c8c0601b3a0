//! A [`ControlPlaneStore`] wrapper whose transactions can be told to fail.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use dbforge_persistence::control_plane::{
    AccountTransaction, ControlPlaneStore, InMemoryControlPlane,
};
use dbforge_persistence::error::{StorageResult, TransactionError};
use dbforge_persistence::owner::OwnerId;
use dbforge_persistence::types::{DbLogin, ProvisionedDatabase, TenantAccount};

/// Which transaction step should fail next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailPoint {
    RemoveDatabase,
    Commit,
}

fn injected(point: StoreFailPoint) -> TransactionError {
    TransactionError::RolledBack {
        reason: format!("injected {:?} failure", point),
    }
}

#[derive(Debug, Clone, Default)]
struct Faults(Arc<Mutex<Vec<StoreFailPoint>>>);

impl Faults {
    fn take(&self, point: StoreFailPoint) -> bool {
        let mut pending = self.0.lock();
        match pending.iter().position(|p| *p == point) {
            Some(i) => {
                pending.remove(i);
                true
            }
            None => false,
        }
    }
}

/// In-memory control plane with failure injection on transactions.
#[derive(Debug, Clone, Default)]
pub struct FaultyStore {
    inner: InMemoryControlPlane,
    faults: Faults,
}

impl FaultyStore {
    pub fn new(inner: InMemoryControlPlane) -> Self {
        Self {
            inner,
            faults: Faults::default(),
        }
    }

    /// Makes the next transaction step `point` fail. Stacks with earlier calls.
    pub fn fail_on(&self, point: StoreFailPoint) {
        self.faults.0.lock().push(point);
    }
}

#[async_trait]
impl ControlPlaneStore for FaultyStore {
    async fn create_account(&self, account: TenantAccount) -> StorageResult<TenantAccount> {
        self.inner.create_account(account).await
    }

    async fn get_account(&self, owner: OwnerId) -> StorageResult<Option<TenantAccount>> {
        self.inner.get_account(owner).await
    }

    async fn get_database(&self, id: i64) -> StorageResult<Option<ProvisionedDatabase>> {
        self.inner.get_database(id).await
    }

    async fn list_databases(&self, owner: OwnerId) -> StorageResult<Vec<ProvisionedDatabase>> {
        self.inner.list_databases(owner).await
    }

    async fn lock_account(&self, owner: OwnerId) -> StorageResult<Box<dyn AccountTransaction>> {
        let inner = self.inner.lock_account(owner).await?;
        Ok(Box::new(FaultyTransaction {
            inner,
            faults: self.faults.clone(),
        }))
    }
}

struct FaultyTransaction {
    inner: Box<dyn AccountTransaction>,
    faults: Faults,
}

#[async_trait]
impl AccountTransaction for FaultyTransaction {
    fn account(&self) -> &TenantAccount {
        self.inner.account()
    }

    async fn insert_database(
        &mut self,
        database_name: &str,
        login: Option<&DbLogin>,
    ) -> StorageResult<ProvisionedDatabase> {
        self.inner.insert_database(database_name, login).await
    }

    async fn remove_database(&mut self, id: i64) -> StorageResult<bool> {
        if self.faults.take(StoreFailPoint::RemoveDatabase) {
            return Err(injected(StoreFailPoint::RemoveDatabase).into());
        }
        self.inner.remove_database(id).await
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        if self.faults.take(StoreFailPoint::Commit) {
            self.inner.rollback().await?;
            return Err(injected(StoreFailPoint::Commit).into());
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        self.inner.rollback().await
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }
}
