//! In-process control plane for tests and single-node development.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::OwnedMutexGuard;

use crate::error::{ResourceError, StorageError, StorageResult, TransactionError};
use crate::owner::OwnerId;
use crate::types::{DbLogin, ProvisionedDatabase, TenantAccount};

use super::{AccountTransaction, ControlPlaneStore};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<OwnerId, TenantAccount>,
    databases: BTreeMap<i64, ProvisionedDatabase>,
}

/// [`ControlPlaneStore`] kept in memory.
///
/// Account locks are per-owner async mutexes, so a waiting provision yields
/// its task instead of blocking a worker thread. The lock map keeps one entry
/// per owner ever locked and is never pruned, which bounds this store to
/// tests and development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryControlPlane {
    state: Arc<RwLock<State>>,
    locks: Arc<Mutex<HashMap<OwnerId, Arc<tokio::sync::Mutex<()>>>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryControlPlane {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn account_lock(&self, owner: OwnerId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock().entry(owner).or_default().clone()
    }

    /// Number of database records across all owners.
    pub fn database_count(&self) -> usize {
        self.state.read().databases.len()
    }
}

fn newest_first(a: &ProvisionedDatabase, b: &ProvisionedDatabase) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

#[async_trait]
impl ControlPlaneStore for InMemoryControlPlane {
    async fn create_account(&self, account: TenantAccount) -> StorageResult<TenantAccount> {
        let mut state = self.state.write();
        if state.accounts.contains_key(&account.owner) {
            return Err(ResourceError::AlreadyExists {
                resource_type: "account".to_string(),
                id: account.owner.to_string(),
            }
            .into());
        }
        state.accounts.insert(account.owner, account.clone());
        Ok(account)
    }

    async fn get_account(&self, owner: OwnerId) -> StorageResult<Option<TenantAccount>> {
        Ok(self.state.read().accounts.get(&owner).cloned())
    }

    async fn get_database(&self, id: i64) -> StorageResult<Option<ProvisionedDatabase>> {
        Ok(self.state.read().databases.get(&id).cloned())
    }

    async fn list_databases(&self, owner: OwnerId) -> StorageResult<Vec<ProvisionedDatabase>> {
        let mut databases: Vec<_> = self
            .state
            .read()
            .databases
            .values()
            .filter(|db| db.owner == owner)
            .cloned()
            .collect();
        databases.sort_by(newest_first);
        Ok(databases)
    }

    async fn lock_account(&self, owner: OwnerId) -> StorageResult<Box<dyn AccountTransaction>> {
        let guard = self.account_lock(owner).lock_owned().await;

        let account = self
            .state
            .read()
            .accounts
            .get(&owner)
            .cloned()
            .ok_or_else(|| StorageError::not_found("account", owner))?;

        Ok(Box::new(InMemoryAccountTransaction {
            store: self.clone(),
            account,
            inserted: Vec::new(),
            removed: Vec::new(),
            login: None,
            active: true,
            _guard: guard,
        }))
    }
}

/// Buffered changes applied atomically on commit.
struct InMemoryAccountTransaction {
    store: InMemoryControlPlane,
    account: TenantAccount,
    inserted: Vec<ProvisionedDatabase>,
    removed: Vec<i64>,
    login: Option<DbLogin>,
    active: bool,
    _guard: OwnedMutexGuard<()>,
}

impl InMemoryAccountTransaction {
    fn ensure_active(&self) -> StorageResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(TransactionError::InvalidTransaction.into())
        }
    }

    /// Net count after the buffered inserts and removals.
    fn pending_count(&self) -> i32 {
        let delta = self.inserted.len() as i32 - self.removed.len() as i32;
        (self.account.database_count + delta).max(0)
    }
}

#[async_trait]
impl AccountTransaction for InMemoryAccountTransaction {
    fn account(&self) -> &TenantAccount {
        &self.account
    }

    async fn insert_database(
        &mut self,
        database_name: &str,
        login: Option<&DbLogin>,
    ) -> StorageResult<ProvisionedDatabase> {
        self.ensure_active()?;

        let owner = self.account.owner;
        let taken = {
            let state = self.store.state.read();
            state.databases.values().any(|db| {
                db.owner == owner
                    && db.database_name == database_name
                    && !self.removed.contains(&db.id)
            })
        } || self
            .inserted
            .iter()
            .any(|db| db.database_name == database_name);
        if taken {
            return Err(ResourceError::AlreadyExists {
                resource_type: "database".to_string(),
                id: database_name.to_string(),
            }
            .into());
        }

        let record = ProvisionedDatabase {
            id: self.store.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            owner,
            database_name: database_name.to_string(),
            created_at: Utc::now(),
        };
        self.inserted.push(record.clone());
        if let Some(login) = login {
            self.login = Some(login.clone());
        }
        Ok(record)
    }

    async fn remove_database(&mut self, id: i64) -> StorageResult<bool> {
        self.ensure_active()?;

        if let Some(pos) = self.inserted.iter().position(|db| db.id == id) {
            self.inserted.remove(pos);
            return Ok(true);
        }

        let exists = self
            .store
            .state
            .read()
            .databases
            .get(&id)
            .is_some_and(|db| db.owner == self.account.owner);
        if !exists || self.removed.contains(&id) {
            return Ok(false);
        }
        self.removed.push(id);
        Ok(true)
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.ensure_active()?;

        let count = self.pending_count();
        let mut state = self.store.state.write();
        for id in &self.removed {
            state.databases.remove(id);
        }
        for record in self.inserted.drain(..) {
            state.databases.insert(record.id, record);
        }
        if let Some(account) = state.accounts.get_mut(&self.account.owner) {
            account.database_count = count;
            if let Some(login) = self.login.take() {
                account.login = Some(login);
            }
        }
        drop(state);

        self.active = false;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.ensure_active()?;
        self.active = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for InMemoryAccountTransaction {
    fn drop(&mut self) {
        if self.active {
            tracing::warn!(
                owner = %self.account.owner,
                "control-plane transaction dropped without explicit commit or rollback"
            );
        }
    }
}
