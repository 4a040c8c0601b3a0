//! Durable bookkeeping of tenant accounts and their databases.
//!
//! The provisioner never reads and then writes an account outside an
//! [`AccountTransaction`]: the transaction holds the account exclusively
//! from [`ControlPlaneStore::lock_account`] until commit or rollback, so two
//! provisions from one owner cannot both pass the quota check.

mod memory;
mod postgres;

pub use memory::InMemoryControlPlane;
pub use postgres::PostgresControlPlane;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::owner::OwnerId;
use crate::types::{DbLogin, ProvisionedDatabase, TenantAccount};

/// Store for [`TenantAccount`] and [`ProvisionedDatabase`] records.
#[async_trait]
pub trait ControlPlaneStore: Send + Sync {
    /// Registers a new account.
    ///
    /// Fails with `AlreadyExists` if the owner already has one.
    async fn create_account(&self, account: TenantAccount) -> StorageResult<TenantAccount>;

    /// Reads an account without locking it.
    async fn get_account(&self, owner: OwnerId) -> StorageResult<Option<TenantAccount>>;

    /// Reads a database record by id, whoever owns it.
    async fn get_database(&self, id: i64) -> StorageResult<Option<ProvisionedDatabase>>;

    /// All databases of an owner, newest first.
    async fn list_databases(&self, owner: OwnerId) -> StorageResult<Vec<ProvisionedDatabase>>;

    /// Opens a transaction that holds the owner's account exclusively.
    ///
    /// Waits while another transaction holds the same account. Fails with
    /// `NotFound` if the owner has no account.
    async fn lock_account(&self, owner: OwnerId) -> StorageResult<Box<dyn AccountTransaction>>;
}

/// An open control-plane transaction scoped to one account.
///
/// Changes become visible to other readers only on [`commit`](Self::commit).
/// Dropping an active transaction discards its changes.
#[async_trait]
pub trait AccountTransaction: Send {
    /// The account as it was when the lock was taken.
    fn account(&self) -> &TenantAccount;

    /// Records a new database, stores `login` on the account when given and
    /// increments the database count.
    ///
    /// Fails with `AlreadyExists` if the owner already has a database with
    /// this name.
    async fn insert_database(
        &mut self,
        database_name: &str,
        login: Option<&DbLogin>,
    ) -> StorageResult<ProvisionedDatabase>;

    /// Removes a database record of this owner and decrements the count,
    /// never below zero. Returns `false` if no such record exists.
    async fn remove_database(&mut self, id: i64) -> StorageResult<bool>;

    /// Commits and releases the account.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Discards all changes and releases the account.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;

    /// Returns `true` until commit or rollback.
    fn is_active(&self) -> bool;
}
