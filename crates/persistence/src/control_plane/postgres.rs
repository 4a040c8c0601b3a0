//! PostgreSQL-backed control plane.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Client, Pool};
use tokio_postgres::Row;

use crate::error::{BackendError, StorageError, StorageResult, TransactionError};
use crate::owner::OwnerId;
use crate::types::{DbLogin, ProvisionedDatabase, TenantAccount};

use super::{AccountTransaction, ControlPlaneStore};

fn pg_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "postgres".to_string(),
        message,
        source: None,
    })
}

const ACCOUNT_COLUMNS: &str =
    "owner_id, db_username, db_password, max_databases, database_count";

const DATABASE_COLUMNS: &str = "id, owner_id, database_name, created_at";

fn account_from_row(row: &Row) -> StorageResult<TenantAccount> {
    let username: Option<String> = row.try_get("db_username")?;
    let password: Option<String> = row.try_get("db_password")?;
    Ok(TenantAccount {
        owner: OwnerId::new(row.try_get("owner_id")?),
        login: match (username, password) {
            (Some(username), Some(password)) => Some(DbLogin { username, password }),
            _ => None,
        },
        max_databases: row.try_get("max_databases")?,
        database_count: row.try_get("database_count")?,
    })
}

fn database_from_row(row: &Row) -> StorageResult<ProvisionedDatabase> {
    Ok(ProvisionedDatabase {
        id: row.try_get("id")?,
        owner: OwnerId::new(row.try_get("owner_id")?),
        database_name: row.try_get("database_name")?,
        created_at: row.try_get::<_, DateTime<Utc>>("created_at")?,
    })
}

/// [`ControlPlaneStore`] on two PostgreSQL tables.
///
/// Account locks are `SELECT ... FOR UPDATE` row locks, so they also
/// serialize provisions handled by other server processes.
#[derive(Clone)]
pub struct PostgresControlPlane {
    pool: Pool,
}

impl std::fmt::Debug for PostgresControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresControlPlane")
            .field("pool_status", &self.pool.status())
            .finish()
    }
}

impl PostgresControlPlane {
    /// Creates a store on an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn get_client(&self) -> StorageResult<Client> {
        Ok(self.pool.get().await?)
    }

    /// Creates the control-plane tables if they do not exist.
    pub async fn init_schema(&self) -> StorageResult<()> {
        let client = self.get_client().await?;

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS tenant_accounts (
                    owner_id BIGINT PRIMARY KEY,
                    db_username TEXT,
                    db_password TEXT,
                    max_databases INTEGER NOT NULL DEFAULT 3,
                    database_count INTEGER NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )",
                &[],
            )
            .await
            .map_err(|e| pg_error(format!("Failed to create tenant_accounts table: {}", e)))?;

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS provisioned_databases (
                    id BIGSERIAL PRIMARY KEY,
                    owner_id BIGINT NOT NULL REFERENCES tenant_accounts (owner_id),
                    database_name TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    UNIQUE (owner_id, database_name)
                )",
                &[],
            )
            .await
            .map_err(|e| {
                pg_error(format!("Failed to create provisioned_databases table: {}", e))
            })?;

        tracing::debug!("control-plane schema ready");
        Ok(())
    }
}

#[async_trait]
impl ControlPlaneStore for PostgresControlPlane {
    async fn create_account(&self, account: TenantAccount) -> StorageResult<TenantAccount> {
        let client = self.get_client().await?;
        let (username, password) = match &account.login {
            Some(login) => (Some(login.username.as_str()), Some(login.password.as_str())),
            None => (None, None),
        };
        client
            .execute(
                "INSERT INTO tenant_accounts \
                 (owner_id, db_username, db_password, max_databases, database_count) \
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &account.owner.value(),
                    &username,
                    &password,
                    &account.max_databases,
                    &account.database_count,
                ],
            )
            .await?;
        Ok(account)
    }

    async fn get_account(&self, owner: OwnerId) -> StorageResult<Option<TenantAccount>> {
        let client = self.get_client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM tenant_accounts WHERE owner_id = $1"),
                &[&owner.value()],
            )
            .await?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn get_database(&self, id: i64) -> StorageResult<Option<ProvisionedDatabase>> {
        let client = self.get_client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {DATABASE_COLUMNS} FROM provisioned_databases WHERE id = $1"),
                &[&id],
            )
            .await?;
        row.as_ref().map(database_from_row).transpose()
    }

    async fn list_databases(&self, owner: OwnerId) -> StorageResult<Vec<ProvisionedDatabase>> {
        let client = self.get_client().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {DATABASE_COLUMNS} FROM provisioned_databases \
                     WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
                ),
                &[&owner.value()],
            )
            .await?;
        rows.iter().map(database_from_row).collect()
    }

    async fn lock_account(&self, owner: OwnerId) -> StorageResult<Box<dyn AccountTransaction>> {
        let client = self.get_client().await?;

        client.execute("BEGIN", &[]).await.map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Failed to begin transaction: {}", e),
            })
        })?;

        let mut tx = PostgresAccountTransaction {
            client: Some(client),
            account: TenantAccount::new(owner),
            active: true,
        };

        let row = tx
            .client()?
            .query_opt(
                &format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM tenant_accounts WHERE owner_id = $1 FOR UPDATE"
                ),
                &[&owner.value()],
            )
            .await?;

        match row {
            Some(row) => {
                tx.account = account_from_row(&row)?;
                Ok(Box::new(tx))
            }
            None => {
                Box::new(tx).rollback().await?;
                Err(StorageError::not_found("account", owner))
            }
        }
    }
}

/// A control-plane transaction holding the account row lock.
///
/// The pooled client is detached from the pool if the transaction is
/// dropped while active, so the open transaction dies with the connection.
struct PostgresAccountTransaction {
    client: Option<Client>,
    account: TenantAccount,
    active: bool,
}

impl PostgresAccountTransaction {
    fn client(&self) -> StorageResult<&Client> {
        if !self.active {
            return Err(TransactionError::InvalidTransaction.into());
        }
        self.client
            .as_ref()
            .ok_or(StorageError::Transaction(TransactionError::InvalidTransaction))
    }

    async fn finish(&mut self, statement: &str) -> StorageResult<()> {
        let client = self.client()?;
        let result = client.execute(statement, &[]).await;
        self.active = false;
        result.map(|_| ()).map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("{} failed: {}", statement, e),
            })
        })
    }
}

#[async_trait]
impl AccountTransaction for PostgresAccountTransaction {
    fn account(&self) -> &TenantAccount {
        &self.account
    }

    async fn insert_database(
        &mut self,
        database_name: &str,
        login: Option<&DbLogin>,
    ) -> StorageResult<ProvisionedDatabase> {
        let owner = self.account.owner;
        let client = self.client()?;

        let row = client
            .query_one(
                &format!(
                    "INSERT INTO provisioned_databases (owner_id, database_name) \
                     VALUES ($1, $2) RETURNING {DATABASE_COLUMNS}"
                ),
                &[&owner.value(), &database_name],
            )
            .await?;
        let record = database_from_row(&row)?;

        match login {
            Some(login) => {
                client
                    .execute(
                        "UPDATE tenant_accounts \
                         SET db_username = $2, db_password = $3, database_count = database_count + 1 \
                         WHERE owner_id = $1",
                        &[&owner.value(), &login.username, &login.password],
                    )
                    .await?;
            }
            None => {
                client
                    .execute(
                        "UPDATE tenant_accounts SET database_count = database_count + 1 \
                         WHERE owner_id = $1",
                        &[&owner.value()],
                    )
                    .await?;
            }
        }

        Ok(record)
    }

    async fn remove_database(&mut self, id: i64) -> StorageResult<bool> {
        let owner = self.account.owner;
        let client = self.client()?;

        let removed = client
            .execute(
                "DELETE FROM provisioned_databases WHERE id = $1 AND owner_id = $2",
                &[&id, &owner.value()],
            )
            .await?;
        if removed == 0 {
            return Ok(false);
        }

        client
            .execute(
                "UPDATE tenant_accounts SET database_count = GREATEST(database_count - 1, 0) \
                 WHERE owner_id = $1",
                &[&owner.value()],
            )
            .await?;
        Ok(true)
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.finish("ROLLBACK").await
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for PostgresAccountTransaction {
    fn drop(&mut self) {
        if self.active {
            tracing::warn!(
                owner = %self.account.owner,
                "control-plane transaction dropped without explicit commit or rollback"
            );
            if let Some(client) = self.client.take() {
                drop(deadpool_postgres::Object::take(client));
            }
        }
    }
}
