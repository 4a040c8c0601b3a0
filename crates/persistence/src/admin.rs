//! Privileged DDL over the admin connection.
//!
//! This is the only code that runs with the admin login. Tenant-facing
//! schema and data operations never receive it.

use async_trait::async_trait;
use deadpool_postgres::{Client, Pool};

use crate::config::{PostgresConfig, ProvisioningConfig};
use crate::error::{StorageError, StorageResult};
use crate::sql::{QuotedIdent, ddl};

/// Creates and drops tenant logins and databases.
#[async_trait]
pub trait DatabaseAdmin: Send + Sync {
    /// Creates a login role with a password.
    async fn create_login(&self, username: &str, password: &str) -> StorageResult<()>;

    /// Creates a database owned by `owner`.
    async fn create_database(&self, database: &str, owner: &str) -> StorageResult<()>;

    /// Grants every database privilege to `username` and revokes the
    /// defaults granted to PUBLIC, so no other login can connect.
    async fn grant_all(&self, database: &str, username: &str) -> StorageResult<()>;

    /// Ends open sessions on the database and drops it if it exists.
    async fn drop_database(&self, database: &str) -> StorageResult<()>;

    /// Drops a login role if it exists.
    async fn drop_login(&self, username: &str) -> StorageResult<()>;

    /// Names of all non-template databases on the server.
    ///
    /// Diffing this against the control plane finds databases left behind
    /// by a failed compensation.
    async fn list_databases(&self) -> StorageResult<Vec<String>>;
}

/// [`DatabaseAdmin`] on a pool of admin connections.
#[derive(Clone)]
pub struct PostgresAdmin {
    pool: Pool,
    encoding: String,
    locale: Option<String>,
}

impl std::fmt::Debug for PostgresAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdmin")
            .field("encoding", &self.encoding)
            .field("locale", &self.locale)
            .field("pool_status", &self.pool.status())
            .finish()
    }
}

impl PostgresAdmin {
    /// Wraps an admin pool. New databases use UTF8 and the server locale.
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            encoding: "UTF8".to_string(),
            locale: None,
        }
    }

    /// Builds the admin pool from its connection template.
    pub fn connect(config: &PostgresConfig) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self::new(config.create_pool()?))
    }

    /// Sets the encoding of new databases.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Sets the collation and character classification of new databases.
    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }

    /// Applies the encoding and locale of [`ProvisioningConfig`].
    pub fn with_provisioning(self, config: &ProvisioningConfig) -> Self {
        self.with_encoding(config.database_encoding.clone())
            .with_locale(config.database_locale.clone())
    }

    fn create_database_sql(&self, database: &str, owner: &str) -> String {
        ddl::create_database(
            &QuotedIdent::new(database),
            &QuotedIdent::new(owner),
            &self.encoding,
            self.locale.as_deref(),
        )
    }

    async fn get_client(&self) -> StorageResult<Client> {
        Ok(self.pool.get().await?)
    }

    /// Executes one DDL statement. Only the leading keywords are logged
    /// since role statements carry a password.
    async fn run(&self, sql: String) -> StorageResult<()> {
        let verb: Vec<&str> = sql.split_whitespace().take(2).collect();
        tracing::debug!(statement = %verb.join(" "), "admin ddl");
        let client = self.get_client().await?;
        client.batch_execute(&sql).await?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseAdmin for PostgresAdmin {
    async fn create_login(&self, username: &str, password: &str) -> StorageResult<()> {
        self.run(ddl::create_role(&QuotedIdent::new(username), password))
            .await
    }

    async fn create_database(&self, database: &str, owner: &str) -> StorageResult<()> {
        self.run(self.create_database_sql(database, owner)).await
    }

    async fn grant_all(&self, database: &str, username: &str) -> StorageResult<()> {
        let database = QuotedIdent::new(database);
        self.run(ddl::grant_all(&database, &QuotedIdent::new(username)))
            .await?;
        self.run(ddl::revoke_public(&database)).await
    }

    async fn drop_database(&self, database: &str) -> StorageResult<()> {
        let client = self.get_client().await?;
        let terminated = client
            .query(ddl::TERMINATE_BACKENDS, &[&database])
            .await?
            .len();
        if terminated > 0 {
            tracing::debug!(database = %database, sessions = terminated, "terminated sessions");
        }
        client
            .batch_execute(&ddl::drop_database(&QuotedIdent::new(database)))
            .await?;
        Ok(())
    }

    async fn drop_login(&self, username: &str) -> StorageResult<()> {
        self.run(ddl::drop_role(&QuotedIdent::new(username))).await
    }

    async fn list_databases(&self) -> StorageResult<Vec<String>> {
        let client = self.get_client().await?;
        let rows = client
            .query(
                "SELECT datname::text FROM pg_database WHERE NOT datistemplate ORDER BY datname",
                &[],
            )
            .await?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(StorageError::from))
            .collect()
    }
}
