//! Tenant connection resolution.
//!
//! Resolution is the authorization boundary for schema and data operations:
//! a database id only resolves for the owner that provisioned it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{PostgresConfig, PostgresSslMode};
use crate::control_plane::ControlPlaneStore;
use crate::error::{ConfigError, StorageError, StorageResult};
use crate::owner::OwnerId;
use crate::types::DbLogin;

/// Server-level connection settings shared by every tenant.
///
/// Holds no credentials, so the admin login cannot leak into a tenant
/// descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// TLS mode.
    pub ssl_mode: PostgresSslMode,
    /// Client encoding.
    pub client_encoding: String,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Statement timeout in milliseconds.
    pub statement_timeout_ms: u64,
}

impl From<&PostgresConfig> for ServerEndpoint {
    fn from(config: &PostgresConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            ssl_mode: config.ssl_mode,
            client_encoding: config.client_encoding.clone(),
            connect_timeout_secs: config.connect_timeout_secs,
            statement_timeout_ms: config.statement_timeout_ms,
        }
    }
}

/// Everything needed to open a connection to one tenant database.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Tenant database name.
    pub database: String,
    /// Tenant login.
    pub username: String,
    /// Tenant password.
    pub password: String,
    /// TLS mode.
    pub ssl_mode: PostgresSslMode,
    /// Client encoding.
    pub client_encoding: String,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Statement timeout in milliseconds.
    pub statement_timeout_ms: u64,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ssl_mode", &self.ssl_mode)
            .field("client_encoding", &self.client_encoding)
            .finish_non_exhaustive()
    }
}

impl ConnectionDescriptor {
    /// Scopes a server endpoint to one database and login.
    pub fn new(endpoint: &ServerEndpoint, database: impl Into<String>, login: &DbLogin) -> Self {
        Self {
            host: endpoint.host.clone(),
            port: endpoint.port,
            database: database.into(),
            username: login.username.clone(),
            password: login.password.clone(),
            ssl_mode: endpoint.ssl_mode,
            client_encoding: endpoint.client_encoding.clone(),
            connect_timeout: Duration::from_secs(endpoint.connect_timeout_secs),
            statement_timeout_ms: endpoint.statement_timeout_ms,
        }
    }

    /// A `postgres://` URL usable by libpq-compatible clients.
    ///
    /// Contains the password; never log it.
    pub fn to_connection_string(&self) -> String {
        let base = format!("postgres://{}:{}", self.host, self.port);
        match url::Url::parse(&base) {
            Ok(mut url) => {
                // Both setters only fail on cannot-be-a-base URLs.
                let _ = url.set_username(&self.username);
                let _ = url.set_password(Some(&self.password));
                url.set_path(&self.database);
                url.query_pairs_mut()
                    .append_pair("sslmode", self.ssl_mode.as_str())
                    .append_pair("client_encoding", &self.client_encoding);
                url.to_string()
            }
            Err(_) => format!(
                "postgres://{}:{}@{}:{}/{}?sslmode={}&client_encoding={}",
                self.username,
                self.password,
                self.host,
                self.port,
                self.database,
                self.ssl_mode.as_str(),
                self.client_encoding
            ),
        }
    }

    /// Driver configuration with connect and statement timeouts applied.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.username)
            .password(&self.password)
            .ssl_mode(self.ssl_mode.to_driver())
            .connect_timeout(self.connect_timeout)
            .options(&format!("-c statement_timeout={}", self.statement_timeout_ms))
            .application_name("dbforge-tenant");
        config
    }
}

/// Resolves `(owner, database id)` pairs to tenant connection descriptors.
#[derive(Clone)]
pub struct ConnectionResolver {
    store: Arc<dyn ControlPlaneStore>,
    endpoint: ServerEndpoint,
}

impl fmt::Debug for ConnectionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionResolver")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ConnectionResolver {
    /// Creates a resolver over a control-plane store.
    pub fn new(store: Arc<dyn ControlPlaneStore>, endpoint: ServerEndpoint) -> Self {
        Self { store, endpoint }
    }

    /// The shared server endpoint.
    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    /// Resolves a provisioned database of `owner`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not exist or belongs to another owner.
    /// `MissingLogin` when the owner's account has no stored login.
    pub async fn resolve(&self, owner: OwnerId, database_id: i64) -> StorageResult<ConnectionDescriptor> {
        let database = self
            .store
            .get_database(database_id)
            .await?
            .filter(|db| db.owner == owner)
            .ok_or_else(|| StorageError::not_found("database", database_id))?;

        let login = self
            .store
            .get_account(owner)
            .await?
            .and_then(|account| account.login)
            .ok_or(StorageError::Config(ConfigError::MissingLogin { owner }))?;

        tracing::debug!(owner = %owner, database = %database.database_name, "resolved tenant connection");
        Ok(ConnectionDescriptor::new(
            &self.endpoint,
            database.database_name,
            &login,
        ))
    }
}
