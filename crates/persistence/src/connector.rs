//! Short-lived tenant connections.

use tokio_postgres::{Client, NoTls};

use crate::error::{BackendError, StorageError, StorageResult};
use crate::resolver::ConnectionDescriptor;

/// Opens one connection per operation with the tenant's own login.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantConnector;

impl TenantConnector {
    /// Creates a connector.
    pub fn new() -> Self {
        Self
    }

    /// Connects to the descriptor's database.
    ///
    /// Every failure here, including rejected credentials, is reported as
    /// `ConnectionFailed`.
    pub async fn connect(&self, descriptor: &ConnectionDescriptor) -> StorageResult<TenantConnection> {
        let (client, connection) = descriptor
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| {
                StorageError::Backend(BackendError::ConnectionFailed {
                    backend_name: format!("tenant database {}", descriptor.database),
                    message: e.to_string(),
                })
            })?;

        let database = descriptor.database.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(database = %database, error = %e, "tenant connection closed with error");
            }
        });

        Ok(TenantConnection {
            client,
            database: descriptor.database.clone(),
        })
    }
}

/// An open tenant connection, closed when dropped.
///
/// Dropping the client ends the spawned driver task.
pub struct TenantConnection {
    client: Client,
    database: String,
}

impl std::fmt::Debug for TenantConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConnection")
            .field("database", &self.database)
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

impl TenantConnection {
    /// The driver client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The connected database.
    pub fn database(&self) -> &str {
        &self.database
    }
}
