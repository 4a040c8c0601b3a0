//! Application state for the dbforge HTTP API.
//!
//! Holds the core services every handler needs: the provisioner, the schema
//! manager, the data access engine, the admin connection (for readiness) and
//! the server configuration.

use std::sync::Arc;

use dbforge_persistence::admin::DatabaseAdmin;
use dbforge_persistence::connector::TenantConnector;
use dbforge_persistence::control_plane::ControlPlaneStore;
use dbforge_persistence::data::DataAccessEngine;
use dbforge_persistence::provisioner::TenantProvisioner;
use dbforge_persistence::resolver::{ConnectionResolver, ServerEndpoint};
use dbforge_persistence::schema::SchemaManager;

use crate::config::ServerConfig;

/// Shared application state for the HTTP API.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use dbforge_rest::{AppState, ServerConfig};
/// use dbforge_persistence::InMemoryControlPlane;
///
/// let state = AppState::new(
///     Arc::new(InMemoryControlPlane::new()),
///     admin,
///     endpoint,
///     ServerConfig::default(),
/// );
/// ```
#[derive(Clone)]
pub struct AppState {
    provisioner: Arc<TenantProvisioner>,
    schema: Arc<SchemaManager>,
    data: Arc<DataAccessEngine>,
    admin: Arc<dyn DatabaseAdmin>,
    config: Arc<ServerConfig>,
}

impl AppState {
    /// Wires the core services around a control-plane store and an admin
    /// connection.
    ///
    /// # Arguments
    ///
    /// * `store` - Account and database records
    /// * `admin` - Privileged connection used only for provisioning
    /// * `endpoint` - Address tenant logins connect to
    /// * `config` - Server configuration
    pub fn new(
        store: Arc<dyn ControlPlaneStore>,
        admin: Arc<dyn DatabaseAdmin>,
        endpoint: ServerEndpoint,
        config: ServerConfig,
    ) -> Self {
        let provisioner = TenantProvisioner::new(
            store.clone(),
            admin.clone(),
            endpoint.clone(),
            config.provisioning(),
        );
        let resolver = ConnectionResolver::new(store, endpoint);

        Self {
            provisioner: Arc::new(provisioner),
            schema: Arc::new(SchemaManager::new(resolver.clone(), TenantConnector::new())),
            data: Arc::new(DataAccessEngine::new(resolver, TenantConnector::new())),
            admin,
            config: Arc::new(config),
        }
    }

    /// Returns the tenant provisioner.
    pub fn provisioner(&self) -> &TenantProvisioner {
        &self.provisioner
    }

    /// Returns the schema manager.
    pub fn schema(&self) -> &SchemaManager {
        &self.schema
    }

    /// Returns the data access engine.
    pub fn data(&self) -> &DataAccessEngine {
        &self.data
    }

    /// Returns the admin connection.
    pub fn admin(&self) -> &dyn DatabaseAdmin {
        self.admin.as_ref()
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the default page size.
    pub fn default_page_size(&self) -> i64 {
        self.config.default_page_size
    }

    /// Returns the maximum page size.
    pub fn max_page_size(&self) -> i64 {
        self.config.max_page_size
    }
}
