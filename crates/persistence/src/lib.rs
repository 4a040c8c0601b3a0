//! dbforge persistence layer
//!
//! This crate is the core of a multi-tenant database service: owners
//! provision isolated PostgreSQL databases inside a shared server and then
//! manage tables and rows in them through a generic, injection-safe API.
//!
//! # Architecture
//!
//! - [`sql`] - Identifier quoting, typed value binding and statement builders
//! - [`control_plane`] - Durable account and database records, with per-account locking
//! - [`admin`] - Privileged DDL (logins, databases) on the admin connection
//! - [`provisioner`] - Provisioning and deprovisioning with quota and compensation
//! - [`resolver`] / [`connector`] - Tenant-scoped connections
//! - [`schema`] - Table and column DDL
//! - [`data`] - Parameterized row CRUD
//!
//! # Owner isolation
//!
//! Every operation takes the [`OwnerId`](owner::OwnerId) explicitly. A
//! database id only resolves for the owner that provisioned it, and schema
//! and data operations always connect with that owner's own login, never
//! the admin login.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dbforge_persistence::admin::PostgresAdmin;
//! use dbforge_persistence::config::{PostgresConfig, ProvisioningConfig};
//! use dbforge_persistence::control_plane::{ControlPlaneStore, PostgresControlPlane};
//! use dbforge_persistence::owner::OwnerId;
//! use dbforge_persistence::provisioner::TenantProvisioner;
//! use dbforge_persistence::resolver::ServerEndpoint;
//! use dbforge_persistence::types::TenantAccount;
//!
//! # async fn example() -> dbforge_persistence::StorageResult<()> {
//! let config = PostgresConfig::from_connection_string("postgres://admin:pw@localhost/postgres")?;
//! let store = PostgresControlPlane::new(config.create_pool()?);
//! store.init_schema().await?;
//! store.create_account(TenantAccount::new(OwnerId::new(1))).await?;
//!
//! let provisioner = TenantProvisioner::new(
//!     Arc::new(store),
//!     Arc::new(PostgresAdmin::connect(&config)?),
//!     ServerEndpoint::from(&config),
//!     ProvisioningConfig::default(),
//! );
//! let provisioned = provisioner.provision(OwnerId::new(1), Some("My Shop")).await?;
//! assert_eq!(provisioned.database.database_name, "myshop");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod admin;
pub mod config;
pub mod connector;
pub mod control_plane;
pub mod data;
pub mod error;
pub mod owner;
pub mod provisioner;
pub mod resolver;
pub mod schema;
pub mod sql;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult};
pub use owner::OwnerId;
pub use types::{ColumnSpec, TableSpec, TenantAccount};

pub use admin::{DatabaseAdmin, PostgresAdmin};
pub use connector::TenantConnector;
pub use control_plane::{
    AccountTransaction, ControlPlaneStore, InMemoryControlPlane, PostgresControlPlane,
};
pub use data::DataAccessEngine;
pub use provisioner::TenantProvisioner;
pub use resolver::{ConnectionDescriptor, ConnectionResolver, ServerEndpoint};
pub use schema::SchemaManager;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
