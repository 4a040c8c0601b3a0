//! Provisioner wiring over the in-memory store and recording admin.

use std::sync::Arc;

use dbforge_persistence::config::{PostgresConfig, ProvisioningConfig};
use dbforge_persistence::control_plane::{ControlPlaneStore, InMemoryControlPlane};
use dbforge_persistence::owner::OwnerId;
use dbforge_persistence::provisioner::TenantProvisioner;
use dbforge_persistence::resolver::ServerEndpoint;
use dbforge_persistence::types::TenantAccount;

use super::admin::RecordingAdmin;
use super::store::FaultyStore;

/// A provisioner plus handles on its collaborators.
pub struct Harness {
    pub store: InMemoryControlPlane,
    /// The store as the provisioner sees it, for injecting transaction failures.
    pub faults: FaultyStore,
    pub admin: RecordingAdmin,
    pub provisioner: Arc<TenantProvisioner>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ProvisioningConfig::default())
    }

    pub fn with_config(config: ProvisioningConfig) -> Self {
        let store = InMemoryControlPlane::new();
        let faults = FaultyStore::new(store.clone());
        let admin = RecordingAdmin::new();
        let provisioner = TenantProvisioner::new(
            Arc::new(faults.clone()),
            Arc::new(admin.clone()),
            ServerEndpoint::from(&PostgresConfig::default()),
            config,
        );
        Self {
            store,
            faults,
            admin,
            provisioner: Arc::new(provisioner),
        }
    }

    /// Registers an account with the given quota.
    pub async fn register(&self, owner: i64, max_databases: i32) -> OwnerId {
        let owner = OwnerId::new(owner);
        self.store
            .create_account(TenantAccount::new(owner).with_max_databases(max_databases))
            .await
            .expect("account registration failed");
        owner
    }

    pub async fn account(&self, owner: OwnerId) -> TenantAccount {
        self.store
            .get_account(owner)
            .await
            .unwrap()
            .expect("account missing")
    }
}
