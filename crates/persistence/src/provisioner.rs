//! Tenant database provisioning and deprovisioning.
//!
//! Provisioning spans two systems that share no transaction: the control
//! plane (transactional) and the server catalog (DDL, auto-committed). The
//! account lock is held across both, and physical objects created by a
//! failed call are dropped again before the error is returned.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::admin::DatabaseAdmin;
use crate::config::ProvisioningConfig;
use crate::control_plane::{AccountTransaction, ControlPlaneStore};
use crate::error::{StorageError, StorageResult, TenantError};
use crate::owner::OwnerId;
use crate::resolver::{ConnectionDescriptor, ServerEndpoint};
use crate::types::{DbLogin, ProvisionedDatabase, ProvisionedLogin, TenantAccount};

/// Shortest generated password, in random bytes.
const MIN_PASSWORD_BYTES: usize = 16;

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// Reduces a preferred name to lowercase ASCII alphanumerics, truncated to
/// the configured length. Falls back to a generated name when nothing is
/// left.
///
/// ```
/// use dbforge_persistence::config::ProvisioningConfig;
/// use dbforge_persistence::provisioner::derive_database_name;
///
/// let config = ProvisioningConfig::default();
/// assert_eq!(derive_database_name(Some("My DB! 2024"), &config), "mydb2024");
/// assert!(derive_database_name(Some("!!!"), &config).starts_with("tenant"));
/// ```
pub fn derive_database_name(preferred: Option<&str>, config: &ProvisioningConfig) -> String {
    let name: String = preferred
        .unwrap_or_default()
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| is_name_char(*c))
        .take(config.name_length())
        .collect();

    if name.is_empty() {
        fallback_database_name(config)
    } else {
        name
    }
}

fn fallback_database_name(config: &ProvisioningConfig) -> String {
    let prefix: String = config
        .fallback_name_prefix
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| is_name_char(*c))
        .collect();
    let mut name = format!("{}{}", prefix, Uuid::new_v4().simple());
    name.truncate(config.name_length());
    name
}

/// Generates a fresh login: `u` plus random hex for the name, URL-safe
/// base64 of CSPRNG bytes for the password.
pub fn generate_login(config: &ProvisioningConfig) -> DbLogin {
    let hex = Uuid::new_v4().simple().to_string();
    let suffix_len = config.username_length.clamp(2, hex.len() + 1) - 1;
    let username = format!("u{}", &hex[..suffix_len]);

    let mut bytes = vec![0u8; config.password_bytes.max(MIN_PASSWORD_BYTES)];
    rand::rng().fill_bytes(&mut bytes);
    let password = URL_SAFE_NO_PAD.encode(&bytes);

    DbLogin::new(username, password)
}

/// Result of a successful provision.
#[derive(Debug, Clone)]
pub struct Provisioned {
    /// The new control-plane record.
    pub database: ProvisionedDatabase,
    /// Connection to the new database with the tenant login.
    pub descriptor: ConnectionDescriptor,
}

impl Provisioned {
    /// Credentials as returned to the owner.
    pub fn to_login(&self) -> ProvisionedLogin {
        ProvisionedLogin {
            database_name: self.database.database_name.clone(),
            username: self.descriptor.username.clone(),
            password: self.descriptor.password.clone(),
            connection_string: self.descriptor.to_connection_string(),
        }
    }
}

/// Physical objects created so far by one provision call.
#[derive(Debug, Default)]
struct CreatedObjects {
    login: Option<String>,
    database: Option<String>,
}

/// Creates and destroys tenant databases within each owner's quota.
pub struct TenantProvisioner {
    store: Arc<dyn ControlPlaneStore>,
    admin: Arc<dyn DatabaseAdmin>,
    endpoint: ServerEndpoint,
    config: ProvisioningConfig,
}

impl std::fmt::Debug for TenantProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantProvisioner")
            .field("endpoint", &self.endpoint)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TenantProvisioner {
    /// Creates a provisioner.
    pub fn new(
        store: Arc<dyn ControlPlaneStore>,
        admin: Arc<dyn DatabaseAdmin>,
        endpoint: ServerEndpoint,
        config: ProvisioningConfig,
    ) -> Self {
        Self {
            store,
            admin,
            endpoint,
            config,
        }
    }

    /// The provisioning settings.
    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    /// Creates a database for `owner`, and the owner's login if this is
    /// their first database.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the owner has no account and auto-registration is off.
    /// - `QuotaExceeded` if the owner already has `max_databases` databases.
    /// - `AlreadyExists` if the derived name is taken.
    /// - Engine errors from DDL or the control plane, after compensation.
    pub async fn provision(
        &self,
        owner: OwnerId,
        preferred_name: Option<&str>,
    ) -> StorageResult<Provisioned> {
        let mut tx = self.lock_or_register(owner).await?;
        let account = tx.account().clone();

        if account.quota_reached() {
            tx.rollback().await?;
            return Err(TenantError::QuotaExceeded {
                owner,
                current: account.database_count,
                max: account.max_databases,
            }
            .into());
        }

        let database_name = derive_database_name(preferred_name, &self.config);
        let (login, new_login) = match account.login {
            Some(login) => (login, false),
            None => (generate_login(&self.config), true),
        };
        debug!(owner = %owner, database = %database_name, new_login, "provisioning");

        let mut created = CreatedObjects::default();
        let physical = self
            .create_physical(&database_name, &login, new_login, &mut created)
            .await;
        let recorded = match physical {
            Ok(()) => {
                tx.insert_database(&database_name, new_login.then_some(&login))
                    .await
            }
            Err(e) => Err(e),
        };

        let database = match recorded {
            Ok(database) => database,
            Err(e) => {
                self.compensate(owner, &created).await;
                if let Err(rollback) = tx.rollback().await {
                    warn!(owner = %owner, error = %rollback, "control-plane rollback failed");
                }
                return Err(e);
            }
        };

        if let Err(e) = tx.commit().await {
            self.compensate(owner, &created).await;
            return Err(e);
        }

        info!(
            owner = %owner,
            database = %database.database_name,
            id = database.id,
            "provisioned tenant database"
        );

        let descriptor = ConnectionDescriptor::new(&self.endpoint, &database.database_name, &login);
        Ok(Provisioned {
            database,
            descriptor,
        })
    }

    /// Drops a database of `owner` and its control-plane record.
    ///
    /// Returns `false` if no such database is owned by `owner`. A failure
    /// after the physical drop is returned as an error; the record then
    /// outlives the database.
    pub async fn deprovision(&self, owner: OwnerId, id: i64) -> StorageResult<bool> {
        let Some(record) = self
            .store
            .get_database(id)
            .await?
            .filter(|db| db.owner == owner)
        else {
            return Ok(false);
        };

        let mut tx = self.store.lock_account(owner).await?;

        if let Err(e) = self.admin.drop_database(&record.database_name).await {
            if let Err(rollback) = tx.rollback().await {
                warn!(owner = %owner, error = %rollback, "control-plane rollback failed");
            }
            return Err(e);
        }

        let removed = match tx.remove_database(id).await {
            Ok(removed) => removed,
            Err(e) => {
                error!(
                    owner = %owner,
                    database = %record.database_name,
                    error = %e,
                    "database dropped but its record could not be removed"
                );
                if let Err(rollback) = tx.rollback().await {
                    warn!(owner = %owner, error = %rollback, "control-plane rollback failed");
                }
                return Err(e);
            }
        };

        if let Err(e) = tx.commit().await {
            error!(
                owner = %owner,
                database = %record.database_name,
                error = %e,
                "database dropped but its record could not be removed"
            );
            return Err(e);
        }

        if removed {
            info!(owner = %owner, database = %record.database_name, id, "deprovisioned tenant database");
        } else {
            warn!(owner = %owner, id, "database record was removed concurrently");
        }
        Ok(removed)
    }

    /// Databases of `owner`, newest first.
    pub async fn list(&self, owner: OwnerId) -> StorageResult<Vec<ProvisionedDatabase>> {
        self.store.list_databases(owner).await
    }

    /// One database of `owner`.
    pub async fn get(&self, owner: OwnerId, id: i64) -> StorageResult<ProvisionedDatabase> {
        self.store
            .get_database(id)
            .await?
            .filter(|db| db.owner == owner)
            .ok_or_else(|| StorageError::not_found("database", id))
    }

    async fn lock_or_register(&self, owner: OwnerId) -> StorageResult<Box<dyn AccountTransaction>> {
        match self.store.lock_account(owner).await {
            Err(e) if e.is_not_found() && self.config.auto_register_accounts => {
                let account =
                    TenantAccount::new(owner).with_max_databases(self.config.default_max_databases);
                match self.store.create_account(account).await {
                    Ok(_) => info!(owner = %owner, "registered tenant account"),
                    Err(e) if e.is_conflict() => {}
                    Err(e) => return Err(e),
                }
                self.store.lock_account(owner).await
            }
            other => other,
        }
    }

    async fn create_physical(
        &self,
        database_name: &str,
        login: &DbLogin,
        new_login: bool,
        created: &mut CreatedObjects,
    ) -> StorageResult<()> {
        if new_login {
            self.admin
                .create_login(&login.username, &login.password)
                .await?;
            created.login = Some(login.username.clone());
        }

        self.admin
            .create_database(database_name, &login.username)
            .await?;
        created.database = Some(database_name.to_string());

        self.admin
            .grant_all(database_name, &login.username)
            .await
    }

    /// Best-effort drop of objects created by a failed call. Failures are
    /// logged and leave an untracked object behind.
    async fn compensate(&self, owner: OwnerId, created: &CreatedObjects) {
        if let Some(database) = &created.database {
            match self.admin.drop_database(database).await {
                Ok(()) => debug!(owner = %owner, database = %database, "dropped database after failure"),
                Err(e) => error!(
                    owner = %owner,
                    database = %database,
                    error = %e,
                    "failed to drop database after failed provision; orphaned"
                ),
            }
        }
        if let Some(username) = &created.login {
            match self.admin.drop_login(username).await {
                Ok(()) => debug!(owner = %owner, login = %username, "dropped login after failure"),
                Err(e) => error!(
                    owner = %owner,
                    login = %username,
                    error = %e,
                    "failed to drop login after failed provision; orphaned"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_strips_to_lowercase_alphanumeric() {
        let config = ProvisioningConfig::default();
        assert_eq!(derive_database_name(Some("My DB! 2024"), &config), "mydb2024");
        assert_eq!(derive_database_name(Some("shop_v2"), &config), "shopv2");
        assert_eq!(derive_database_name(Some("Ünïcode"), &config), "ncode");
    }

    #[test]
    fn test_derive_truncates() {
        let config = ProvisioningConfig::default();
        let long = "a".repeat(100);
        assert_eq!(derive_database_name(Some(&long), &config).len(), 48);
    }

    #[test]
    fn test_derive_falls_back() {
        let config = ProvisioningConfig::default();
        for input in [None, Some(""), Some("!!! ---"), Some("日本")] {
            let name = derive_database_name(input, &config);
            assert!(name.starts_with("tenant"));
            assert_eq!(name.len(), 38);
            assert!(name.chars().all(is_name_char));
        }
        assert_ne!(
            derive_database_name(None, &config),
            derive_database_name(None, &config)
        );
    }

    #[test]
    fn test_fallback_respects_short_limit() {
        let config = ProvisioningConfig {
            max_name_length: 10,
            ..Default::default()
        };
        assert_eq!(derive_database_name(None, &config).len(), 10);
    }

    #[test]
    fn test_oversized_name_limit_is_capped() {
        let config = ProvisioningConfig {
            max_name_length: 64,
            fallback_name_prefix: "tenantdatabasefallback".to_string(),
            ..Default::default()
        };
        let long = "b".repeat(100);
        assert_eq!(derive_database_name(Some(&long), &config).len(), 48);
        assert_eq!(derive_database_name(None, &config).len(), 48);
    }

    #[test]
    fn test_generated_login_shape() {
        let config = ProvisioningConfig::default();
        let login = generate_login(&config);
        assert_eq!(login.username.len(), 12);
        assert!(login.username.starts_with('u'));
        assert!(login.username.chars().all(is_name_char));
        assert_eq!(login.password.len(), 32);
        assert!(
            login
                .password
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(login.password, generate_login(&config).password);
    }

    #[test]
    fn test_password_has_minimum_entropy() {
        let config = ProvisioningConfig {
            password_bytes: 4,
            ..Default::default()
        };
        assert!(generate_login(&config).password.len() >= 21);
    }
}
