//! Core record and request types.
//!
//! [`TenantAccount`] and [`ProvisionedDatabase`] are the two durable
//! control-plane records. [`TableSpec`] and [`ColumnSpec`] are transient
//! request shapes for DDL; the physical schema only lives in the tenant
//! database. The remaining types are read models recomputed on demand.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::owner::OwnerId;

/// Default number of databases an owner may hold.
pub const DEFAULT_MAX_DATABASES: i32 = 3;

/// A database login shared by every database of one tenant.
///
/// Revoking this login cuts the owner off from all of their databases at once.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbLogin {
    /// Role name on the database server.
    pub username: String,
    /// Plain-text password, returned to the owner on provisioning.
    pub password: String,
}

impl DbLogin {
    /// Creates a login from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for DbLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbLogin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Control-plane record of one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantAccount {
    /// The owner this account belongs to.
    pub owner: OwnerId,
    /// Shared login, set on first successful provision.
    pub login: Option<DbLogin>,
    /// Maximum number of databases.
    pub max_databases: i32,
    /// Number of databases currently owned.
    pub database_count: i32,
}

impl TenantAccount {
    /// Creates an account with no login and no databases.
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            login: None,
            max_databases: DEFAULT_MAX_DATABASES,
            database_count: 0,
        }
    }

    /// Sets the quota.
    pub fn with_max_databases(mut self, max: i32) -> Self {
        self.max_databases = max;
        self
    }

    /// Returns `true` if another database would exceed the quota.
    pub fn quota_reached(&self) -> bool {
        self.database_count >= self.max_databases
    }
}

/// Control-plane record of one physical tenant database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedDatabase {
    /// Store-assigned identifier.
    pub id: i64,
    /// Owning account.
    pub owner: OwnerId,
    /// Physical database name (lowercase alphanumeric).
    pub database_name: String,
    /// When the database was provisioned.
    pub created_at: DateTime<Utc>,
}

/// Public view of a [`ProvisionedDatabase`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    /// Identifier used in `/provision/{id}` and `/databases/{id}` routes.
    pub id: i64,
    /// Physical database name.
    pub database_name: String,
    /// When the database was provisioned.
    pub created_at: DateTime<Utc>,
}

impl From<&ProvisionedDatabase> for DatabaseInfo {
    fn from(record: &ProvisionedDatabase) -> Self {
        Self {
            id: record.id,
            database_name: record.database_name.clone(),
            created_at: record.created_at,
        }
    }
}

/// Credentials handed back to the owner after a successful provision.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedLogin {
    /// Physical database name.
    pub database_name: String,
    /// Tenant login, shared by all of the owner's databases.
    pub username: String,
    /// Password of the tenant login.
    pub password: String,
    /// `postgres://` URL for the new database.
    pub connection_string: String,
}

impl fmt::Debug for ProvisionedLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionedLogin")
            .field("database_name", &self.database_name)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// One column in a [`TableSpec`] or an add/modify column request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    /// Column name; escaped before use.
    pub name: String,
    /// Engine type, embedded verbatim (e.g. `VARCHAR(64)`).
    pub data_type: String,
    /// Whether NULL is allowed.
    #[serde(default)]
    pub is_nullable: bool,
    /// Part of the table's primary key.
    #[serde(default)]
    pub is_primary_key: bool,
    /// Generated identity column.
    #[serde(default)]
    pub is_auto_increment: bool,
    /// Default value literal, embedded verbatim.
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ColumnSpec {
    /// Creates a NOT NULL column with no flags.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: false,
            is_primary_key: false,
            is_auto_increment: false,
            default_value: None,
        }
    }

    /// Allows NULL values.
    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// Marks the column as part of the primary key.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Marks the column as auto-incrementing.
    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    /// Sets the default value literal.
    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default_value = Some(literal.into());
        self
    }

    /// The default literal, ignoring blank values.
    pub fn default_literal(&self) -> Option<&str> {
        self.default_value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A table definition for `create_table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    /// Table name; escaped before use.
    pub table_name: String,
    /// Ordered columns; at least one is required.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Creates a table definition.
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
        }
    }
}

/// A table and its current row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    /// Table name as stored in the catalog.
    pub table_name: String,
    /// Rows at the time of listing.
    pub row_count: i64,
}

/// Column metadata read from `information_schema`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name.
    pub column_name: String,
    /// `information_schema` type name, e.g. `character varying`.
    pub data_type: String,
    /// Whether NULL is allowed.
    pub is_nullable: bool,
    /// Part of the primary key.
    pub is_primary_key: bool,
    /// Identity column.
    pub is_auto_increment: bool,
    /// Default expression, as the server prints it.
    pub default_value: Option<String>,
    /// Character length limit, for sized text types.
    pub max_length: Option<i32>,
}

/// One page of table rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableData {
    /// Column names in select order.
    pub columns: Vec<String>,
    /// Rows keyed by column name; SQL NULL is JSON null.
    pub rows: Vec<Map<String, Value>>,
    /// Number of rows on this page.
    pub row_count: usize,
}
