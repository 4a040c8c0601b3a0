//! Error types for the persistence layer.
//!
//! This module defines all error types used by the provisioning, schema and
//! data services, following a hierarchy that separates resource state,
//! tenant quota, request validation, configuration, transaction and backend
//! errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::owner::OwnerId;
use crate::sql::ValueEncodeError;

/// The primary error type for all storage operations.
///
/// This enum encompasses all possible errors that can occur during
/// provisioning, schema and data operations, organized by category.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors (not found, name collisions)
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Tenant quota errors
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Request payload errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Missing connection parameters or tenant login
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Control-plane transaction errors
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Errors surfaced by the database engine
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Shorthand for a [`ResourceError::NotFound`].
    pub fn not_found(resource_type: &str, id: impl ToString) -> Self {
        StorageError::Resource(ResourceError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        })
    }

    /// Returns `true` if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Resource(ResourceError::NotFound { .. }))
    }

    /// Returns `true` if this is a name collision.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StorageError::Resource(ResourceError::AlreadyExists { .. })
        )
    }
}

/// Errors related to control-plane records and physical objects.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The record or object is absent, or not owned by the caller.
    #[error("{resource_type} not found: {id}")]
    NotFound { resource_type: String, id: String },

    /// A record or physical object with the same name already exists.
    #[error("{resource_type} already exists: {id}")]
    AlreadyExists { resource_type: String, id: String },
}

/// Errors related to tenant accounts.
#[derive(Error, Debug)]
pub enum TenantError {
    /// The owner already has the maximum number of databases.
    #[error("database quota exceeded for owner {owner}: {current} of {max} in use")]
    QuotaExceeded {
        owner: OwnerId,
        current: i32,
        max: i32,
    },
}

/// Errors related to request payloads.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A required list or map was empty.
    #[error("{operation} requires at least one {field}")]
    EmptyPayload {
        operation: &'static str,
        field: &'static str,
    },

    /// An update or delete was requested without a where clause.
    #[error("{operation} requires a non-empty where clause")]
    MissingFilter { operation: &'static str },
}

/// Errors related to connection configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An admin connection parameter is missing or empty.
    #[error("missing connection parameter: {name}")]
    MissingParameter { name: &'static str },

    /// The tenant has databases but no stored login.
    #[error("owner {owner} has no database login; provisioning never completed")]
    MissingLogin { owner: OwnerId },

    /// A connection string could not be parsed.
    #[error("invalid connection string: {message}")]
    InvalidConnectionString { message: String },
}

/// Errors related to control-plane transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// Transaction was rolled back.
    #[error("transaction rolled back: {reason}")]
    RolledBack { reason: String },

    /// Transaction is no longer valid (already committed or rolled back).
    #[error("transaction no longer valid")]
    InvalidTransaction,
}

/// Errors originating from the database engine.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Could not reach the server or acquire a connection.
    #[error("connection to {backend_name} failed: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// The server rejected a statement.
    #[error("query failed ({code}): {message}")]
    QueryError { code: String, message: String },

    /// A value could not be encoded or decoded.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<tokio_postgres::Error> for StorageError {
    fn from(err: tokio_postgres::Error) -> Self {
        use tokio_postgres::error::SqlState;

        let Some(db_error) = err.as_db_error() else {
            // Parameter encoding failures carry our own error as their source.
            if let Some(encode) = std::error::Error::source(&err)
                .and_then(|source| source.downcast_ref::<ValueEncodeError>())
            {
                return StorageError::Backend(BackendError::SerializationError {
                    message: format!("{}: {}", err, encode),
                });
            }
            return StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "postgres".to_string(),
                message: err.to_string(),
            });
        };

        let code = db_error.code();
        let conflict_kind = if *code == SqlState::DUPLICATE_DATABASE {
            Some("database")
        } else if *code == SqlState::DUPLICATE_OBJECT {
            Some("role")
        } else if *code == SqlState::DUPLICATE_TABLE {
            Some("table")
        } else if *code == SqlState::DUPLICATE_COLUMN {
            Some("column")
        } else if *code == SqlState::UNIQUE_VIOLATION {
            Some("record")
        } else {
            None
        };

        if *code == SqlState::UNDEFINED_TABLE || *code == SqlState::UNDEFINED_COLUMN {
            let resource_type = if *code == SqlState::UNDEFINED_TABLE {
                "table"
            } else {
                "column"
            };
            return StorageError::Resource(ResourceError::NotFound {
                resource_type: resource_type.to_string(),
                id: db_error.message().to_string(),
            });
        }

        match conflict_kind {
            Some(resource_type) => StorageError::Resource(ResourceError::AlreadyExists {
                resource_type: resource_type.to_string(),
                id: db_error.message().to_string(),
            }),
            None => StorageError::Backend(BackendError::QueryError {
                code: code.code().to_string(),
                message: db_error.message().to_string(),
            }),
        }
    }
}

impl From<deadpool_postgres::PoolError> for StorageError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        StorageError::Backend(BackendError::ConnectionFailed {
            backend_name: "postgres".to_string(),
            message: err.to_string(),
        })
    }
}
