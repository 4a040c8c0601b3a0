//! Error types for the dbforge HTTP API.
//!
//! Errors render as `{"error": {"code": ..., "message": ...}}`. Storage errors
//! from the persistence layer map to HTTP statuses as follows:
//!
//! | Storage Error | HTTP Status | Code |
//! |--------------|-------------|------|
//! | NotFound | 404 | not-found |
//! | QuotaExceeded | 403 | quota-exceeded |
//! | AlreadyExists | 409 | conflict |
//! | EmptyPayload | 400 | empty-payload |
//! | MissingFilter | 400 | missing-filter |
//! | ConfigError | 500 | configuration |
//! | QueryError / SerializationError | 400 | engine |
//! | ConnectionFailed | 503 | unavailable |
//! | Transaction / Internal | 500 | exception |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dbforge_persistence::error::{
    BackendError, ConfigError, ResourceError, StorageError, TenantError, ValidationError,
};
use std::fmt;
use tracing::error;

/// The primary error type for HTTP operations.
#[derive(Debug)]
pub enum RestError {
    /// Record or object not found, or not owned by the caller (HTTP 404).
    NotFound {
        /// Error message.
        message: String,
    },

    /// Missing or malformed owner identity (HTTP 401).
    Unauthorized {
        /// Error message.
        message: String,
    },

    /// Database quota reached (HTTP 403).
    QuotaExceeded {
        /// Error message.
        message: String,
    },

    /// Name collision (HTTP 409).
    Conflict {
        /// Error message.
        message: String,
    },

    /// Rejected request (HTTP 400).
    BadRequest {
        /// Machine-readable code, e.g. `empty-payload`.
        code: &'static str,
        /// Error message.
        message: String,
    },

    /// Server-side configuration problem (HTTP 500).
    Configuration {
        /// Error message.
        message: String,
    },

    /// The database server could not be reached (HTTP 503).
    Unavailable {
        /// Error message.
        message: String,
    },

    /// Internal server error (HTTP 500).
    InternalError {
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// Creates a 400 with the given code.
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        RestError::BadRequest {
            code,
            message: message.into(),
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::NotFound { .. } => StatusCode::NOT_FOUND,
            RestError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RestError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            RestError::Conflict { .. } => StatusCode::CONFLICT,
            RestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RestError::Configuration { .. } | RestError::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RestError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the kebab-case error code.
    pub fn code(&self) -> &'static str {
        match self {
            RestError::NotFound { .. } => "not-found",
            RestError::Unauthorized { .. } => "unauthorized",
            RestError::QuotaExceeded { .. } => "quota-exceeded",
            RestError::Conflict { .. } => "conflict",
            RestError::BadRequest { code, .. } => *code,
            RestError::Configuration { .. } => "configuration",
            RestError::Unavailable { .. } => "unavailable",
            RestError::InternalError { .. } => "exception",
        }
    }

    fn message(&self) -> &str {
        match self {
            RestError::NotFound { message }
            | RestError::Unauthorized { message }
            | RestError::QuotaExceeded { message }
            | RestError::Conflict { message }
            | RestError::BadRequest { message, .. }
            | RestError::Configuration { message }
            | RestError::Unavailable { message }
            | RestError::InternalError { message } => message,
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, code = self.code(), error = %self.message(), "Request failed");
        }

        let body = serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.message(),
            }
        });
        (status, Json(body)).into_response()
    }
}

// Implement conversions from storage errors

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Resource(e) => e.into(),
            StorageError::Tenant(e) => e.into(),
            StorageError::Validation(e) => e.into(),
            StorageError::Config(e) => e.into(),
            StorageError::Transaction(e) => RestError::InternalError {
                message: e.to_string(),
            },
            StorageError::Backend(e) => e.into(),
        }
    }
}

impl From<ResourceError> for RestError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::NotFound { .. } => RestError::NotFound {
                message: err.to_string(),
            },
            ResourceError::AlreadyExists { .. } => RestError::Conflict {
                message: err.to_string(),
            },
        }
    }
}

impl From<TenantError> for RestError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::QuotaExceeded { .. } => RestError::QuotaExceeded {
                message: err.to_string(),
            },
        }
    }
}

impl From<ValidationError> for RestError {
    fn from(err: ValidationError) -> Self {
        let code = match err {
            ValidationError::EmptyPayload { .. } => "empty-payload",
            ValidationError::MissingFilter { .. } => "missing-filter",
        };
        RestError::bad_request(code, err.to_string())
    }
}

impl From<ConfigError> for RestError {
    fn from(err: ConfigError) -> Self {
        RestError::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<BackendError> for RestError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::QueryError { .. } | BackendError::SerializationError { .. } => {
                RestError::bad_request("engine", err.to_string())
            }
            BackendError::ConnectionFailed { .. } => RestError::Unavailable {
                message: err.to_string(),
            },
            BackendError::Internal { .. } => RestError::InternalError {
                message: err.to_string(),
            },
        }
    }
}

/// Result type alias for HTTP handlers.
pub type RestResult<T> = Result<T, RestError>;
