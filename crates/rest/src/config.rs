//! Server configuration for the dbforge HTTP API.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DBFORGE_SERVER_PORT` | 8080 | Server port |
//! | `DBFORGE_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `DBFORGE_LOG_LEVEL` | info | Log level |
//! | `DBFORGE_MAX_BODY_SIZE` | 10485760 | Max request body (bytes) |
//! | `DBFORGE_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `DBFORGE_ENABLE_CORS` | true | Enable CORS |
//! | `DBFORGE_CORS_ORIGINS` | * | Allowed origins |
//! | `DBFORGE_CORS_METHODS` | GET,POST,PUT,DELETE,OPTIONS | Allowed methods |
//! | `DBFORGE_CORS_HEADERS` | Content-Type,Authorization,Accept,X-Owner-Id | Allowed headers |
//! | `DBFORGE_DATABASE_URL` | | Admin connection URL for the shared server |
//! | `DBFORGE_CONTROL_PLANE_URL` | admin URL | Connection URL for account records |
//! | `DBFORGE_DEFAULT_PAGE_SIZE` | 100 | Rows per page when `pageSize` is absent |
//! | `DBFORGE_MAX_PAGE_SIZE` | 1000 | Largest accepted `pageSize` |
//! | `DBFORGE_MAX_DATABASES` | 3 | Quota for newly registered accounts |
//! | `DBFORGE_AUTO_REGISTER` | false | Create accounts on first provision |
//! | `DBFORGE_DATABASE_LOCALE` | C.UTF-8 | Collation of new databases (empty for the server default) |
//!
//! # Example
//!
//! ```rust
//! use dbforge_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     ..Default::default()
//! };
//! assert_eq!(config.socket_addr(), "0.0.0.0:3000");
//! ```

use clap::Parser;
use dbforge_persistence::config::ProvisioningConfig;
use dbforge_persistence::data::MAX_PAGE_SIZE;

/// Server configuration for the dbforge HTTP API.
///
/// Built from command line arguments with [`ServerConfig::parse`], from the
/// environment with [`ServerConfig::from_env`], or programmatically.
#[derive(Debug, Clone, Parser)]
#[command(name = "dbforge")]
#[command(about = "Multi-tenant database service")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "DBFORGE_SERVER_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "DBFORGE_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "DBFORGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum request body size in bytes.
    #[arg(long, env = "DBFORGE_MAX_BODY_SIZE", default_value = "10485760")]
    pub max_body_size: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "DBFORGE_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "DBFORGE_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "DBFORGE_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(
        long,
        env = "DBFORGE_CORS_METHODS",
        default_value = "GET,POST,PUT,DELETE,OPTIONS"
    )]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "DBFORGE_CORS_HEADERS",
        default_value = "Content-Type,Authorization,Accept,X-Owner-Id"
    )]
    pub cors_headers: String,

    /// Admin connection URL of the shared PostgreSQL server.
    #[arg(long, env = "DBFORGE_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Connection URL of the control-plane database. Defaults to the admin URL.
    #[arg(long, env = "DBFORGE_CONTROL_PLANE_URL")]
    pub control_plane_url: Option<String>,

    /// Rows per page when the request gives no `pageSize`.
    #[arg(long, env = "DBFORGE_DEFAULT_PAGE_SIZE", default_value = "100")]
    pub default_page_size: i64,

    /// Largest accepted `pageSize`.
    #[arg(long, env = "DBFORGE_MAX_PAGE_SIZE", default_value = "1000")]
    pub max_page_size: i64,

    /// Database quota for newly registered accounts.
    #[arg(long, env = "DBFORGE_MAX_DATABASES", default_value = "3")]
    pub max_databases: i32,

    /// Create a missing account on its first provisioning request.
    #[arg(long, env = "DBFORGE_AUTO_REGISTER", default_value = "false")]
    pub auto_register: bool,

    /// Collation and character classification of new databases. Empty
    /// leaves them to the server default.
    #[arg(long, env = "DBFORGE_DATABASE_LOCALE", default_value = "C.UTF-8")]
    pub database_locale: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            max_body_size: 10 * 1024 * 1024, // 10MB
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,PUT,DELETE,OPTIONS".to_string(),
            cors_headers: "Content-Type,Authorization,Accept,X-Owner-Id".to_string(),
            database_url: None,
            control_plane_url: None,
            default_page_size: 100,
            max_page_size: 1000,
            max_databases: 3,
            auto_register: false,
            database_locale: "C.UTF-8".to_string(),
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    ///
    /// Parses environment variables without requiring command line arguments.
    pub fn from_env() -> Self {
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The control-plane URL, falling back to the admin URL.
    pub fn control_plane_url(&self) -> Option<&str> {
        self.control_plane_url
            .as_deref()
            .or(self.database_url.as_deref())
    }

    /// Provisioning settings derived from this configuration.
    pub fn provisioning(&self) -> ProvisioningConfig {
        let mut provisioning = ProvisioningConfig::default()
            .with_default_max_databases(self.max_databases)
            .with_auto_register_accounts(self.auto_register);
        provisioning.database_locale = match self.database_locale.trim() {
            "" => None,
            locale => Some(locale.to_string()),
        };
        provisioning
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.max_body_size == 0 {
            errors.push("Max body size cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.default_page_size < 1 {
            errors.push("Default page size must be at least 1".to_string());
        }

        if self.max_page_size > MAX_PAGE_SIZE {
            errors.push(format!("Max page size cannot exceed {}", MAX_PAGE_SIZE));
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if self.max_databases < 0 {
            errors.push("Max databases cannot be negative".to_string());
        }

        if self.database_url.is_none() {
            errors.push("A database URL is required (DBFORGE_DATABASE_URL)".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses ephemeral port 0, a short timeout and small pages, and turns on
    /// account auto-registration.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            host: "127.0.0.1".to_string(),
            log_level: "debug".to_string(),
            max_body_size: 1024 * 1024,
            request_timeout: 5,
            enable_cors: false,
            cors_origins: "*".to_string(),
            cors_methods: "*".to_string(),
            cors_headers: "*".to_string(),
            database_url: None,
            control_plane_url: None,
            default_page_size: 10,
            max_page_size: 100,
            max_databases: 3,
            auto_register: true,
            database_locale: "C.UTF-8".to_string(),
        }
    }
}
