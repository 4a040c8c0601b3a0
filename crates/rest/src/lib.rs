//! # dbforge-rest - HTTP API for the dbforge database service
//!
//! Exposes tenant provisioning, schema management and row access over JSON.
//! Authentication is done upstream: the gateway forwards the verified owner
//! in the `X-Owner-Id` header, and every handler threads that owner into the
//! core operations of [`dbforge_persistence`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dbforge_rest::{create_app_with_config, ServerConfig};
//! use dbforge_persistence::{PostgresAdmin, PostgresControlPlane, ServerEndpoint};
//! use dbforge_persistence::config::PostgresConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pg = PostgresConfig::from_connection_string("postgres://admin:pw@localhost/postgres")?;
//!     let store = PostgresControlPlane::new(pg.create_pool()?);
//!     store.init_schema().await?;
//!
//!     let app = create_app_with_config(
//!         Arc::new(store),
//!         Arc::new(PostgresAdmin::connect(&pg)?),
//!         ServerEndpoint::from(&pg),
//!         ServerConfig::default(),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Operation | HTTP Method | URL Pattern |
//! |-----------|-------------|-------------|
//! | provision | POST | `/provision` |
//! | list databases | GET | `/provision` |
//! | read database | GET | `/provision/{id}` |
//! | deprovision | DELETE | `/provision/{id}` |
//! | list tables | GET | `/databases/{id}/tables` |
//! | create table | POST | `/databases/{id}/tables` |
//! | drop table | DELETE | `/databases/{id}/tables/{name}` |
//! | list columns | GET | `/databases/{id}/tables/{name}/columns` |
//! | add column | POST | `/databases/{id}/tables/{name}/columns` |
//! | modify column | PUT | `/databases/{id}/tables/{name}/columns` |
//! | drop column | DELETE | `/databases/{id}/tables/{name}/columns/{column}` |
//! | read rows | GET | `/databases/{id}/data/tables/{name}?page&pageSize` |
//! | insert | POST | `/databases/{id}/data/insert` |
//! | update | PUT | `/databases/{id}/data/update` |
//! | delete | DELETE | `/databases/{id}/data/delete` |
//!
//! ## Error Handling
//!
//! Errors are returned as `{"error": {"code", "message"}}`; see [`error`]
//! for the status mapping.
//!
//! ## Architecture
//!
//! - [`error`] - Error types and HTTP status mapping
//! - [`config`] - Server configuration
//! - [`state`] - Application state (core services, configuration)
//! - [`handlers`] - HTTP request handlers
//! - [`extractors`] - Owner, pagination and JSON body extractors
//! - [`routing`] - Route configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit};
use dbforge_persistence::admin::DatabaseAdmin;
use dbforge_persistence::control_plane::ControlPlaneStore;
use dbforge_persistence::resolver::ServerEndpoint;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application from prepared state.
pub fn create_app(state: AppState) -> Router {
    let config = state.config().clone();
    let router = routing::create_routes(state);

    // Build middleware stack
    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(config.request_timeout),
        ))
        .layer(DefaultBodyLimit::max(config.max_body_size));

    // Add CORS if enabled
    let router = if config.enable_cors {
        let cors = build_cors_layer(&config);
        router.layer(cors)
    } else {
        router
    };

    router.layer(service_builder)
}

/// Creates the Axum application with custom configuration.
///
/// # Arguments
///
/// * `store` - Account and database records
/// * `admin` - Privileged connection used for provisioning only
/// * `endpoint` - Address tenant logins connect to
/// * `config` - Server configuration
pub fn create_app_with_config(
    store: Arc<dyn ControlPlaneStore>,
    admin: Arc<dyn DatabaseAdmin>,
    endpoint: ServerEndpoint,
    config: ServerConfig,
) -> Router {
    info!(
        host = %endpoint.host,
        port = endpoint.port,
        "Creating dbforge API server"
    );

    create_app(AppState::new(store, admin, endpoint, config))
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    // Configure origins
    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    // Configure methods
    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    // Configure headers
    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// Call once at startup. `RUST_LOG` overrides the default filter.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "dbforge_rest={level},dbforge_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
