//! dbforge server
//!
//! Serves the multi-tenant database API against a shared PostgreSQL server.

use std::sync::Arc;

use clap::Parser;
use dbforge_persistence::admin::PostgresAdmin;
use dbforge_persistence::config::PostgresConfig;
use dbforge_persistence::control_plane::PostgresControlPlane;
use dbforge_persistence::resolver::ServerEndpoint;
use dbforge_rest::{ServerConfig, create_app_with_config, init_logging};
use tracing::info;

/// Parses a connection URL named by `what`.
fn parse_url(url: &str, what: &str) -> anyhow::Result<PostgresConfig> {
    let config = PostgresConfig::from_connection_string(url)
        .map_err(|e| anyhow::anyhow!("Invalid {} URL: {}", what, e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid {} URL: {}", what, e))?;
    Ok(config)
}

/// Creates the control-plane store and its tables.
async fn create_control_plane(url: &str) -> anyhow::Result<PostgresControlPlane> {
    let config = parse_url(url, "control-plane")?;
    info!(host = %config.host, database = %config.dbname, "Initializing control plane");

    let store = PostgresControlPlane::new(config.create_pool()?);
    store.init_schema().await?;
    Ok(store)
}

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let admin_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DBFORGE_DATABASE_URL is required"))?;
    let admin_config = parse_url(admin_url, "admin")?;
    let control_plane_url = config.control_plane_url().unwrap_or(admin_url);

    info!(
        port = config.port,
        host = %config.host,
        server = %admin_config.host,
        max_databases = config.max_databases,
        locale = %config.database_locale,
        "Starting dbforge"
    );

    let store = create_control_plane(control_plane_url).await?;
    let provisioning = config.provisioning();
    let admin = PostgresAdmin::connect(&admin_config)?.with_provisioning(&provisioning);
    let endpoint = ServerEndpoint::from(&admin_config);

    let app = create_app_with_config(Arc::new(store), Arc::new(admin), endpoint, config.clone());
    serve(app, &config).await
}
