//! Route configuration mapping HTTP paths to handlers.

pub mod api_routes;

pub use api_routes::create_routes;
