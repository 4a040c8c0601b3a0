//! HTTP request handlers.
//!
//! - [`provision`] - Provision, list, read and deprovision databases
//! - [`tables`] - List, create and drop tables
//! - [`columns`] - Read, add, modify and drop columns
//! - [`data`] - Paged reads and row mutations
//! - [`health`] - Health and probe endpoints

pub mod columns;
pub mod data;
pub mod health;
pub mod provision;
pub mod tables;

// Re-export handlers for convenience
pub use columns::{
    add_column_handler, drop_column_handler, list_columns_handler, modify_column_handler,
};
pub use data::{delete_handler, insert_handler, query_handler, update_handler};
pub use health::health_handler;
pub use provision::{deprovision_handler, list_handler, provision_handler, read_handler};
pub use tables::{create_table_handler, drop_table_handler, list_tables_handler};
