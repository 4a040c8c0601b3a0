//! Test infrastructure for the persistence layer.
//!
//! Provides a recording [`DatabaseAdmin`] that simulates the server catalog
//! in memory, plus helpers to wire it to an in-memory control plane.
//! [`FaultyStore`] wraps that control plane to fail transactions on demand.

#![allow(dead_code)]

pub mod admin;
pub mod fixtures;
pub mod store;

pub use admin::*;
pub use fixtures::*;
pub use store::*;
