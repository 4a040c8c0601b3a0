//! Owner identifier type.
//!
//! This module defines the [`OwnerId`] type, the identity of an authenticated
//! end user who owns zero or more provisioned databases. Authentication
//! happens upstream; the core only ever receives an already-verified id and
//! threads it explicitly through every operation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An authenticated owner identifier.
///
/// # Examples
///
/// ```
/// use dbforge_persistence::owner::OwnerId;
///
/// let owner = OwnerId::new(42);
/// assert_eq!(owner.value(), 42);
/// assert_eq!(owner.to_string(), "42");
///
/// let parsed: OwnerId = "42".parse().unwrap();
/// assert_eq!(parsed, owner);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(i64);

impl OwnerId {
    /// Creates a new owner ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({})", self.0)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OwnerId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Error returned when parsing an [`OwnerId`] from text fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOwnerIdError(String);

impl fmt::Display for ParseOwnerIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid owner id: {:?}", self.0)
    }
}

impl std::error::Error for ParseOwnerIdError {}

impl FromStr for OwnerId {
    type Err = ParseOwnerIdError;

    /// Parses a positive integer owner id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(ParseOwnerIdError(s.to_string())),
        }
    }
}
