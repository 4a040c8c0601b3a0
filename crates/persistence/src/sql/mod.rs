//! Safe SQL construction for tenant-defined tables.
//!
//! Identifiers and values never mix: [`QuotedIdent`] is formatted into
//! statement text, [`SqlValue`] is bound as a parameter. [`Statement`] and
//! the [`ddl`] builders are the only places the two meet.

pub mod ddl;
mod ident;
pub mod row;
mod statement;
mod value;

pub use ident::{IDENT_QUOTE, QuotedIdent};
pub use statement::{Statement, validate_delete, validate_update};
pub use value::{SqlValue, ValueEncodeError};
