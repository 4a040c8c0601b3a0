//! Identifier and literal quoting.

use std::fmt;

/// The PostgreSQL identifier quote character.
pub const IDENT_QUOTE: char = '"';

/// An escaped SQL identifier, ready to embed in statement text.
///
/// Construction doubles every internal `"` and wraps the whole name in
/// quotes, so any caller-supplied table, column, database or role name is
/// always read by the server as a single identifier. No other validation
/// is applied; names the server rejects surface as engine errors.
///
/// # Examples
///
/// ```
/// use dbforge_persistence::sql::QuotedIdent;
///
/// assert_eq!(QuotedIdent::new("users").to_string(), "\"users\"");
/// assert_eq!(QuotedIdent::new("we\"ird").to_string(), "\"we\"\"ird\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuotedIdent {
    raw: String,
    quoted: String,
}

impl QuotedIdent {
    /// Escapes a raw identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let doubled = raw.replace(IDENT_QUOTE, "\"\"");
        let quoted = format!("{IDENT_QUOTE}{doubled}{IDENT_QUOTE}");
        Self { raw, quoted }
    }

    /// The unescaped name, for messages and bound comparisons.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The escaped form.
    pub fn as_sql(&self) -> &str {
        &self.quoted
    }
}

impl fmt::Display for QuotedIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted)
    }
}

/// A single-quoted string literal for the few DDL positions that cannot take
/// a bound parameter (`CREATE ROLE ... PASSWORD`, `ENCODING`, `LC_COLLATE`).
///
/// Only server-generated or configured values go through here, never row
/// data. Requires `standard_conforming_strings`, the server default.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct QuotedLiteral(String);

impl QuotedLiteral {
    pub(crate) fn new(value: &str) -> Self {
        Self(format!("'{}'", value.replace('\'', "''")))
    }
}

impl fmt::Display for QuotedLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for QuotedLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QuotedLiteral(..)")
    }
}
