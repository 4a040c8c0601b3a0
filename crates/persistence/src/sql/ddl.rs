//! DDL text generation.
//!
//! DDL cannot take bound parameters, so these builders produce plain text.
//! Every identifier passes through [`QuotedIdent`]. Column types and default
//! literals from [`ColumnSpec`] are embedded verbatim: the caller owns the
//! target database and can at worst break their own schema.

use crate::error::{StorageResult, ValidationError};
use crate::types::{ColumnSpec, TableSpec};

use super::ident::{QuotedIdent, QuotedLiteral};

/// PostgreSQL spelling of an auto-increment column.
pub const AUTO_INCREMENT_CLAUSE: &str = "GENERATED BY DEFAULT AS IDENTITY";

/// `"name" TYPE [NOT NULL] [GENERATED ...] [DEFAULT literal]`.
pub fn column_definition(column: &ColumnSpec) -> String {
    let mut def = format!(
        "{} {}",
        QuotedIdent::new(column.name.as_str()),
        column.data_type.trim()
    );
    if !column.is_nullable {
        def.push_str(" NOT NULL");
    }
    if column.is_auto_increment {
        def.push(' ');
        def.push_str(AUTO_INCREMENT_CLAUSE);
    }
    if let Some(literal) = column.default_literal() {
        def.push_str(" DEFAULT ");
        def.push_str(literal);
    }
    def
}

/// One `CREATE TABLE` with a composite primary key over every flagged column.
pub fn create_table(spec: &TableSpec) -> StorageResult<String> {
    if spec.columns.is_empty() {
        return Err(ValidationError::EmptyPayload {
            operation: "create table",
            field: "column",
        }
        .into());
    }

    let mut parts: Vec<String> = spec.columns.iter().map(column_definition).collect();

    let primary_key: Vec<String> = spec
        .columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| QuotedIdent::new(c.name.as_str()).to_string())
        .collect();
    if !primary_key.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", primary_key.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE {} ({})",
        QuotedIdent::new(spec.table_name.as_str()),
        parts.join(", ")
    ))
}

/// `DROP TABLE "table"`.
pub fn drop_table(table: &QuotedIdent) -> String {
    format!("DROP TABLE {}", table)
}

/// `ALTER TABLE "table" ADD COLUMN <definition>`.
pub fn add_column(table: &QuotedIdent, column: &ColumnSpec) -> String {
    format!("ALTER TABLE {} ADD COLUMN {}", table, column_definition(column))
}

/// One `ALTER TABLE` that retypes the column and resets nullability and
/// default to match `column`.
pub fn modify_column(table: &QuotedIdent, column: &ColumnSpec) -> String {
    let name = QuotedIdent::new(column.name.as_str());
    let data_type = column.data_type.trim();
    let mut actions = vec![format!(
        "ALTER COLUMN {name} TYPE {data_type} USING {name}::{data_type}"
    )];
    actions.push(if column.is_nullable {
        format!("ALTER COLUMN {name} DROP NOT NULL")
    } else {
        format!("ALTER COLUMN {name} SET NOT NULL")
    });
    actions.push(match column.default_literal() {
        Some(literal) => format!("ALTER COLUMN {name} SET DEFAULT {literal}"),
        None => format!("ALTER COLUMN {name} DROP DEFAULT"),
    });
    format!("ALTER TABLE {} {}", table, actions.join(", "))
}

/// `ALTER TABLE "table" DROP COLUMN "column"`.
pub fn drop_column(table: &QuotedIdent, column: &QuotedIdent) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", table, column)
}

/// Base tables of the `public` schema, by name.
pub const LIST_TABLES: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

/// Column metadata for table `$1` in ordinal order.
pub const LIST_COLUMNS: &str = "SELECT c.column_name::text, c.data_type::text, \
     c.is_nullable = 'YES' AS is_nullable, \
     EXISTS ( \
         SELECT 1 FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON kcu.constraint_name = tc.constraint_name \
          AND kcu.table_schema = tc.table_schema \
          AND kcu.table_name = tc.table_name \
         WHERE tc.constraint_type = 'PRIMARY KEY' \
           AND tc.table_schema = c.table_schema \
           AND tc.table_name = c.table_name \
           AND kcu.column_name = c.column_name \
     ) AS is_primary_key, \
     (c.is_identity = 'YES' OR COALESCE(c.column_default, '') LIKE 'nextval(%') AS is_auto_increment, \
     c.column_default::text, \
     c.character_maximum_length::int4 \
     FROM information_schema.columns c \
     WHERE c.table_schema = 'public' AND c.table_name = $1::text \
     ORDER BY c.ordinal_position";

/// `CREATE ROLE "user" LOGIN PASSWORD '...'`.
pub fn create_role(username: &QuotedIdent, password: &str) -> String {
    format!(
        "CREATE ROLE {} LOGIN PASSWORD {}",
        username,
        QuotedLiteral::new(password)
    )
}

/// `DROP ROLE IF EXISTS "user"`.
pub fn drop_role(username: &QuotedIdent) -> String {
    format!("DROP ROLE IF EXISTS {}", username)
}

/// `CREATE DATABASE` owned by the tenant login with a fixed encoding and,
/// when configured, a fixed locale.
pub fn create_database(
    database: &QuotedIdent,
    owner: &QuotedIdent,
    encoding: &str,
    locale: Option<&str>,
) -> String {
    let mut sql = format!(
        "CREATE DATABASE {} WITH OWNER {} ENCODING {} TEMPLATE template0",
        database,
        owner,
        QuotedLiteral::new(encoding)
    );
    if let Some(locale) = locale {
        let locale = QuotedLiteral::new(locale);
        sql.push_str(&format!(" LC_COLLATE {locale} LC_CTYPE {locale}"));
    }
    sql
}

/// `GRANT ALL PRIVILEGES ON DATABASE "db" TO "user"`.
pub fn grant_all(database: &QuotedIdent, username: &QuotedIdent) -> String {
    format!("GRANT ALL PRIVILEGES ON DATABASE {} TO {}", database, username)
}

/// `REVOKE ALL ON DATABASE "db" FROM PUBLIC`.
pub fn revoke_public(database: &QuotedIdent) -> String {
    format!("REVOKE ALL ON DATABASE {} FROM PUBLIC", database)
}

/// `DROP DATABASE IF EXISTS "db"`.
pub fn drop_database(database: &QuotedIdent) -> String {
    format!("DROP DATABASE IF EXISTS {}", database)
}

/// Ends other sessions on database `$1` so it can be dropped.
pub const TERMINATE_BACKENDS: &str = "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
     WHERE datname = $1 AND pid <> pg_backend_pid()";
