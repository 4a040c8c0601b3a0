//! Parameterized DML statements.
//!
//! A [`Statement`] only accepts two kinds of input: static SQL keywords and
//! [`QuotedIdent`]s go into the text, [`SqlValue`]s go into the parameter
//! list as `$N` placeholders. There is no way to append caller text to the
//! statement body.

use postgres_types::ToSql;
use serde_json::{Map, Value};

use crate::error::{StorageResult, ValidationError};

use super::ident::QuotedIdent;
use super::value::SqlValue;

/// SQL text with `$N` placeholders plus the values bound to them.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    sql: String,
    params: Vec<SqlValue>,
}

impl Statement {
    fn new() -> Self {
        Self::default()
    }

    fn keyword(&mut self, sql: &'static str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    fn ident(&mut self, ident: &QuotedIdent) -> &mut Self {
        self.sql.push_str(ident.as_sql());
        self
    }

    fn bind(&mut self, value: SqlValue) -> &mut Self {
        self.params.push(value);
        self.sql.push('$');
        self.sql.push_str(&self.params.len().to_string());
        self
    }

    /// The statement text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound values in placeholder order.
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Parameter references in the form the driver expects.
    pub fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect()
    }

    /// Appends `"col" = $N` pairs separated by `separator`.
    fn assignments(&mut self, values: &Map<String, Value>, separator: &'static str) {
        for (i, (column, value)) in values.iter().enumerate() {
            if i > 0 {
                self.keyword(separator);
            }
            self.ident(&QuotedIdent::new(column.as_str()))
                .keyword(" = ")
                .bind(SqlValue::from_json(value));
        }
    }

    /// `SELECT * FROM "table" LIMIT $1 OFFSET $2`.
    ///
    /// No ORDER BY is added, so rows come back in the engine's default
    /// order and pages may shift under concurrent writes.
    pub fn select_page(table: &QuotedIdent, limit: i64, offset: i64) -> Self {
        let mut stmt = Self::new();
        stmt.keyword("SELECT * FROM ")
            .ident(table)
            .keyword(" LIMIT ")
            .bind(SqlValue::Integer(limit))
            .keyword(" OFFSET ")
            .bind(SqlValue::Integer(offset));
        stmt
    }

    /// `SELECT COUNT(*) FROM "table"`.
    pub fn count_rows(table: &QuotedIdent) -> Self {
        let mut stmt = Self::new();
        stmt.keyword("SELECT COUNT(*) FROM ").ident(table);
        stmt
    }

    /// `INSERT INTO "table" ("a", "b") VALUES ($1, $2)`.
    pub fn insert(table: &QuotedIdent, values: &Map<String, Value>) -> StorageResult<Self> {
        if values.is_empty() {
            return Err(ValidationError::EmptyPayload {
                operation: "insert",
                field: "value",
            }
            .into());
        }

        let mut stmt = Self::new();
        stmt.keyword("INSERT INTO ").ident(table).keyword(" (");
        for (i, column) in values.keys().enumerate() {
            if i > 0 {
                stmt.keyword(", ");
            }
            stmt.ident(&QuotedIdent::new(column.as_str()));
        }
        stmt.keyword(") VALUES (");
        for (i, value) in values.values().enumerate() {
            if i > 0 {
                stmt.keyword(", ");
            }
            stmt.bind(SqlValue::from_json(value));
        }
        stmt.keyword(")");
        Ok(stmt)
    }

    /// `UPDATE "table" SET "a" = $1 WHERE "k" = $2 AND ...`.
    pub fn update(
        table: &QuotedIdent,
        set: &Map<String, Value>,
        filter: &Map<String, Value>,
    ) -> StorageResult<Self> {
        validate_update(set, filter)?;

        let mut stmt = Self::new();
        stmt.keyword("UPDATE ").ident(table).keyword(" SET ");
        stmt.assignments(set, ", ");
        stmt.keyword(" WHERE ");
        stmt.assignments(filter, " AND ");
        Ok(stmt)
    }

    /// `DELETE FROM "table" WHERE "k" = $1 AND ...`.
    pub fn delete(table: &QuotedIdent, filter: &Map<String, Value>) -> StorageResult<Self> {
        validate_delete(filter)?;

        let mut stmt = Self::new();
        stmt.keyword("DELETE FROM ")
            .ident(table)
            .keyword(" WHERE ");
        stmt.assignments(filter, " AND ");
        Ok(stmt)
    }
}

/// Rejects an update with nothing to set or no filter.
pub fn validate_update(set: &Map<String, Value>, filter: &Map<String, Value>) -> StorageResult<()> {
    if set.is_empty() {
        return Err(ValidationError::EmptyPayload {
            operation: "update",
            field: "value",
        }
        .into());
    }
    if filter.is_empty() {
        return Err(ValidationError::MissingFilter {
            operation: "update",
        }
        .into());
    }
    Ok(())
}

/// Rejects a delete with no filter.
pub fn validate_delete(filter: &Map<String, Value>) -> StorageResult<()> {
    if filter.is_empty() {
        return Err(ValidationError::MissingFilter {
            operation: "delete",
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_select_page() {
        let stmt = Statement::select_page(&QuotedIdent::new("t"), 10, 20);
        assert_eq!(stmt.sql(), "SELECT * FROM \"t\" LIMIT $1 OFFSET $2");
        assert_eq!(
            stmt.params(),
            &[SqlValue::Integer(10), SqlValue::Integer(20)]
        );
    }

    #[test]
    fn test_insert_binds_every_value() {
        let values = map(json!({"name": "a", "age": 3, "note": null}));
        let stmt = Statement::insert(&QuotedIdent::new("people"), &values).unwrap();
        assert_eq!(
            stmt.sql(),
            "INSERT INTO \"people\" (\"age\", \"name\", \"note\") VALUES ($1, $2, $3)"
        );
        assert_eq!(
            stmt.params(),
            &[
                SqlValue::Integer(3),
                SqlValue::Text("a".to_string()),
                SqlValue::Null
            ]
        );
        assert_eq!(stmt.param_refs().len(), 3);
    }

    #[test]
    fn test_value_text_never_reaches_sql() {
        let values = map(json!({"name": "'); DROP TABLE people; --"}));
        let stmt = Statement::insert(&QuotedIdent::new("people"), &values).unwrap();
        assert!(!stmt.sql().contains("DROP"));
    }

    #[test]
    fn test_insert_empty_is_rejected() {
        let err = Statement::insert(&QuotedIdent::new("t"), &Map::new()).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::EmptyPayload { .. })
        ));
    }

    #[test]
    fn test_update_numbers_placeholders_across_clauses() {
        let set = map(json!({"name": "b", "score": 1.5}));
        let filter = map(json!({"id": 1, "tenant": "x"}));
        let stmt = Statement::update(&QuotedIdent::new("t"), &set, &filter).unwrap();
        assert_eq!(
            stmt.sql(),
            "UPDATE \"t\" SET \"name\" = $1, \"score\" = $2 WHERE \"id\" = $3 AND \"tenant\" = $4"
        );
        assert_eq!(stmt.params().len(), 4);
    }

    #[test]
    fn test_update_requires_set_and_filter() {
        let set = map(json!({"name": "b"}));
        let err = Statement::update(&QuotedIdent::new("t"), &set, &Map::new()).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::MissingFilter { .. })
        ));

        let filter = map(json!({"id": 1}));
        let err = Statement::update(&QuotedIdent::new("t"), &Map::new(), &filter).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::EmptyPayload { .. })
        ));
    }

    #[test]
    fn test_delete() {
        let filter = map(json!({"id": 7}));
        let stmt = Statement::delete(&QuotedIdent::new("t"), &filter).unwrap();
        assert_eq!(stmt.sql(), "DELETE FROM \"t\" WHERE \"id\" = $1");

        let err = Statement::delete(&QuotedIdent::new("t"), &Map::new()).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::MissingFilter { .. })
        ));
    }

    #[test]
    fn test_quoted_column_names() {
        let values = map(json!({"we\"ird": 1}));
        let stmt = Statement::insert(&QuotedIdent::new("t\"x"), &values).unwrap();
        assert_eq!(
            stmt.sql(),
            "INSERT INTO \"t\"\"x\" (\"we\"\"ird\") VALUES ($1)"
        );
    }
}
