//! Row CRUD on tenant tables.

use serde_json::{Map, Value};
use tracing::debug;

use crate::connector::{TenantConnection, TenantConnector};
use crate::error::StorageResult;
use crate::owner::OwnerId;
use crate::resolver::ConnectionResolver;
use crate::sql::{QuotedIdent, Statement, row};
use crate::types::TableData;

/// Page size used when the caller gives none.
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Largest page a single query returns.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Coerces a page number to at least 1 and a page size into `1..=MAX_PAGE_SIZE`,
/// and returns `(limit, offset)`.
pub fn page_bounds(page: i64, page_size: i64) -> (i64, i64) {
    let page = page.max(1);
    let limit = page_size.clamp(1, MAX_PAGE_SIZE);
    (limit, (page - 1).saturating_mul(limit))
}

/// Generic row access with the tenant's login.
///
/// Every statement is built and validated before a connection is opened.
#[derive(Debug, Clone)]
pub struct DataAccessEngine {
    resolver: ConnectionResolver,
    connector: TenantConnector,
}

impl DataAccessEngine {
    /// Creates a data access engine.
    pub fn new(resolver: ConnectionResolver, connector: TenantConnector) -> Self {
        Self {
            resolver,
            connector,
        }
    }

    async fn connect(&self, owner: OwnerId, database_id: i64) -> StorageResult<TenantConnection> {
        let descriptor = self.resolver.resolve(owner, database_id).await?;
        self.connector.connect(&descriptor).await
    }

    async fn execute(&self, owner: OwnerId, database_id: i64, stmt: Statement) -> StorageResult<u64> {
        let conn = self.connect(owner, database_id).await?;
        debug!(database = %conn.database(), statement = %stmt.sql(), params = stmt.params().len(), "tenant dml");
        Ok(conn.client().execute(stmt.sql(), &stmt.param_refs()).await?)
    }

    /// Reads one page of a table.
    ///
    /// No ORDER BY is applied: rows come back in the engine's physical
    /// order, so pages can shift when the table is written between calls.
    /// Column names are reported even for an empty page.
    pub async fn query(
        &self,
        owner: OwnerId,
        database_id: i64,
        table: &str,
        page: i64,
        page_size: i64,
    ) -> StorageResult<TableData> {
        let (limit, offset) = page_bounds(page, page_size);
        let stmt = Statement::select_page(&QuotedIdent::new(table), limit, offset);

        let conn = self.connect(owner, database_id).await?;
        let client = conn.client();
        let prepared = client.prepare(stmt.sql()).await?;
        let columns = prepared
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let rows = client
            .query(&prepared, &stmt.param_refs())
            .await?
            .iter()
            .map(row::decode_row)
            .collect::<StorageResult<Vec<Map<String, Value>>>>()?;

        Ok(TableData {
            columns,
            row_count: rows.len(),
            rows,
        })
    }

    /// Inserts one row. Fails with `EmptyPayload` for an empty map.
    pub async fn insert(
        &self,
        owner: OwnerId,
        database_id: i64,
        table: &str,
        values: &Map<String, Value>,
    ) -> StorageResult<u64> {
        let stmt = Statement::insert(&QuotedIdent::new(table), values)?;
        self.execute(owner, database_id, stmt).await
    }

    /// Updates rows matching every `filter` equality.
    ///
    /// Fails with `EmptyPayload` for an empty `set` and `MissingFilter` for
    /// an empty `filter`.
    pub async fn update(
        &self,
        owner: OwnerId,
        database_id: i64,
        table: &str,
        set: &Map<String, Value>,
        filter: &Map<String, Value>,
    ) -> StorageResult<u64> {
        let stmt = Statement::update(&QuotedIdent::new(table), set, filter)?;
        self.execute(owner, database_id, stmt).await
    }

    /// Deletes rows matching every `filter` equality. Fails with
    /// `MissingFilter` for an empty `filter`.
    pub async fn delete(
        &self,
        owner: OwnerId,
        database_id: i64,
        table: &str,
        filter: &Map<String, Value>,
    ) -> StorageResult<u64> {
        let stmt = Statement::delete(&QuotedIdent::new(table), filter)?;
        self.execute(owner, database_id, stmt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::control_plane::InMemoryControlPlane;
    use crate::error::{StorageError, ValidationError};
    use crate::resolver::ServerEndpoint;

    fn engine() -> DataAccessEngine {
        let endpoint = ServerEndpoint::from(&crate::config::PostgresConfig::default());
        let resolver = ConnectionResolver::new(Arc::new(InMemoryControlPlane::new()), endpoint);
        DataAccessEngine::new(resolver, TenantConnector::new())
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(1, 10), (10, 0));
        assert_eq!(page_bounds(3, 10), (10, 20));
        assert_eq!(page_bounds(0, 10), (10, 0));
        assert_eq!(page_bounds(-5, 0), (1, 0));
        assert_eq!(page_bounds(2, 5000), (1000, 1000));
        assert_eq!(page_bounds(i64::MAX, 1000).1, i64::MAX);
    }

    // The store is empty, so reaching resolution would fail with NotFound.
    #[tokio::test]
    async fn test_validation_runs_before_resolution() {
        let engine = engine();
        let owner = OwnerId::new(1);

        let err = engine.insert(owner, 1, "t", &Map::new()).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::EmptyPayload { .. })
        ));

        let mut set = Map::new();
        set.insert("name".to_string(), Value::from("x"));
        let err = engine
            .update(owner, 1, "t", &set, &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::MissingFilter { .. })
        ));

        let err = engine.delete(owner, 1, "t", &Map::new()).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::MissingFilter { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_database_is_not_found() {
        let err = engine()
            .query(OwnerId::new(1), 42, "t", 1, 10)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
