//! Table and column DDL against tenant databases.

use tokio_postgres::Row;
use tracing::debug;

use crate::connector::{TenantConnection, TenantConnector};
use crate::error::{StorageError, StorageResult};
use crate::owner::OwnerId;
use crate::resolver::ConnectionResolver;
use crate::sql::{QuotedIdent, Statement, ddl};
use crate::types::{ColumnInfo, ColumnSpec, TableInfo, TableSpec};

fn column_info_from_row(row: &Row) -> StorageResult<ColumnInfo> {
    Ok(ColumnInfo {
        column_name: row.try_get(0)?,
        data_type: row.try_get(1)?,
        is_nullable: row.try_get(2)?,
        is_primary_key: row.try_get(3)?,
        is_auto_increment: row.try_get(4)?,
        default_value: row.try_get(5)?,
        max_length: row.try_get(6)?,
    })
}

/// Schema operations on a tenant database, run with the tenant's login.
#[derive(Debug, Clone)]
pub struct SchemaManager {
    resolver: ConnectionResolver,
    connector: TenantConnector,
}

impl SchemaManager {
    /// Creates a schema manager.
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

    async fn execute_ddl(&self, owner: OwnerId, database_id: i64, sql: String) -> StorageResult<()> {
        let conn = self.connect(owner, database_id).await?;
        debug!(database = %conn.database(), statement = %sql, "tenant ddl");
        conn.client().batch_execute(&sql).await?;
        Ok(())
    }

    /// Base tables with their row counts, by name.
    pub async fn list_tables(&self, owner: OwnerId, database_id: i64) -> StorageResult<Vec<TableInfo>> {
        let conn = self.connect(owner, database_id).await?;
        let client = conn.client();

        let names: Vec<String> = client
            .query(ddl::LIST_TABLES, &[])
            .await?
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tables = Vec::with_capacity(names.len());
        for table_name in names {
            let count = Statement::count_rows(&QuotedIdent::new(table_name.as_str()));
            let row_count: i64 = client.query_one(count.sql(), &[]).await?.try_get(0)?;
            tables.push(TableInfo {
                table_name,
                row_count,
            });
        }
        Ok(tables)
    }

    /// Creates a table. Fails with `EmptyPayload` before connecting when
    /// the table has no columns.
    pub async fn create_table(
        &self,
        owner: OwnerId,
        database_id: i64,
        spec: &TableSpec,
    ) -> StorageResult<()> {
        let sql = ddl::create_table(spec)?;
        self.execute_ddl(owner, database_id, sql).await
    }

    /// Drops a table.
    pub async fn drop_table(&self, owner: OwnerId, database_id: i64, table: &str) -> StorageResult<()> {
        let sql = ddl::drop_table(&QuotedIdent::new(table));
        self.execute_ddl(owner, database_id, sql).await
    }

    /// Column metadata in ordinal order.
    ///
    /// Fails with `NotFound` when the table has no columns or does not exist.
    pub async fn list_columns(
        &self,
        owner: OwnerId,
        database_id: i64,
        table: &str,
    ) -> StorageResult<Vec<ColumnInfo>> {
        let conn = self.connect(owner, database_id).await?;
        let rows = conn.client().query(ddl::LIST_COLUMNS, &[&table]).await?;
        if rows.is_empty() {
            return Err(StorageError::not_found("table", table));
        }
        rows.iter().map(column_info_from_row).collect()
    }

    /// Adds a column.
    pub async fn add_column(
        &self,
        owner: OwnerId,
        database_id: i64,
        table: &str,
        column: &ColumnSpec,
    ) -> StorageResult<()> {
        let sql = ddl::add_column(&QuotedIdent::new(table), column);
        self.execute_ddl(owner, database_id, sql).await
    }

    /// Changes a column's type, nullability and default in one statement.
    pub async fn modify_column(
        &self,
        owner: OwnerId,
        database_id: i64,
        table: &str,
        column: &ColumnSpec,
    ) -> StorageResult<()> {
        let sql = ddl::modify_column(&QuotedIdent::new(table), column);
        self.execute_ddl(owner, database_id, sql).await
    }

    /// Drops a column.
    pub async fn drop_column(
        &self,
        owner: OwnerId,
        database_id: i64,
        table: &str,
        column: &str,
    ) -> StorageResult<()> {
        let sql = ddl::drop_column(&QuotedIdent::new(table), &QuotedIdent::new(column));
        self.execute_ddl(owner, database_id, sql).await
    }
}
