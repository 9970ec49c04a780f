//! Query execution against a provider.
//!
//! [`QueryExecutor`] runs parameterized reads and idempotent DDL bootstrap
//! over connections drawn from a [`ConnectionProvider`]. Schema bootstrap
//! failures are fatal state errors; read failures surface as query errors.

use crate::db::connection::SqlRow;
use crate::db::params::SqlParam;
use crate::db::provider::ConnectionProvider;
use crate::db::schema::{TableSchema, TableSchemaColumn};
use crate::error::{DbError, DbResult};
use crate::system::Dialect;
use tracing::{debug, info};

/// Runs statements over a provider's connections.
pub struct QueryExecutor<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Create every table that does not exist yet.
    ///
    /// One statement per schema, generated from the declared column list.
    /// Re-running with the same schemas is a no-op. Any failure is a fatal
    /// [`DbError::State`]; bootstrap is not recoverable inline.
    pub async fn create_table_if_not_exists(&self, schemas: &[TableSchema]) -> DbResult<()> {
        let dialect = self.provider.system().dialect();
        for schema in schemas {
            let query = create_table_query(schema, dialect);
            debug!(table = %schema.table_name(), "Creating table if not exists");
            let mut connection = self
                .provider
                .connection()
                .await
                .map_err(|e| DbError::state(e.to_string()))?;
            connection.execute(&query).await.map_err(|e| {
                DbError::state(format!(
                    "creating table {} failed: {}",
                    schema.table_name(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Drop the given tables over a single connection. Failure is fatal.
    pub async fn drop_tables(&self, tables: &[&str]) -> DbResult<()> {
        let mut connection = self
            .provider
            .connection()
            .await
            .map_err(|e| DbError::state(e.to_string()))?;
        for table in tables {
            info!(table = %table, "Dropping table");
            connection
                .execute(&format!("DROP TABLE {}", table))
                .await
                .map_err(|e| DbError::state(format!("dropping table {} failed: {}", table, e)))?;
        }
        Ok(())
    }

    /// Run a read query and map every result row, preserving row order.
    pub async fn select<T, F>(&self, query: &str, mapper: F) -> DbResult<Vec<T>>
    where
        F: FnMut(&SqlRow) -> DbResult<T>,
    {
        self.select_with(query, &[], mapper).await
    }

    /// Run a parameterized read query and map every result row, preserving
    /// row order.
    pub async fn select_with<T, F>(
        &self,
        query: &str,
        params: &[SqlParam],
        mut mapper: F,
    ) -> DbResult<Vec<T>>
    where
        F: FnMut(&SqlRow) -> DbResult<T>,
    {
        let mut connection = self.provider.connection().await?;
        let rows = connection.fetch_all(query, params).await?;
        let mut result = Vec::with_capacity(rows.len());
        for row in &rows {
            result.push(mapper(row)?);
        }
        Ok(result)
    }
}

/// Build the `CREATE TABLE IF NOT EXISTS` statement for a schema.
///
/// The id column comes first, followed by the remaining columns in
/// declaration order and a trailing `PRIMARY KEY` clause. Sizes render as
/// `(n)` only for sized types; `NOT NULL` and `UNIQUE` only when declared.
pub(crate) fn create_table_query(schema: &TableSchema, dialect: Dialect) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(id) = schema.id() {
        let mut rendered = render_column(id);
        if schema.generated_id() {
            match dialect {
                Dialect::Postgres => rendered.push_str(" GENERATED ALWAYS AS IDENTITY"),
                Dialect::MySql => rendered.push_str(" AUTO_INCREMENT"),
                // An integer primary key is already the rowid alias.
                Dialect::Sqlite => {}
            }
        }
        parts.push(rendered);
    }
    for column in schema.columns() {
        parts.push(render_column(column));
    }
    if let Some(id) = schema.id() {
        parts.push(format!("PRIMARY KEY ({})", id.title()));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        schema.table_name(),
        parts.join(",")
    )
}

fn render_column(column: &TableSchemaColumn) -> String {
    let mut out = format!("{} {}", column.title(), column.column_type().render());
    if let Some(size) = column.size() {
        out.push_str(&format!("({})", size));
    }
    if !column.nullable() {
        out.push_str(" NOT NULL");
    }
    if column.is_unique() {
        out.push_str(" UNIQUE");
    }
    out
}
