//! Uniform connection handle.
//!
//! A [`DbConnection`] is what providers hand out: it owns either a pooled
//! connection (returned to its pool on drop) or the direct strategy's single
//! cached connection (returned to the provider's slot on drop), and exposes
//! the same operations over every engine.
//!
//! When the owning provider is in debug mode, the handle is stamped at
//! acquisition time and logs every statement before executing it.

use crate::db::params::{SqlParam, bind_mysql_param, bind_postgres_param, bind_sqlite_param};
use crate::error::{DbError, DbResult};
use crate::system::Dialect;
use sqlx::mysql::MySqlRow;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{ColumnIndex, Connection, MySql, MySqlConnection, PgConnection, Postgres, Row, Sqlite, SqliteConnection};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A physical connection to one of the supported engines.
pub(crate) enum RawConnection {
    Postgres(PgConnection),
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
    PostgresPooled(PoolConnection<Postgres>),
    MySqlPooled(PoolConnection<MySql>),
    SqlitePooled(PoolConnection<Sqlite>),
}

/// Borrowed view resolving pooled and direct variants to the concrete
/// engine connection.
pub(crate) enum ConnMut<'c> {
    Postgres(&'c mut PgConnection),
    MySql(&'c mut MySqlConnection),
    Sqlite(&'c mut SqliteConnection),
}

impl RawConnection {
    pub(crate) fn as_mut(&mut self) -> ConnMut<'_> {
        match self {
            Self::Postgres(c) => ConnMut::Postgres(c),
            Self::MySql(c) => ConnMut::MySql(c),
            Self::Sqlite(c) => ConnMut::Sqlite(c),
            Self::PostgresPooled(c) => ConnMut::Postgres(&mut *c),
            Self::MySqlPooled(c) => ConnMut::MySql(&mut *c),
            Self::SqlitePooled(c) => ConnMut::Sqlite(&mut *c),
        }
    }

    pub(crate) fn dialect(&self) -> Dialect {
        match self {
            Self::Postgres(_) | Self::PostgresPooled(_) => Dialect::Postgres,
            Self::MySql(_) | Self::MySqlPooled(_) => Dialect::MySql,
            Self::Sqlite(_) | Self::SqlitePooled(_) => Dialect::Sqlite,
        }
    }

    /// Liveness check against the server.
    pub(crate) async fn ping(&mut self) -> DbResult<()> {
        match self.as_mut() {
            ConnMut::Postgres(c) => c.ping().await.map_err(DbError::from),
            ConnMut::MySql(c) => c.ping().await.map_err(DbError::from),
            ConnMut::Sqlite(c) => c.ping().await.map_err(DbError::from),
        }
    }

    /// Close the physical connection. Pooled variants are simply dropped,
    /// which returns them to their pool.
    pub(crate) async fn close(self) -> DbResult<()> {
        match self {
            Self::Postgres(c) => c.close().await.map_err(DbError::from),
            Self::MySql(c) => c.close().await.map_err(DbError::from),
            Self::Sqlite(c) => c.close().await.map_err(DbError::from),
            Self::PostgresPooled(_) | Self::MySqlPooled(_) | Self::SqlitePooled(_) => Ok(()),
        }
    }
}

/// A ready-to-use logical connection issued by a provider.
pub struct DbConnection {
    conn: Option<RawConnection>,
    /// Direct strategy only: slot the connection goes back to on drop.
    home: Option<Arc<Mutex<Option<RawConnection>>>>,
    debug: bool,
}

impl DbConnection {
    pub(crate) fn pooled(conn: RawConnection, debug: bool) -> Self {
        Self {
            conn: Some(conn),
            home: None,
            debug,
        }
    }

    pub(crate) fn cached(
        conn: RawConnection,
        home: Arc<Mutex<Option<RawConnection>>>,
        debug: bool,
    ) -> Self {
        Self {
            conn: Some(conn),
            home: Some(home),
            debug,
        }
    }

    /// Whether this handle was issued with statement logging active.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// The engine behind this handle.
    pub fn dialect(&self) -> Dialect {
        self.raw_ref().dialect()
    }

    fn raw_ref(&self) -> &RawConnection {
        self.conn.as_ref().expect("connection present until drop")
    }

    pub(crate) fn raw_mut(&mut self) -> &mut RawConnection {
        self.conn.as_mut().expect("connection present until drop")
    }

    fn trace(&self, sql: &str) {
        if self.debug {
            debug!(sql = %sql, "executing statement");
        }
    }

    /// Execute a statement without preparing it.
    ///
    /// Used for DDL and transaction control, which some engines refuse to
    /// run through the prepared-statement protocol. Returns the number of
    /// affected rows.
    pub async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        self.trace(sql);
        match self.raw_mut().as_mut() {
            ConnMut::Postgres(c) => Ok(sqlx::raw_sql(sql).execute(c).await?.rows_affected()),
            ConnMut::MySql(c) => Ok(sqlx::raw_sql(sql).execute(c).await?.rows_affected()),
            ConnMut::Sqlite(c) => Ok(sqlx::raw_sql(sql).execute(c).await?.rows_affected()),
        }
    }

    /// Execute a parameterized statement and return the number of affected
    /// rows.
    pub async fn execute_with(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<u64> {
        self.trace(sql);
        match self.raw_mut().as_mut() {
            ConnMut::Postgres(c) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_postgres_param(query, param);
                }
                Ok(query.execute(c).await?.rows_affected())
            }
            ConnMut::MySql(c) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_mysql_param(query, param);
                }
                Ok(query.execute(c).await?.rows_affected())
            }
            ConnMut::Sqlite(c) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_sqlite_param(query, param);
                }
                Ok(query.execute(c).await?.rows_affected())
            }
        }
    }

    /// Prepare and execute a parameterized query, materializing all result
    /// rows in order.
    pub async fn fetch_all(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<Vec<SqlRow>> {
        self.trace(sql);
        match self.raw_mut().as_mut() {
            ConnMut::Postgres(c) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_postgres_param(query, param);
                }
                let rows = query.fetch_all(c).await?;
                Ok(rows.into_iter().map(SqlRow::Postgres).collect())
            }
            ConnMut::MySql(c) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_mysql_param(query, param);
                }
                let rows = query.fetch_all(c).await?;
                Ok(rows.into_iter().map(SqlRow::MySql).collect())
            }
            ConnMut::Sqlite(c) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_sqlite_param(query, param);
                }
                let rows = query.fetch_all(c).await?;
                Ok(rows.into_iter().map(SqlRow::Sqlite).collect())
            }
        }
    }

    /// Liveness check against the server.
    pub async fn ping(&mut self) -> DbResult<()> {
        self.raw_mut().ping().await
    }

    pub(crate) async fn begin(&mut self) -> DbResult<()> {
        self.execute("BEGIN").await.map(|_| ())
    }

    pub(crate) async fn commit(&mut self) -> DbResult<()> {
        self.execute("COMMIT").await.map(|_| ())
    }

    pub(crate) async fn rollback(&mut self) -> DbResult<()> {
        self.execute("ROLLBACK").await.map(|_| ())
    }
}

impl Drop for DbConnection {
    fn drop(&mut self) {
        // Direct strategy: hand the physical connection back to the provider
        // slot. Pooled connections return to their pool on their own.
        if let Some(home) = self.home.take() {
            if let (Some(conn), Ok(mut slot)) = (self.conn.take(), home.lock()) {
                *slot = Some(conn);
            }
        }
    }
}

impl std::fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConnection")
            .field("dialect", &self.raw_ref().dialect())
            .field("cached", &self.home.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

/// One result row, engine-agnostic.
///
/// Values are read by ordinal or column name through the typed accessors;
/// any driver failure is wrapped into [`DbError`].
pub enum SqlRow {
    Postgres(PgRow),
    MySql(MySqlRow),
    Sqlite(SqliteRow),
}

macro_rules! row_accessor {
    ($name:ident, $ty:ty) => {
        pub fn $name<I>(&self, index: I) -> DbResult<$ty>
        where
            I: ColumnIndex<PgRow> + ColumnIndex<MySqlRow> + ColumnIndex<SqliteRow>,
        {
            match self {
                Self::Postgres(row) => row.try_get(index).map_err(DbError::from),
                Self::MySql(row) => row.try_get(index).map_err(DbError::from),
                Self::Sqlite(row) => row.try_get(index).map_err(DbError::from),
            }
        }
    };
}

impl SqlRow {
    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        match self {
            Self::Postgres(row) => row.len(),
            Self::MySql(row) => row.len(),
            Self::Sqlite(row) => row.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    row_accessor!(get_string, String);
    row_accessor!(get_i32, i32);
    row_accessor!(get_i64, i64);
    row_accessor!(get_f64, f64);
    row_accessor!(get_bool, bool);
    row_accessor!(get_bytes, Vec<u8>);
}

impl std::fmt::Debug for SqlRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let engine = match self {
            Self::Postgres(_) => "postgres",
            Self::MySql(_) => "mysql",
            Self::Sqlite(_) => "sqlite",
        };
        f.debug_struct("SqlRow")
            .field("engine", &engine)
            .field("columns", &self.len())
            .finish()
    }
}
