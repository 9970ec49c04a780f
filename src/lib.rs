//! sqlbridge
//!
//! A data-access layer that abstracts connection acquisition, pooling,
//! transactional execution and schema bootstrap across SQL engines
//! (PostgreSQL, MySQL, SQLite file and in-memory).
//!
//! The flow is: a [`ProviderFactory`] resolves a logical system key to an
//! engine descriptor and builds a [`ConnectionProvider`] (pooled or direct
//! behind the same contract); [`Transaction`] and [`QueryExecutor`] then run
//! units of work and queries against whatever provider they are given.
//!
//! ```no_run
//! use sqlbridge::{
//!     ConnectionParams, ConnectionProvider, ProviderFactory, QueryExecutor, Transaction,
//! };
//!
//! # async fn demo() -> sqlbridge::DbResult<()> {
//! let factory = ProviderFactory::new();
//! let params = ConnectionParams::new("sqlite-memory", "localhost", 0, "app", "sa", "sa")?;
//! let provider = factory.create(&params)?;
//! provider.sanity().await?;
//!
//! Transaction::new(provider.as_ref())
//!     .execute(|c| {
//!         Box::pin(async move {
//!             c.execute("INSERT INTO players (name) VALUES ('alice')").await?;
//!             Ok(())
//!         })
//!     })
//!     .await;
//!
//! let names = QueryExecutor::new(provider.as_ref())
//!     .select("SELECT name FROM players", |row| row.get_string(0))
//!     .await?;
//! provider.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod system;

pub use config::{ConnectionParams, PoolConfig};
pub use db::connection::{DbConnection, SqlRow};
pub use db::executor::QueryExecutor;
pub use db::factory::ProviderFactory;
pub use db::params::SqlParam;
pub use db::provider::{
    ConnectionProvider, DirectConnectionProvider, PooledConnectionProvider, PoolingStrategy,
};
pub use db::schema::{ColumnType, TableSchema, TableSchemaColumn};
pub use db::transaction::Transaction;
pub use db::updater::{MigrationUpdater, SchemaUpdater};
pub use error::{DbError, DbResult};
pub use system::{DatabaseSystem, Dialect};
