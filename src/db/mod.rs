//! Database abstraction layer.
//!
//! This module provides the connection machinery:
//! - Provider contract and pooled/direct strategies
//! - Provider factory keyed by logical system
//! - Uniform connection handle and row access
//! - Transactional unit-of-work execution
//! - Query execution and schema bootstrap
//! - Schema migration boundary

pub mod connection;
pub mod executor;
pub mod factory;
pub mod params;
pub mod provider;
pub mod schema;
pub mod transaction;
pub mod updater;

pub use connection::{DbConnection, SqlRow};
pub use executor::QueryExecutor;
pub use factory::ProviderFactory;
pub use params::SqlParam;
pub use provider::{
    ConnectionProvider, DirectConnectionProvider, PooledConnectionProvider, PoolingStrategy,
};
pub use schema::{ColumnType, TableSchema, TableSchemaColumn};
pub use transaction::Transaction;
pub use updater::{MigrationUpdater, SchemaUpdater};
