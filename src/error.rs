//! Error types for the connection layer.
//!
//! This module defines all error types using `thiserror` for ergonomic error
//! handling. Every failure coming out of the underlying driver is converted
//! into a [`DbError`] at this boundary; no `sqlx` error type crosses the
//! public API.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Invalid or missing connection parameters, detected at construction.
    /// Never retried; no partially valid object is returned.
    #[error("Invalid configuration: {message}")]
    Validation { message: String },

    /// No engine descriptor is registered under the requested system key.
    #[error("Unknown database system: {key}")]
    UnknownSystem { key: String },

    /// Failed to acquire or use a connection. Recoverable by the caller.
    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// Failed to release resources held by a provider.
    #[error("Close failed: {message}")]
    Close { message: String },

    /// A statement failed to prepare, execute or decode.
    #[error("Query failed: {message}")]
    Query {
        message: String,
        /// e.g. "42P01" for undefined table
        sql_state: Option<String>,
    },

    /// Schema bootstrap (create/drop table) failed. Not recoverable inline.
    #[error("Schema bootstrap failed: {message}")]
    State { message: String },

    /// The schema migration boundary reported a failure.
    #[error("Schema update failed: {message}")]
    Update { message: String },
}

impl DbError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an unknown-system error.
    pub fn unknown_system(key: impl Into<String>) -> Self {
        Self::UnknownSystem { key: key.into() }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a close error.
    pub fn close(message: impl Into<String>) -> Self {
        Self::Close {
            message: message.into(),
        }
    }

    /// Create a query error with optional SQL state.
    pub fn query(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a fatal schema bootstrap error.
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a schema update error.
    pub fn update(message: impl Into<String>) -> Self {
        Self::Update {
            message: message.into(),
        }
    }

    /// Check if this error is worth retrying from the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::query(db_err.message().to_string(), code)
            }
            sqlx::Error::RowNotFound => DbError::query("No rows returned", None),
            sqlx::Error::PoolTimedOut => {
                DbError::connection("Timed out waiting for a pooled connection")
            }
            sqlx::Error::PoolClosed => DbError::connection("Connection pool is closed"),
            sqlx::Error::Io(io_err) => DbError::connection(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => DbError::connection(format!("TLS error: {}", tls_err)),
            sqlx::Error::Protocol(msg) => DbError::connection(format!("Protocol error: {}", msg)),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::query(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::query(
                format!("Column index {} out of bounds (len: {})", index, len),
                None,
            ),
            sqlx::Error::ColumnDecode { index, source } => DbError::query(
                format!("Failed to decode column {}: {}", index, source),
                None,
            ),
            sqlx::Error::Decode(source) => {
                DbError::query(format!("Decode error: {}", source), None)
            }
            sqlx::Error::Migrate(e) => DbError::update(e.to_string()),
            sqlx::Error::WorkerCrashed => DbError::connection("Database worker crashed"),
            _ => DbError::query(format!("Unknown database error: {}", err), None),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
