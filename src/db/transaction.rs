//! Transactional execution of a unit of work.
//!
//! [`Transaction`] runs a caller-supplied work function under explicit
//! commit/rollback control, regardless of which provider strategy is behind
//! the connection.
//!
//! Failures raised by the work function are **contained here**: they trigger
//! a rollback and a log record, and do not propagate to the caller. Callers
//! that need failure visibility must convey it through state of their own
//! (e.g. a channel or a captured flag); this runner reports completion, not
//! outcome.

use crate::db::connection::DbConnection;
use crate::db::provider::ConnectionProvider;
use crate::error::DbResult;
use futures_util::future::BoxFuture;
use tracing::{debug, error};

/// A transactional database operation bound to a provider.
pub struct Transaction<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> Transaction<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Run the work function inside a transaction.
    ///
    /// A connection is acquired for the duration of the call and released in
    /// all cases. The work runs with auto-commit disabled; if it returns an
    /// error, the transaction is rolled back and the error is logged and
    /// swallowed, otherwise it is committed. Auto-commit is the connection's
    /// resting state again once commit or rollback has completed.
    ///
    /// This is a one-shot execution: no retry is attempted on failure.
    pub async fn execute<F>(&self, work: F)
    where
        F: for<'c> FnOnce(&'c mut DbConnection) -> BoxFuture<'c, DbResult<()>> + Send,
    {
        let id = format!("tx_{}", uuid::Uuid::new_v4().simple());
        let mut connection = match self.provider.connection().await {
            Ok(connection) => connection,
            Err(e) => {
                error!(transaction_id = %id, error = %e, "Could not acquire connection for transaction");
                return;
            }
        };
        debug!(transaction_id = %id, "Starting transaction");
        if let Err(e) = connection.begin().await {
            error!(transaction_id = %id, error = %e, "Could not start transaction");
            return;
        }
        match work(&mut connection).await {
            Ok(()) => {
                if let Err(e) = connection.commit().await {
                    error!(transaction_id = %id, error = %e, "Commit failed");
                    return;
                }
                debug!(transaction_id = %id, "Transaction complete");
            }
            Err(e) => {
                error!(transaction_id = %id, error = %e, "Error in transaction, rolling back");
                if let Err(e) = connection.rollback().await {
                    error!(transaction_id = %id, error = %e, "Rollback failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionParams;
    use crate::db::provider::DirectConnectionProvider;
    use crate::error::DbError;
    use crate::system::DatabaseSystem;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn provider(db: &str) -> DirectConnectionProvider {
        let params = ConnectionParams::new("sqlite-memory", "localhost", 0, db, "sa", "sa").unwrap();
        DirectConnectionProvider::new(Arc::new(DatabaseSystem::sqlite_memory()), &params, false)
            .unwrap()
    }

    #[tokio::test]
    async fn test_committed_work_is_visible() {
        let provider = provider("txcommit");
        {
            let mut c = provider.connection().await.unwrap();
            c.execute("CREATE TABLE t (id INTEGER)").await.unwrap();
        }
        Transaction::new(&provider)
            .execute(|c| {
                Box::pin(async move {
                    c.execute("INSERT INTO t (id) VALUES (1)").await?;
                    c.execute("INSERT INTO t (id) VALUES (2)").await?;
                    Ok(())
                })
            })
            .await;
        let mut c = provider.connection().await.unwrap();
        let rows = c.fetch_all("SELECT COUNT(*) FROM t", &[]).await.unwrap();
        assert_eq!(rows[0].get_i64(0).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failing_work_is_rolled_back_and_swallowed() {
        let provider = provider("txrollback");
        {
            let mut c = provider.connection().await.unwrap();
            c.execute("CREATE TABLE t (id INTEGER)").await.unwrap();
        }
        // Returns normally even though the work failed.
        Transaction::new(&provider)
            .execute(|c| {
                Box::pin(async move {
                    c.execute("INSERT INTO t (id) VALUES (1)").await?;
                    Err(DbError::query("boom", None))
                })
            })
            .await;
        let mut c = provider.connection().await.unwrap();
        let rows = c.fetch_all("SELECT COUNT(*) FROM t", &[]).await.unwrap();
        assert_eq!(rows[0].get_i64(0).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_acquisition_failure_is_absorbed() {
        let params =
            ConnectionParams::new("sqlite-file", "localhost", 0, "missing", "sa", "sa").unwrap();
        let system = DatabaseSystem::new(
            "sqlite",
            crate::system::Dialect::Sqlite,
            false,
            false,
            "sqlite:///nonexistent-dir/${0}.db?mode=ro",
        );
        let provider =
            DirectConnectionProvider::new(Arc::new(system), &params, false).unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&ran);
        Transaction::new(&provider)
            .execute(move |_| {
                Box::pin(async move {
                    observed.store(true, Ordering::SeqCst);
                    Ok(())
                })
            })
            .await;
        assert!(!ran.load(Ordering::SeqCst));
    }
}
