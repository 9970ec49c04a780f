//! Schema migration boundary.
//!
//! The migration tool itself is an external concern; this module wraps it
//! behind [`SchemaUpdater`] so callers apply pending migrations through a
//! provider's scoped connection and observe a single error kind on failure.

use crate::db::connection::ConnMut;
use crate::db::provider::ConnectionProvider;
use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use std::path::Path;
use tracing::info;

/// Applies pending schema migrations over a provider's connection.
#[async_trait]
pub trait SchemaUpdater: Send + Sync {
    /// Bring the target database up to date. Any migration failure surfaces
    /// as [`DbError::Update`].
    async fn update(&self, provider: &dyn ConnectionProvider) -> DbResult<()>;
}

/// Updater backed by a directory of versioned migration files.
#[derive(Debug)]
pub struct MigrationUpdater {
    migrator: Migrator,
}

impl MigrationUpdater {
    /// Load the migration set from a directory.
    pub async fn from_path(path: impl AsRef<Path>) -> DbResult<Self> {
        let migrator = Migrator::new(path.as_ref())
            .await
            .map_err(|e| DbError::update(e.to_string()))?;
        Ok(Self { migrator })
    }

    /// Number of migrations in the loaded set.
    pub fn migration_count(&self) -> usize {
        self.migrator.iter().count()
    }
}

#[async_trait]
impl SchemaUpdater for MigrationUpdater {
    async fn update(&self, provider: &dyn ConnectionProvider) -> DbResult<()> {
        info!("Updating database schema");
        let mut connection = provider.connection().await?;
        match connection.raw_mut().as_mut() {
            // `run_direct` sidesteps the "`Acquire` is not general enough"
            // HRTB error that `run` triggers inside the boxed async-trait
            // future; both apply the same pending migrations.
            ConnMut::Postgres(c) => self.migrator.run_direct(c).await,
            ConnMut::MySql(c) => self.migrator.run_direct(c).await,
            ConnMut::Sqlite(c) => self.migrator.run_direct(c).await,
        }
        .map_err(|e| DbError::update(e.to_string()))?;
        info!("Database schema up to date");
        Ok(())
    }
}
