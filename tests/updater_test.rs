//! Integration tests for the schema migration boundary.

use sqlbridge::{
    ConnectionParams, ConnectionProvider, MigrationUpdater, ProviderFactory, QueryExecutor,
    SchemaUpdater,
};
use std::fs;

fn provider(db: &str) -> Box<dyn ConnectionProvider> {
    let factory = ProviderFactory::new();
    let params = ConnectionParams::new("sqlite-memory", "localhost", 0, db, "sa", "sa").unwrap();
    factory.create(&params).unwrap()
}

fn write_migrations(dir: &std::path::Path) {
    fs::write(
        dir.join("0001_create_settings.sql"),
        "CREATE TABLE settings (key TEXT NOT NULL, value TEXT NOT NULL);\n",
    )
    .unwrap();
    fs::write(
        dir.join("0002_seed_settings.sql"),
        "INSERT INTO settings (key, value) VALUES ('version', '2');\n",
    )
    .unwrap();
}

#[tokio::test]
async fn migrations_apply_over_a_provider_connection() {
    let dir = tempfile::tempdir().unwrap();
    write_migrations(dir.path());

    let updater = MigrationUpdater::from_path(dir.path()).await.unwrap();
    assert_eq!(updater.migration_count(), 2);

    let provider = provider("updater_apply");
    updater.update(provider.as_ref()).await.unwrap();

    let values = QueryExecutor::new(provider.as_ref())
        .select("SELECT value FROM settings WHERE key = 'version'", |row| {
            row.get_string(0)
        })
        .await
        .unwrap();
    assert_eq!(values, vec!["2"]);
    provider.close().await.unwrap();
}

#[tokio::test]
async fn reapplying_migrations_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    write_migrations(dir.path());

    let updater = MigrationUpdater::from_path(dir.path()).await.unwrap();
    let provider = provider("updater_rerun");
    updater.update(provider.as_ref()).await.unwrap();
    updater.update(provider.as_ref()).await.unwrap();

    let count = QueryExecutor::new(provider.as_ref())
        .select("SELECT COUNT(*) FROM settings", |row| row.get_i64(0))
        .await
        .unwrap();
    assert_eq!(count, vec![1]);
    provider.close().await.unwrap();
}

#[tokio::test]
async fn missing_migration_directory_is_an_update_error() {
    let err = MigrationUpdater::from_path("/no-such-migrations-dir")
        .await
        .unwrap_err();
    assert!(matches!(err, sqlbridge::DbError::Update { .. }));
}
