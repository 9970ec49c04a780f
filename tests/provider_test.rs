//! Integration tests for the provider factory and both provider strategies,
//! exercised against real SQLite engines.

use sqlbridge::{
    ConnectionParams, ConnectionProvider, DatabaseSystem, DbError, Dialect, PoolConfig,
    PoolingStrategy, ProviderFactory, SqlParam,
};

fn memory_params(db: &str) -> ConnectionParams {
    ConnectionParams::new("sqlite-memory", "localhost", 0, db, "sa", "sa").unwrap()
}

#[tokio::test]
async fn factory_creates_working_direct_provider() {
    let factory = ProviderFactory::new();
    let provider = factory.create(&memory_params("itest_direct")).unwrap();

    assert_eq!(provider.strategy(), PoolingStrategy::Direct);
    assert!(provider.uri().contains("itest_direct"));
    provider.sanity().await.unwrap();
    provider.close().await.unwrap();
}

#[tokio::test]
async fn unknown_system_reports_error() {
    let factory = ProviderFactory::new();
    let params = ConnectionParams::new("unknown", "localhost", 0, "db", "sa", "sa").unwrap();
    let err = factory.create(&params).unwrap_err();
    match err {
        DbError::UnknownSystem { key } => assert_eq!(key, "unknown"),
        other => panic!("expected unknown-system error, got {other:?}"),
    }
}

#[tokio::test]
async fn direct_provider_keeps_memory_database_alive_between_acquisitions() {
    let factory = ProviderFactory::new();
    let provider = factory.create(&memory_params("itest_cache")).unwrap();

    {
        let mut c = provider.connection().await.unwrap();
        c.execute("CREATE TABLE notes (body TEXT)").await.unwrap();
        c.execute_with("INSERT INTO notes (body) VALUES (?)", &[SqlParam::from("kept")])
            .await
            .unwrap();
    }

    // The cached physical connection survived the handle drop, so the
    // in-memory database did too.
    let mut c = provider.connection().await.unwrap();
    assert_eq!(c.dialect(), Dialect::Sqlite);
    let rows = c.fetch_all("SELECT body FROM notes", &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), 1);
    assert_eq!(rows[0].get_string(0).unwrap(), "kept");
    assert_eq!(rows[0].get_string("body").unwrap(), "kept");
    drop(c);

    provider.close().await.unwrap();
}

#[tokio::test]
async fn direct_provider_recreates_connection_after_close() {
    let factory = ProviderFactory::new();
    let provider = factory.create(&memory_params("itest_reopen")).unwrap();

    provider.sanity().await.unwrap();
    provider.close().await.unwrap();

    // A fresh connection is opened transparently on the next request.
    let mut c = provider.connection().await.unwrap();
    c.execute("CREATE TABLE again (id INTEGER)").await.unwrap();
    drop(c);
    provider.close().await.unwrap();
}

#[tokio::test]
async fn pooled_provider_round_trip_on_shared_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut factory = ProviderFactory::new();
    factory.set_pool_config(PoolConfig {
        max_connections: 2,
        ..PoolConfig::default()
    });
    factory.add_system(
        "sqlite-pooled",
        DatabaseSystem::new(
            "sqlite",
            Dialect::Sqlite,
            true,
            false,
            "sqlite://${1}/${0}.db?mode=rwc",
        ),
    );
    let params = ConnectionParams::new(
        "sqlite-pooled",
        dir.path().to_str().unwrap(),
        0,
        "pooltest",
        "sa",
        "sa",
    )
    .unwrap();
    let provider = factory.create(&params).unwrap();
    assert_eq!(provider.strategy(), PoolingStrategy::Pooled);
    provider.sanity().await.unwrap();

    {
        let mut c = provider.connection().await.unwrap();
        c.execute("CREATE TABLE IF NOT EXISTS p (id INTEGER)")
            .await
            .unwrap();
        c.execute_with("INSERT INTO p (id) VALUES (?)", &[SqlParam::Int(7)])
            .await
            .unwrap();
    }

    // A second logical connection from the pool sees the same database.
    let mut c = provider.connection().await.unwrap();
    let rows = c.fetch_all("SELECT id FROM p", &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_i64("id").unwrap(), 7);
    drop(c);

    provider.close().await.unwrap();
}

#[tokio::test]
async fn debug_mode_only_stamps_later_connections() {
    let factory = ProviderFactory::new();
    let provider = factory.create(&memory_params("itest_debug")).unwrap();

    let plain = provider.connection().await.unwrap();
    assert!(!plain.is_debug());
    drop(plain);

    provider.set_debug_mode();
    provider.set_debug_mode(); // idempotent

    let mut logged = provider.connection().await.unwrap();
    assert!(logged.is_debug());
    logged.execute("CREATE TABLE d (id INTEGER)").await.unwrap();
    drop(logged);

    provider.close().await.unwrap();
}

#[tokio::test]
async fn sanity_fails_for_unreachable_target() {
    let mut factory = ProviderFactory::new();
    factory.add_system(
        "sqlite-ro",
        DatabaseSystem::new(
            "sqlite",
            Dialect::Sqlite,
            false,
            false,
            "sqlite:///no-such-dir/${0}.db?mode=ro",
        ),
    );
    let params = ConnectionParams::new("sqlite-ro", "localhost", 0, "ghost", "sa", "sa").unwrap();
    let provider = factory.create(&params).unwrap();
    assert!(provider.sanity().await.is_err());
}
