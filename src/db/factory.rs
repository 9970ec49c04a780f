//! Provider factory.
//!
//! Maps a logical system key ("postgres", "sqlite-memory", ...) to an engine
//! descriptor and produces the matching provider strategy. The factory is an
//! explicit registry object: build one at process start and pass it around;
//! there is no global instance.

use crate::config::{ConnectionParams, PoolConfig};
use crate::db::provider::{ConnectionProvider, DirectConnectionProvider, PooledConnectionProvider};
use crate::error::{DbError, DbResult};
use crate::system::DatabaseSystem;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of engine descriptors plus the pool tuning handed to pooled
/// providers.
pub struct ProviderFactory {
    systems: HashMap<String, Arc<DatabaseSystem>>,
    pool_config: PoolConfig,
}

impl ProviderFactory {
    /// Create a factory with the built-in systems registered:
    /// `postgres`, `mysql`, `sqlite-file`, `sqlite-memory`.
    pub fn new() -> Self {
        let mut factory = Self::empty();
        factory.add_system("postgres", DatabaseSystem::postgres());
        factory.add_system("mysql", DatabaseSystem::mysql());
        factory.add_system("sqlite-file", DatabaseSystem::sqlite_file());
        factory.add_system("sqlite-memory", DatabaseSystem::sqlite_memory());
        factory
    }

    /// Create a factory with no systems registered.
    pub fn empty() -> Self {
        Self {
            systems: HashMap::new(),
            pool_config: PoolConfig::default(),
        }
    }

    /// Replace the tuning applied to pooled providers created from now on.
    pub fn set_pool_config(&mut self, config: PoolConfig) {
        self.pool_config = config;
    }

    /// Register a descriptor under a key. Last write wins.
    pub fn add_system(&mut self, key: impl Into<String>, system: DatabaseSystem) {
        let key = key.into();
        debug!(system = %key, "Registered database system");
        self.systems.insert(key, Arc::new(system));
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Build a provider for the target with standard credentials.
    ///
    /// The strategy is chosen by the descriptor's pooling requirement. An
    /// unregistered system key is always an error, never a silent default.
    pub fn create(&self, params: &ConnectionParams) -> DbResult<Box<dyn ConnectionProvider>> {
        self.build(params, false)
    }

    /// Build a provider for the target with the elevated credential pair,
    /// for privileged operations such as initial database creation.
    pub fn create_with_high_privilege(
        &self,
        params: &ConnectionParams,
    ) -> DbResult<Box<dyn ConnectionProvider>> {
        self.build(params, true)
    }

    fn build(&self, params: &ConnectionParams, root: bool) -> DbResult<Box<dyn ConnectionProvider>> {
        let system = self
            .systems
            .get(params.system())
            .cloned()
            .ok_or_else(|| DbError::unknown_system(params.system()))?;
        info!(
            system = %params.system(),
            database = %params.database(),
            pooled = system.requires_pool(),
            high_privilege = root,
            "Creating connection provider"
        );
        if system.requires_pool() {
            Ok(Box::new(PooledConnectionProvider::new(
                system,
                params,
                root,
                &self.pool_config,
            )?))
        } else {
            Ok(Box::new(DirectConnectionProvider::new(system, params, root)?))
        }
    }
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::provider::PoolingStrategy;
    use crate::system::Dialect;

    fn params(system: &str) -> ConnectionParams {
        ConnectionParams::new(system, "localhost", 5432, "testdb", "sa", "sa").unwrap()
    }

    #[test]
    fn test_builtin_systems_registered() {
        let factory = ProviderFactory::new();
        assert_eq!(factory.system_count(), 4);
        assert!(factory.create(&params("postgres")).is_ok());
        assert!(factory.create(&params("sqlite-memory")).is_ok());
    }

    #[test]
    fn test_unknown_system_is_an_error() {
        let factory = ProviderFactory::new();
        let err = factory.create(&params("unknown")).unwrap_err();
        match err {
            DbError::UnknownSystem { key } => assert_eq!(key, "unknown"),
            other => panic!("expected unknown-system error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_factory_knows_nothing() {
        let factory = ProviderFactory::empty();
        assert_eq!(factory.system_count(), 0);
        assert!(factory.create(&params("postgres")).is_err());
    }

    #[test]
    fn test_strategy_follows_pool_requirement() {
        let factory = ProviderFactory::new();
        let pooled = factory.create(&params("postgres")).unwrap();
        assert_eq!(pooled.strategy(), PoolingStrategy::Pooled);
        let direct = factory.create(&params("sqlite-memory")).unwrap();
        assert_eq!(direct.strategy(), PoolingStrategy::Direct);
    }

    #[test]
    fn test_uri_substitution_through_factory() {
        let factory = ProviderFactory::new();
        let provider = factory.create(&params("postgres")).unwrap();
        assert_eq!(provider.uri(), "postgres://localhost:5432/testdb");
    }

    #[test]
    fn test_last_registration_wins() {
        let mut factory = ProviderFactory::new();
        factory.add_system(
            "postgres",
            DatabaseSystem::new("custom", Dialect::Sqlite, false, false, "sqlite://${0}.db"),
        );
        let provider = factory.create(&params("postgres")).unwrap();
        assert_eq!(provider.strategy(), PoolingStrategy::Direct);
        assert_eq!(provider.system().driver(), "custom");
    }

    #[test]
    fn test_high_privilege_requires_root_credentials() {
        let factory = ProviderFactory::new();
        let err = factory
            .create_with_high_privilege(&params("sqlite-memory"))
            .unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));

        let with_root = params("sqlite-memory").with_root_credentials("root", "root");
        assert!(factory.create_with_high_privilege(&with_root).is_ok());
    }
}
