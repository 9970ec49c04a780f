//! Connection providers.
//!
//! A [`ConnectionProvider`] produces ready-to-use connections on demand,
//! uniformly across engines and pooling disciplines. Two strategies conform
//! to the same contract:
//!
//! - [`PooledConnectionProvider`] draws every logical connection from an
//!   engine-specific pool configured once at construction.
//! - [`DirectConnectionProvider`] caches at most one physical connection,
//!   lazily opened and transparently reopened when it has gone stale. The
//!   cached connection is **not** safe for concurrent use; callers must
//!   serialize access externally.
//!
//! The transaction runner and query executor only ever see the contract,
//! which is what keeps them engine- and pool-agnostic.

use crate::config::{ConnectionParams, PoolConfig};
use crate::db::connection::{DbConnection, RawConnection};
use crate::error::{DbError, DbResult};
use crate::system::{DatabaseSystem, Dialect};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, MySqlPool, PgPool, SqlitePool};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// Acquisition discipline behind a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolingStrategy {
    Pooled,
    Direct,
}

/// Produces connections for one database target.
///
/// Exactly one `close()` call is expected over a provider's lifetime, issued
/// by whichever component constructed it.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Retrieve a usable connection. The handle releases itself when
    /// dropped; do not hold it longer than the work at hand.
    async fn connection(&self) -> DbResult<DbConnection>;

    /// Release all resources held by this provider.
    async fn close(&self) -> DbResult<()>;

    /// Log every statement on connections issued from now on. Idempotent;
    /// connections already handed out are unaffected.
    fn set_debug_mode(&self);

    /// The resolved connection URI for this target.
    fn uri(&self) -> &str;

    /// The engine descriptor backing this provider.
    fn system(&self) -> &DatabaseSystem;

    /// Which acquisition strategy this provider uses.
    fn strategy(&self) -> PoolingStrategy;

    /// Acquire and probe a connection, releasing it immediately.
    ///
    /// Used as a liveness check; the probed connection never leaks.
    async fn sanity(&self) -> DbResult<()> {
        debug!("checking database connection");
        let result = async {
            let mut connection = self.connection().await?;
            connection.ping().await
        }
        .await;
        match result {
            Ok(()) => {
                debug!("database connection check successful");
                Ok(())
            }
            Err(e) => {
                error!("database connection check failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for dyn ConnectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionProvider")
            .field("strategy", &self.strategy())
            .field("uri", &self.uri())
            .finish()
    }
}

/// State every strategy carries: descriptor, resolved URI, effective
/// credentials and the debug flag. Passed explicitly into each strategy's
/// constructor; there is no other shared state.
#[derive(Debug)]
pub(crate) struct ProviderBase {
    system: Arc<DatabaseSystem>,
    uri: String,
    login: String,
    password: String,
    debug: AtomicBool,
}

impl ProviderBase {
    /// Resolve credentials and build the connection URI.
    ///
    /// With `root` set, the elevated credential pair is required and used
    /// instead of the standard one. Any violated invariant is a fatal
    /// validation error; no partially constructed provider exists.
    pub(crate) fn new(
        system: Arc<DatabaseSystem>,
        params: &ConnectionParams,
        root: bool,
    ) -> DbResult<Self> {
        let (login, password) = if root {
            match (params.root_user(), params.root_password()) {
                (Some(user), Some(password)) => (user.to_string(), password.to_string()),
                _ => {
                    return Err(DbError::validation(
                        "root credentials are required for high-privilege access",
                    ));
                }
            }
        } else {
            (params.user().to_string(), params.password().to_string())
        };
        if login.is_empty() || password.is_empty() {
            return Err(DbError::validation("login and password cannot be empty"));
        }
        let uri = system.url(params)?;
        Ok(Self {
            system,
            uri,
            login,
            password,
            debug: AtomicBool::new(false),
        })
    }

    fn set_debug(&self) {
        self.debug.store(true, Ordering::Release);
    }

    /// Read at every acquisition so a mid-lifetime toggle only affects
    /// subsequent connections.
    fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Acquire)
    }
}

/// Engine-specific connection pool.
pub(crate) enum DbPool {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

/// Provider backed by a connection pool.
///
/// Pool tuning is applied once at construction; the pool itself connects
/// lazily, so constructing a provider never touches the network.
pub struct PooledConnectionProvider {
    base: ProviderBase,
    pool: DbPool,
}

impl PooledConnectionProvider {
    pub fn new(
        system: Arc<DatabaseSystem>,
        params: &ConnectionParams,
        root: bool,
        config: &PoolConfig,
    ) -> DbResult<Self> {
        let base = ProviderBase::new(system, params, root)?;
        let pool = match base.system.dialect() {
            Dialect::Postgres => {
                let options = PgConnectOptions::from_str(&base.uri)?
                    .username(&base.login)
                    .password(&base.password);
                DbPool::Postgres(
                    PgPoolOptions::new()
                        .max_connections(config.max_connections)
                        .min_connections(config.min_connections)
                        .idle_timeout(Some(config.idle_timeout))
                        .acquire_timeout(config.acquire_timeout)
                        .test_before_acquire(config.test_before_acquire)
                        .connect_lazy_with(options),
                )
            }
            Dialect::MySql => {
                let options = MySqlConnectOptions::from_str(&base.uri)?
                    .username(&base.login)
                    .password(&base.password);
                DbPool::MySql(
                    MySqlPoolOptions::new()
                        .max_connections(config.max_connections)
                        .min_connections(config.min_connections)
                        .idle_timeout(Some(config.idle_timeout))
                        .acquire_timeout(config.acquire_timeout)
                        .test_before_acquire(config.test_before_acquire)
                        .connect_lazy_with(options),
                )
            }
            Dialect::Sqlite => {
                let options = SqliteConnectOptions::from_str(&base.uri)?;
                DbPool::Sqlite(
                    SqlitePoolOptions::new()
                        .max_connections(config.max_connections)
                        .min_connections(config.min_connections)
                        .idle_timeout(Some(config.idle_timeout))
                        .acquire_timeout(config.acquire_timeout)
                        .test_before_acquire(config.test_before_acquire)
                        .connect_lazy_with(options),
                )
            }
        };
        info!(
            system = %base.system.driver(),
            uri = %base.uri,
            max_connections = config.max_connections,
            "Created pooled connection provider"
        );
        Ok(Self { base, pool })
    }
}

#[async_trait]
impl ConnectionProvider for PooledConnectionProvider {
    async fn connection(&self) -> DbResult<DbConnection> {
        let debug = self.base.debug_enabled();
        let raw = match &self.pool {
            DbPool::Postgres(pool) => RawConnection::PostgresPooled(pool.acquire().await?),
            DbPool::MySql(pool) => RawConnection::MySqlPooled(pool.acquire().await?),
            DbPool::Sqlite(pool) => RawConnection::SqlitePooled(pool.acquire().await?),
        };
        Ok(DbConnection::pooled(raw, debug))
    }

    async fn close(&self) -> DbResult<()> {
        match &self.pool {
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Sqlite(pool) => pool.close().await,
        }
        info!(uri = %self.base.uri, "Connection pool shut down");
        Ok(())
    }

    fn set_debug_mode(&self) {
        self.base.set_debug();
    }

    fn uri(&self) -> &str {
        &self.base.uri
    }

    fn system(&self) -> &DatabaseSystem {
        &self.base.system
    }

    fn strategy(&self) -> PoolingStrategy {
        PoolingStrategy::Pooled
    }
}

/// Provider holding at most one cached physical connection.
///
/// The connection is opened on first request and reused by subsequent
/// requests; a stale connection is reopened transparently. This is a
/// single-connection cache, not a pool.
pub struct DirectConnectionProvider {
    base: ProviderBase,
    slot: Arc<Mutex<Option<RawConnection>>>,
}

impl DirectConnectionProvider {
    pub fn new(system: Arc<DatabaseSystem>, params: &ConnectionParams, root: bool) -> DbResult<Self> {
        let base = ProviderBase::new(system, params, root)?;
        info!(system = %base.system.driver(), uri = %base.uri, "Using no connection pool");
        Ok(Self {
            base,
            slot: Arc::new(Mutex::new(None)),
        })
    }

    async fn open(&self) -> DbResult<RawConnection> {
        match self.base.system.dialect() {
            Dialect::Postgres => {
                let options = PgConnectOptions::from_str(&self.base.uri)?
                    .username(&self.base.login)
                    .password(&self.base.password);
                Ok(RawConnection::Postgres(options.connect().await?))
            }
            Dialect::MySql => {
                let options = MySqlConnectOptions::from_str(&self.base.uri)?
                    .username(&self.base.login)
                    .password(&self.base.password);
                Ok(RawConnection::MySql(options.connect().await?))
            }
            Dialect::Sqlite => {
                let options = SqliteConnectOptions::from_str(&self.base.uri)?;
                Ok(RawConnection::Sqlite(options.connect().await?))
            }
        }
    }
}

#[async_trait]
impl ConnectionProvider for DirectConnectionProvider {
    async fn connection(&self) -> DbResult<DbConnection> {
        let debug = self.base.debug_enabled();
        let cached = self.slot.lock().unwrap().take();
        let conn = match cached {
            Some(mut conn) => {
                if conn.ping().await.is_ok() {
                    conn
                } else {
                    debug!(uri = %self.base.uri, "cached connection is stale, reopening");
                    self.open().await?
                }
            }
            None => self.open().await?,
        };
        Ok(DbConnection::cached(conn, Arc::clone(&self.slot), debug))
    }

    async fn close(&self) -> DbResult<()> {
        let cached = self.slot.lock().unwrap().take();
        let Some(conn) = cached else {
            return Ok(());
        };
        match conn.close().await {
            Ok(()) => {
                info!(uri = %self.base.uri, "Cached connection closed");
                Ok(())
            }
            // In-memory engines tear the database down with the last
            // connection; a failure here is their normal goodbye.
            Err(e) if self.base.system.ephemeral() => {
                debug!(error = %e, "expected close failure while dropping in-memory database");
                Ok(())
            }
            Err(e) => Err(DbError::close(e.to_string())),
        }
    }

    fn set_debug_mode(&self) {
        self.base.set_debug();
    }

    fn uri(&self) -> &str {
        &self.base.uri
    }

    fn system(&self) -> &DatabaseSystem {
        &self.base.system
    }

    fn strategy(&self) -> PoolingStrategy {
        PoolingStrategy::Direct
    }
}
