//! Configuration for database targets.
//!
//! This module provides the validated connection parameters consumed by
//! providers, plus the tuning knobs applied to pooled providers at
//! construction time. Parameters are immutable once built; a failed
//! validation never yields a usable object.

use crate::error::{DbError, DbResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Property key for the application user.
pub const KEY_USER: &str = "database.user";
/// Property key for the application password.
pub const KEY_PASSWORD: &str = "database.password";
/// Property key for the elevated user.
pub const KEY_ROOT_USER: &str = "database.root.user";
/// Property key for the elevated password.
pub const KEY_ROOT_PASSWORD: &str = "database.root.password";
/// Property key for the database name.
pub const KEY_NAME: &str = "database.name";
/// Property key for the database host.
pub const KEY_HOST: &str = "database.host";
/// Property key for the database port.
pub const KEY_PORT: &str = "database.port";
/// Property key for the logical system.
pub const KEY_SYSTEM: &str = "database.system";

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Validated connection target: credentials, host and logical system key.
///
/// The optional root credential pair is only consulted when a provider is
/// built through the high-privilege factory path, e.g. for initial database
/// creation.
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawConnectionParams")]
pub struct ConnectionParams {
    user: String,
    password: String,
    root_user: Option<String>,
    root_password: Option<String>,
    host: String,
    port: u16,
    database: String,
    system: String,
}

/// Unvalidated mirror of [`ConnectionParams`] used as the serde entry point.
#[derive(Deserialize)]
struct RawConnectionParams {
    user: String,
    password: String,
    #[serde(default)]
    root_user: Option<String>,
    #[serde(default)]
    root_password: Option<String>,
    host: String,
    port: u16,
    database: String,
    system: String,
}

impl TryFrom<RawConnectionParams> for ConnectionParams {
    type Error = DbError;

    fn try_from(raw: RawConnectionParams) -> DbResult<Self> {
        let mut params = ConnectionParams::new(
            raw.system,
            raw.host,
            raw.port,
            raw.database,
            raw.user,
            raw.password,
        )?;
        if let (Some(user), Some(password)) = (raw.root_user, raw.root_password) {
            params = params.with_root_credentials(user, password);
        }
        Ok(params)
    }
}

impl ConnectionParams {
    /// Create validated parameters for a database target.
    ///
    /// Fails with [`DbError::Validation`] when any of system, host, database,
    /// user or password is empty.
    pub fn new(
        system: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> DbResult<Self> {
        let params = Self {
            user: user.into(),
            password: password.into(),
            root_user: None,
            root_password: None,
            host: host.into(),
            port,
            database: database.into(),
            system: system.into(),
        };
        params.check()?;
        Ok(params)
    }

    /// Attach an elevated credential pair for privileged operations.
    pub fn with_root_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.root_user = Some(user.into());
        self.root_password = Some(password.into());
        self
    }

    /// Build parameters from a `database.*` property map.
    ///
    /// Expected keys: `database.user`, `database.password`,
    /// `database.root.user`, `database.root.password` (both optional),
    /// `database.name`, `database.host`, `database.port`, `database.system`.
    pub fn from_properties(properties: &HashMap<String, String>) -> DbResult<Self> {
        let get = |key: &str| -> DbResult<String> {
            properties
                .get(key)
                .cloned()
                .ok_or_else(|| DbError::validation(format!("{} is missing", key)))
        };
        let port_raw = get(KEY_PORT)?;
        let port: u16 = port_raw
            .parse()
            .map_err(|_| DbError::validation(format!("{} is not a valid port: {}", KEY_PORT, port_raw)))?;
        let mut params = Self::new(
            get(KEY_SYSTEM)?,
            get(KEY_HOST)?,
            port,
            get(KEY_NAME)?,
            get(KEY_USER)?,
            get(KEY_PASSWORD)?,
        )?;
        if let (Some(root_user), Some(root_password)) = (
            properties.get(KEY_ROOT_USER),
            properties.get(KEY_ROOT_PASSWORD),
        ) {
            params = params.with_root_credentials(root_user.clone(), root_password.clone());
        }
        Ok(params)
    }

    fn check(&self) -> DbResult<()> {
        let required = [
            ("user", &self.user),
            ("password", &self.password),
            ("host", &self.host),
            ("database", &self.database),
            ("system", &self.system),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(DbError::validation(format!("{} cannot be empty", name)));
            }
        }
        Ok(())
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn root_user(&self) -> Option<&str> {
        self.root_user.as_deref()
    }

    pub fn root_password(&self) -> Option<&str> {
        self.root_password.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// The logical system key resolved by the provider factory.
    pub fn system(&self) -> &str {
        &self.system
    }
}

/// Passwords never land in logs.
impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("user", &self.user)
            .field("password", &"****")
            .field("root_user", &self.root_user)
            .field("root_password", &self.root_password.as_ref().map(|_| "****"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("system", &self.system)
            .finish()
    }
}

/// Tuning applied once when a pooled provider is constructed.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum connections kept by the pool.
    pub max_connections: u32,
    /// Minimum connections kept warm.
    pub min_connections: u32,
    /// Idle timeout before a pooled connection is reaped.
    pub idle_timeout: Duration,
    /// How long an acquire may wait before failing.
    pub acquire_timeout: Duration,
    /// Whether connections are checked before being handed out.
    pub test_before_acquire: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            test_before_acquire: true,
        }
    }
}
