//! Engine descriptors.
//!
//! A [`DatabaseSystem`] describes one supported RDBMS: its driver identity,
//! dialect, whether acquisition must go through a pool, and a templated
//! connection-string builder. Descriptors are built once at process start,
//! registered in a [`crate::db::factory::ProviderFactory`], and shared
//! read-only by every provider referencing them.

use crate::config::ConnectionParams;
use crate::error::{DbError, DbResult};

/// Supported call-level engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    /// Includes MariaDB
    MySql,
    Sqlite,
}

impl Dialect {
    /// Get the display name for this dialect.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::Sqlite => "SQLite",
        }
    }

    /// Get the default port for this dialect.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Postgres => Some(5432),
            Self::MySql => Some(3306),
            Self::Sqlite => None,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Static metadata for one supported RDBMS.
///
/// The URL template uses positional placeholders substituted from the
/// connection parameters: `${0}` database name, `${1}` host, `${2}` port,
/// `${3}` user.
#[derive(Debug, Clone)]
pub struct DatabaseSystem {
    driver: String,
    dialect: Dialect,
    requires_pool: bool,
    /// In-memory engine: data lives only as long as its connection, and a
    /// close-time failure is the engine's normal teardown signature.
    ephemeral: bool,
    url_template: String,
}

impl DatabaseSystem {
    /// Describe a custom engine.
    pub fn new(
        driver: impl Into<String>,
        dialect: Dialect,
        requires_pool: bool,
        ephemeral: bool,
        url_template: impl Into<String>,
    ) -> Self {
        Self {
            driver: driver.into(),
            dialect,
            requires_pool,
            ephemeral,
            url_template: url_template.into(),
        }
    }

    /// Networked PostgreSQL server, pooled.
    pub fn postgres() -> Self {
        Self::new(
            "postgres",
            Dialect::Postgres,
            true,
            false,
            "postgres://${1}:${2}/${0}",
        )
    }

    /// Networked MySQL server, pooled.
    pub fn mysql() -> Self {
        Self::new("mysql", Dialect::MySql, true, false, "mysql://${1}:${2}/${0}")
    }

    /// Embedded SQLite database file, direct (no pool).
    pub fn sqlite_file() -> Self {
        Self::new(
            "sqlite",
            Dialect::Sqlite,
            false,
            false,
            "sqlite://${0}.db?mode=rwc",
        )
    }

    /// Embedded in-memory SQLite database, direct (no pool).
    ///
    /// The database exists only while its cached connection is open; closing
    /// the provider drops it.
    pub fn sqlite_memory() -> Self {
        Self::new(
            "sqlite",
            Dialect::Sqlite,
            false,
            true,
            "sqlite://${0}?mode=memory&cache=shared",
        )
    }

    /// The driver identity string.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Whether acquisition for this engine must go through a pool.
    pub fn requires_pool(&self) -> bool {
        self.requires_pool
    }

    /// Whether this engine is in-memory with drop-on-close semantics.
    pub fn ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Build the connection URI for a target by substituting the parameters
    /// into the template.
    ///
    /// Fails with a validation error when the result is empty or a
    /// placeholder is left unresolved.
    pub fn url(&self, params: &ConnectionParams) -> DbResult<String> {
        let port = params.port().to_string();
        let values = [params.database(), params.host(), port.as_str(), params.user()];
        let mut url = self.url_template.clone();
        for (i, value) in values.iter().enumerate() {
            url = url.replace(&format!("${{{}}}", i), value);
        }
        if url.is_empty() {
            return Err(DbError::validation("resolved connection URI is empty"));
        }
        if url.contains("${") {
            return Err(DbError::validation(format!(
                "connection URI template has unresolved placeholders: {}",
                url
            )));
        }
        Ok(url)
    }
}
