//! SQLite driver implementation

use async_trait::async_trait;
use sweetdb_core::{ConnectionConfig, DatabaseDriver, Dialect, Result, Session};

use crate::{SqliteOptions, SqliteSession};

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["sqlite", "sqlite3"]
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    #[tracing::instrument(skip(self, config), fields(path = config.get_string("path").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>> {
        let path = config
            .get_string("path")
            .unwrap_or_else(|| ":memory:".to_string());
        let options = SqliteOptions::from_config(config)?;

        let session = SqliteSession::open_with(&path, &options).map_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQLite database");
            e
        })?;

        tracing::info!(path = %session.path(), "SQLite connection created");
        Ok(Box::new(session))
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let path = config
            .get_string("path")
            .unwrap_or_else(|| ":memory:".to_string());
        format!("sqlite:{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connects_to_memory_by_default() {
        let driver = SqliteDriver::new();
        let session = driver.connect(&ConnectionConfig::new("sqlite")).await.unwrap();
        assert_eq!(session.driver_name(), "sqlite");
        assert_eq!(session.dialect(), Dialect::Sqlite);
        assert!(!session.is_closed());
    }

    #[test]
    fn connection_string_uses_dsn_form() {
        let driver = SqliteDriver::new();
        let config = ConnectionConfig::new_sqlite("/tmp/app.db");
        assert_eq!(driver.build_connection_string(&config), "sqlite:/tmp/app.db");
    }
}
