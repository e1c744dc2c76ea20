//! MySQL driver implementation

use async_trait::async_trait;
use sweetdb_core::{ConnectionConfig, DatabaseDriver, Dialect, Result, Session};

use crate::{MySqlOptions, MySqlSession};

const DEFAULT_PORT: u16 = 3306;

/// MySQL database driver
pub struct MySqlDriver;

impl MySqlDriver {
    /// Create a new MySQL driver instance
    pub fn new() -> Self {
        tracing::debug!("MySQL driver initialized");
        Self
    }

    fn options(config: &ConnectionConfig) -> MySqlOptions {
        MySqlOptions {
            host: config
                .get_string("host")
                .unwrap_or_else(|| "localhost".to_string()),
            port: if config.port > 0 { config.port } else { DEFAULT_PORT },
            socket: config.get_string("unix_socket"),
            database: config.get_string("database"),
            user: config.get_string("username"),
            password: config.password.clone(),
            charset: config.get_string("charset"),
        }
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn display_name(&self) -> &'static str {
        "MySQL"
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["mysql", "mariadb"]
    }

    fn default_port(&self) -> Option<u16> {
        Some(DEFAULT_PORT)
    }

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    #[tracing::instrument(skip(self, config), fields(host = config.get_string("host").as_deref(), database = config.get_string("database").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>> {
        let options = Self::options(config);

        let session = MySqlSession::connect(&options).await.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to MySQL database");
            e
        })?;

        tracing::info!(
            host = %options.host,
            port = %options.port,
            database = ?options.database,
            "MySQL connection created"
        );
        Ok(Box::new(session))
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let options = Self::options(config);

        let mut conn_str = String::from("mysql://");
        if let Some(u) = &options.user {
            conn_str.push_str(u);
            conn_str.push('@');
        }
        conn_str.push_str(&format!("{}:{}", options.host, options.port));
        if let Some(db) = &options.database {
            conn_str.push('/');
            conn_str.push_str(db);
        }
        if let Some(socket) = &options.socket {
            conn_str.push_str(&format!("?socket={}", socket));
        }

        conn_str
    }
}
