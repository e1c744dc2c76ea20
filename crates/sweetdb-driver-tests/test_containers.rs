//! Docker container management for integration tests.
//!
//! The MySQL container is started lazily by the first test that needs it and
//! reused by every later test in the process. Tests talk to it through the
//! regular [`sweetdb_connection::Connection`] API, so nothing here knows
//! about the fixture schema.
//!
//! Set `SWEETDB_TEST_MYSQL_DSN` to use an existing server instead; no
//! container is started then.

use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};
use sweetdb_drivers::block_on_tokio;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::mysql::Mysql;

/// Information about a running test container
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Host address (typically 127.0.0.1)
    pub host: String,
    /// Port number (randomly assigned by testcontainers)
    pub port: u16,
    /// Database name
    pub database: String,
    /// Username for authentication
    pub username: String,
    /// Password for authentication, empty for none
    pub password: String,
}

impl ContainerInfo {
    /// PDO-style DSN for this container
    pub fn dsn(&self) -> String {
        format!(
            "mysql:host={};port={};dbname={}",
            self.host, self.port, self.database
        )
    }
}

struct MysqlContainer {
    #[allow(dead_code)]
    inner: ContainerAsync<Mysql>,
    info: ContainerInfo,
}

/// Global MySQL container instance
static MYSQL_CONTAINER: Lazy<Arc<Mutex<Option<MysqlContainer>>>> =
    Lazy::new(|| Arc::new(Mutex::new(None)));

/// Get or create the MySQL test container.
///
/// The image defaults of `testcontainers-modules` apply: user `root` with an
/// empty password and a database named `test`. Blocks until the server
/// reports it is ready for connections.
pub fn mysql_container() -> anyhow::Result<ContainerInfo> {
    let mut guard = MYSQL_CONTAINER
        .lock()
        .map_err(|e| anyhow::anyhow!("failed to lock mysql container: {}", e))?;

    if let Some(ref container) = *guard {
        return Ok(container.info.clone());
    }

    tracing::info!("starting MySQL test container");

    let (container, host_port) = block_on_tokio(async {
        let container = Mysql::default()
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start mysql container: {}", e))?;
        let host_port = container
            .get_host_port_ipv4(3306)
            .await
            .map_err(|e| anyhow::anyhow!("failed to get mysql port: {}", e))?;
        anyhow::Ok((container, host_port))
    })?;

    let info = ContainerInfo {
        host: "127.0.0.1".to_string(),
        port: host_port,
        database: "test".to_string(),
        username: "root".to_string(),
        password: String::new(),
    };
    tracing::info!(port = host_port, "MySQL test container started");

    *guard = Some(MysqlContainer {
        inner: container,
        info: info.clone(),
    });
    Ok(info)
}
