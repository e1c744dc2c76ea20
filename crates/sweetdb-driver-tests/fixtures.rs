//! Core test fixtures for parameterized database driver testing.
//!
//! Every test asks for a [`TestDatabase`], which holds an open
//! [`Connection`] plus a freshly created `sweetdb_test` table holding two
//! rows:
//!
//! | id | field1   | field2 |
//! |----|----------|--------|
//! | 1  | `Test 1` | 10     |
//! | 2  | `Test 2` | 20     |
//!
//! SQLite tests each get their own temporary database file. MySQL tests share
//! one database, so they are serialized and the table is dropped and
//! recreated for each one. MySQL also gets the `sweetdb_test_out(OUT param1
//! INT)` procedure, which counts the rows.
//!
//! The MySQL server is, in order of preference:
//!
//! 1. the one named by `SWEETDB_TEST_MYSQL_DSN` (with
//!    `SWEETDB_TEST_MYSQL_USER` / `SWEETDB_TEST_MYSQL_PASSWORD`)
//! 2. a Docker container started automatically through testcontainers
//!
//! When neither is available the MySQL cases log a warning and skip. Set
//! `SWEETDB_TEST_REQUIRE_MYSQL=1` to turn that into a test failure.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sweetdb_driver_tests::fixtures::{TestDriver, test_database};
//! use rstest::rstest;
//!
//! #[rstest]
//! #[case::sqlite(TestDriver::Sqlite)]
//! #[case::mysql(TestDriver::Mysql)]
//! fn test_count(#[case] driver: TestDriver) -> anyhow::Result<()> {
//!     let Some(db) = test_database(driver)? else { return Ok(()) };
//!     assert_eq!(db.conn.select("SELECT * FROM sweetdb_test", ())?.row_count(), 2);
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use std::env;
use std::sync::{Mutex, MutexGuard};
use sweetdb_connection::{Connection, Value};
use tempfile::TempDir;

use crate::test_containers::mysql_container;

/// Name of the fixture table
pub const TEST_TABLE: &str = "sweetdb_test";

/// Name of the MySQL fixture procedure
pub const TEST_PROCEDURE: &str = "sweetdb_test_out";

/// Test driver identifier for parameterized testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestDriver {
    /// SQLite on a temporary file
    Sqlite,
    /// MySQL server, from the environment or a test container
    Mysql,
}

impl TestDriver {
    /// Get the driver name as a string
    pub fn name(&self) -> &'static str {
        match self {
            TestDriver::Sqlite => "sqlite",
            TestDriver::Mysql => "mysql",
        }
    }

    /// Get the display name
    pub fn display_name(&self) -> &'static str {
        match self {
            TestDriver::Sqlite => "SQLite",
            TestDriver::Mysql => "MySQL",
        }
    }

    /// Check if this driver supports stored procedures and session variables
    pub fn supports_procedures(&self) -> bool {
        matches!(self, TestDriver::Mysql)
    }

    fn create_table_sql(&self) -> &'static str {
        match self {
            TestDriver::Sqlite => {
                "CREATE TABLE sweetdb_test (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    field1 CHAR(10),
                    field2 INT
                )"
            }
            TestDriver::Mysql => {
                "CREATE TABLE sweetdb_test (
                    id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    field1 CHAR(10),
                    field2 INT
                ) ENGINE=MyISAM"
            }
        }
    }
}

/// Credentials for the MySQL test server
#[derive(Debug, Clone)]
pub struct MysqlTarget {
    /// DSN such as `mysql:host=127.0.0.1;dbname=test`
    pub dsn: String,
    /// User name, empty when the DSN carries it
    pub username: String,
    /// Password, empty for none
    pub password: String,
}

/// MySQL target from `SWEETDB_TEST_MYSQL_DSN`, `SWEETDB_TEST_MYSQL_USER` and
/// `SWEETDB_TEST_MYSQL_PASSWORD`, or `None` when no DSN is set
pub fn mysql_target_from_env() -> Option<MysqlTarget> {
    let dsn = env::var("SWEETDB_TEST_MYSQL_DSN")
        .ok()
        .filter(|v| !v.trim().is_empty())?;
    Some(MysqlTarget {
        dsn,
        username: env::var("SWEETDB_TEST_MYSQL_USER").unwrap_or_default(),
        password: env::var("SWEETDB_TEST_MYSQL_PASSWORD").unwrap_or_default(),
    })
}

/// Check if a missing MySQL server should fail the test instead of skipping
///
/// Set SWEETDB_TEST_REQUIRE_MYSQL=1 in CI where Docker is known to exist.
fn require_mysql() -> bool {
    env::var("SWEETDB_TEST_REQUIRE_MYSQL")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(false)
}

/// The MySQL server to test against: the environment override, else the
/// test container. `None` when no server is available and MySQL is not
/// required.
pub fn mysql_target() -> Result<Option<MysqlTarget>> {
    if let Some(target) = mysql_target_from_env() {
        return Ok(Some(target));
    }

    match mysql_container() {
        Ok(info) => Ok(Some(MysqlTarget {
            dsn: info.dsn(),
            username: info.username,
            password: info.password,
        })),
        Err(e) if !require_mysql() => {
            tracing::warn!(error = %e, "no MySQL server available, skipping MySQL test");
            Ok(None)
        }
        Err(e) => Err(e.context("failed to start MySQL container - is Docker running?")),
    }
}

/// Connect with a few retries; a fresh container may still be initializing
fn connect_mysql(target: &MysqlTarget, max_attempts: u32) -> Result<Connection> {
    let mut attempt = 1;
    loop {
        match Connection::open(&target.dsn, &target.username, &target.password) {
            Ok(conn) => return Ok(conn),
            Err(e) if attempt < max_attempts => {
                let delay = std::time::Duration::from_secs(u64::from(attempt));
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "MySQL not ready, retrying..."
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "MySQL not ready after {} attempts",
                    max_attempts
                )));
            }
        }
    }
}

/// MySQL tests share one database
static MYSQL_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// An open connection over the fixture table
pub struct TestDatabase {
    /// The connection under test
    pub conn: Connection,
    /// Which driver the connection uses
    pub driver: TestDriver,
    // Dropped after `conn`
    _dir: Option<TempDir>,
    _guard: Option<MutexGuard<'static, ()>>,
}

/// Open a connection for `driver` without creating any fixture data.
///
/// Returns `None` for MySQL when no test server is available. The returned
/// [`TempDir`] owns the SQLite file and must outlive the connection.
pub fn test_connection(driver: TestDriver) -> Result<Option<(Connection, Option<TempDir>)>> {
    initialize_logging();

    match driver {
        TestDriver::Sqlite => {
            let dir = tempfile::tempdir().context("failed to create temp directory")?;
            let path = dir.path().join("sweetdb_test.db");
            let path = path.to_str().context("invalid SQLite path")?;
            let conn = Connection::open(&format!("sqlite:{path}"), "", "")
                .context("failed to open SQLite database")?;
            Ok(Some((conn, Some(dir))))
        }
        TestDriver::Mysql => {
            let Some(target) = mysql_target()? else {
                return Ok(None);
            };
            let conn = connect_mysql(&target, 5)?;
            Ok(Some((conn, None)))
        }
    }
}

/// Open a connection for `driver` and (re)create the fixture table.
///
/// Returns `None` for MySQL when no test server is available.
pub fn test_database(driver: TestDriver) -> Result<Option<TestDatabase>> {
    let guard = match driver {
        TestDriver::Mysql => Some(MYSQL_LOCK.lock().unwrap_or_else(|e| e.into_inner())),
        TestDriver::Sqlite => None,
    };

    let Some((conn, dir)) = test_connection(driver)? else {
        return Ok(None);
    };

    setup_fixture(&conn, driver)
        .with_context(|| format!("failed to set up {} fixture", driver.display_name()))?;

    tracing::debug!(driver = driver.name(), "test fixture ready");
    Ok(Some(TestDatabase {
        conn,
        driver,
        _dir: dir,
        _guard: guard,
    }))
}

/// Create the fixture table (and procedure on MySQL) and insert the two rows
pub fn setup_fixture(conn: &Connection, driver: TestDriver) -> Result<()> {
    conn.execute(&format!("DROP TABLE IF EXISTS {TEST_TABLE}"), ())?;
    conn.execute(driver.create_table_sql(), ())?;

    if driver.supports_procedures() {
        conn.execute(&format!("DROP PROCEDURE IF EXISTS {TEST_PROCEDURE}"), ())?;
        conn.execute(
            &format!(
                "CREATE PROCEDURE {TEST_PROCEDURE}(OUT param1 INT)
                BEGIN
                    SELECT COUNT(*) INTO param1 FROM {TEST_TABLE};
                END"
            ),
            (),
        )?;
    }

    for (field1, field2) in [("Test 1", 10), ("Test 2", 20)] {
        let insert = conn.insert_sql(
            TEST_TABLE,
            [("field1", Value::from(field1)), ("field2", Value::from(field2))],
        )?;
        conn.execute(&insert, ())
            .with_context(|| format!("failed to insert fixture row '{field1}'"))?;
    }

    Ok(())
}

/// Initialize tracing for tests (call once)
pub fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(
                "sweetdb_core=debug,sweetdb_drivers=debug,sweetdb_connection=debug,sweetdb_driver_tests=debug",
            )
        });
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
