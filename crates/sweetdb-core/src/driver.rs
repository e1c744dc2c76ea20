//! Database driver trait definition

use crate::{ConnectionConfig, Dialect, Result, Session};
use async_trait::async_trait;

/// A database driver: knows how to open sessions for one kind of database
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Driver identifier (e.g., "mysql", "sqlite")
    fn name(&self) -> &'static str;

    /// Human-readable name
    fn display_name(&self) -> &'static str;

    /// DSN schemes this driver answers to. Defaults to the driver name.
    fn schemes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Default connection port (None for file-based databases like SQLite)
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// SQL dialect of the sessions this driver opens
    fn dialect(&self) -> Dialect;

    /// Open a new session
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>>;

    /// Build a connection string from configuration, without the password
    fn build_connection_string(&self, config: &ConnectionConfig) -> String;
}
