//! SweetDB Drivers - bundled database drivers
//!
//! This crate re-exports the driver crates enabled by features and provides
//! the [`DriverRegistry`] used to pick a driver from a DSN, plus the shared
//! Tokio runtime the blocking facade runs on.

#[cfg(feature = "mysql")]
pub use sweetdb_driver_mysql as mysql;
#[cfg(feature = "sqlite")]
pub use sweetdb_driver_sqlite as sqlite;

mod registry;
mod runtime;

pub use registry::DriverRegistry;
pub use runtime::{block_on_tokio, get_tokio_runtime};

/// Re-export commonly used types from sweetdb-core
pub use sweetdb_core::{
    ColumnMeta, ConnectionConfig, DatabaseDriver, Dialect, Result, Session, StatementResult,
    SweetError, Value,
};
