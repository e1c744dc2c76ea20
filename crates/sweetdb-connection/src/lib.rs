//! SweetDB Connection - the blocking database API
//!
//! [`Connection`] wraps one driver session and exposes `execute`, `select`,
//! `get_one_value`, `get_one_row` and `close`. Everything it returns is
//! re-exported here so callers only need this crate.

mod connection;

pub use connection::Connection;
pub use sweetdb_core::{
    ColumnMeta, ConnectionConfig, Dialect, FromValue, Params, Recordset, RecordsetRow, Result,
    StatementResult, SweetError, Value,
};
pub use sweetdb_drivers::DriverRegistry;
