//! SweetDB Core - traits and types shared by every SweetDB crate
//!
//! This crate defines:
//!
//! - `DatabaseDriver` / `Session` - the seam between the connection facade
//!   and a concrete driver
//! - `Recordset` / `RecordsetRow` - forward-only results with field access
//!   by column name
//! - `Params` and [`bind`] - positional (`?`) and named (`:name`) parameter
//!   binding
//! - `ConnectionConfig` - connection targets parsed from DSNs
//! - `SweetError` - the error taxonomy

mod config;
mod dialect;
mod driver;
mod error;
mod params;
mod recordset;
mod row;
mod session;
pub mod sql;
mod types;

pub use config::*;
pub use dialect::*;
pub use driver::*;
pub use error::*;
pub use params::*;
pub use recordset::*;
pub use row::*;
pub use session::*;
pub use types::*;
