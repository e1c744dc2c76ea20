//! MySQL/MariaDB driver implementation

mod connection;
mod driver;

pub use connection::{MySqlOptions, MySqlSession};
pub use driver::MySqlDriver;
