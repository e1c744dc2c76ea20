//! SQLite database driver implementation

mod connection;
mod driver;

pub use connection::{SqliteOptions, SqliteSession};
pub use driver::SqliteDriver;
