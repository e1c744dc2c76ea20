//! Error types for SweetDB

use thiserror::Error;

/// Core error type for SweetDB operations
///
/// The variants separate "the database refused" (`Connection`, `Database`)
/// from "the calling code is wrong" (`Logic`), so callers can tell the two
/// apart without inspecting messages.
#[derive(Error, Debug)]
pub enum SweetError {
    /// The driver could not establish or keep a session (bad host,
    /// rejected credentials, lost transport).
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server rejected a statement (syntax error, constraint
    /// violation, unknown table, ...).
    #[error("Database error: {0}")]
    Database(String),

    /// Programmer misuse: unknown row field, parameters that do not match
    /// the placeholders of the query, a typed accessor asked for the wrong
    /// type.
    #[error("Logic error: {0}")]
    Logic(String),

    /// Malformed DSN or unknown driver.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SweetError {
    /// True for errors raised by the database or its transport rather than
    /// by the calling code.
    pub fn is_database_side(&self) -> bool {
        matches!(self, SweetError::Connection(_) | SweetError::Database(_))
    }

    /// True for programmer errors.
    pub fn is_logic(&self) -> bool {
        matches!(self, SweetError::Logic(_))
    }
}

/// Result type alias for SweetDB operations
pub type Result<T> = std::result::Result<T, SweetError>;
