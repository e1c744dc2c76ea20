//! Driver session trait

use crate::{Cursor, Dialect, Recordset, RecordsetRow, Result, StatementResult, Value};
use async_trait::async_trait;

/// One open session with a database server or file.
///
/// Statements reach a session already bound: the SQL uses only `?`
/// placeholders and `params` holds one value per placeholder, in order. An
/// empty `params` means the text must be sent as-is (it may contain
/// statements that cannot be prepared, such as `CREATE PROCEDURE`).
#[async_trait]
pub trait Session: Send + Sync {
    /// Get the driver name (e.g., "sqlite", "mysql")
    fn driver_name(&self) -> &str;

    /// SQL dialect spoken by this session
    fn dialect(&self) -> Dialect;

    /// Execute a statement that produces no rows (DDL, DML, CALL)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a row-producing statement and return a cursor over the result
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Box<dyn Cursor>>;

    /// Execute a row-producing statement and keep only its first row.
    ///
    /// The default reads the whole result through [`Session::query`].
    /// Drivers override it to stop converting rows after the first one.
    async fn query_first(&self, sql: &str, params: &[Value]) -> Result<Option<RecordsetRow>> {
        let cursor = self.query(sql, params).await?;
        Recordset::new(cursor).next().transpose()
    }

    /// Release the session. Later calls fail with a connection error.
    async fn close(&self) -> Result<()>;

    /// Check if the session has been closed
    fn is_closed(&self) -> bool;
}
