//! SQLite session implementation

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Batch, Connection as RusqliteConnection, OpenFlags, params_from_iter};
use std::sync::Arc;
use sweetdb_core::{
    BufferedCursor, ColumnMeta, ConnectionConfig, Cursor, Dialect, RecordsetRow, Result, Session,
    StatementResult, SweetError, Value,
};

/// Options applied right after a database is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    /// `PRAGMA foreign_keys`
    pub foreign_keys: bool,
    /// `PRAGMA journal_mode`. `None` keeps the SQLite default.
    pub journal_mode: Option<String>,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            foreign_keys: true,
            journal_mode: Some("WAL".to_string()),
        }
    }
}

impl SqliteOptions {
    /// Read `foreign_keys` and `journal_mode` from the connection params
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            foreign_keys: config.get_bool("foreign_keys")?.unwrap_or(defaults.foreign_keys),
            journal_mode: config
                .params
                .get("journal_mode")
                .cloned()
                .or(defaults.journal_mode),
        })
    }
}

/// SQLite session wrapper.
///
/// The rusqlite connection is not `Sync`, so it lives behind a mutex. It is
/// taken out of the mutex on close.
pub struct SqliteSession {
    conn: Mutex<Option<RusqliteConnection>>,
    path: String,
}

impl SqliteSession {
    /// Open a SQLite database with the default options
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with(path, &SqliteOptions::default())
    }

    /// Open a SQLite database. `:memory:` (or an empty path) opens a private
    /// in-memory database.
    pub fn open_with(path: &str, options: &SqliteOptions) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");
        let in_memory = path.is_empty() || path == ":memory:";

        let (conn, path) = if in_memory {
            let conn = RusqliteConnection::open_in_memory().map_err(|e| {
                SweetError::Connection(format!("Failed to open in-memory database: {}", e))
            })?;
            (conn, ":memory:".to_string())
        } else {
            let expanded_path = Self::expand_path(path)?;

            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.exists()
                {
                    return Err(SweetError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;

            let conn = RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                SweetError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?;
            (conn, expanded_path)
        };

        conn.pragma_update(None, "foreign_keys", if options.foreign_keys { "ON" } else { "OFF" })
            .map_err(|e| SweetError::Connection(format!("Failed to set foreign keys: {}", e)))?;

        // In-memory databases only support the MEMORY journal.
        if let Some(mode) = options.journal_mode.as_deref()
            && !in_memory
        {
            conn.pragma_update(None, "journal_mode", mode)
                .map_err(|e| SweetError::Connection(format!("Failed to set journal mode: {}", e)))?;
        }

        tracing::info!(path = %path, "SQLite database connection established");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path,
        })
    }

    /// Resolved database path (`:memory:` for in-memory databases)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Expand path to handle ~ (home directory) and relative paths
    fn expand_path(path: &str) -> Result<String> {
        if path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            let home = dirs::home_dir().ok_or_else(|| {
                SweetError::Configuration("Unable to determine home directory".into())
            })?;
            home.join(rest).to_string_lossy().to_string()
        } else if path.starts_with('~') {
            return Err(SweetError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        let result = if path_buf.is_relative() {
            std::env::current_dir()?
                .join(path_buf)
                .to_string_lossy()
                .to_string()
        } else {
            expanded
        };

        Ok(result)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&RusqliteConnection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock();
        let conn = guard
            .as_ref()
            .ok_or_else(|| SweetError::Connection("SQLite connection is closed".into()))?;
        f(conn)
    }
}

fn is_insert(sql: &str) -> bool {
    let keyword: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    keyword.eq_ignore_ascii_case("insert") || keyword.eq_ignore_ascii_case("replace")
}

fn prepare_error(e: rusqlite::Error) -> SweetError {
    SweetError::Database(format!("Failed to prepare statement: {}", e))
}

fn statement_error(e: rusqlite::Error) -> SweetError {
    SweetError::Database(format!("Failed to execute statement: {}", e))
}

/// Run every statement in `sql`. Unbound text may hold several statements
/// (schema scripts); bound values belong to exactly one.
fn execute_on(conn: &RusqliteConnection, sql: &str, params: &[Value]) -> Result<StatementResult> {
    let rusqlite_params = values_to_rusqlite(params);
    let mut batch = Batch::new(conn, sql);
    let mut affected_rows = 0;

    while let Some(mut stmt) = batch.next().map_err(prepare_error)? {
        if !params.is_empty() && !matches!(batch.next(), Ok(None)) {
            return Err(SweetError::Logic(
                "parameters can only be bound to a single statement, but the query holds several"
                    .into(),
            ));
        }

        let before = conn.total_changes();
        if stmt.column_count() > 0 {
            // Row-producing statements (PRAGMA, RETURNING) are stepped to
            // the end and their rows discarded.
            let mut rows = stmt
                .query(params_from_iter(rusqlite_params.iter()))
                .map_err(statement_error)?;
            while rows.next().map_err(statement_error)?.is_some() {}
        } else {
            stmt.execute(params_from_iter(rusqlite_params.iter()))
                .map_err(statement_error)?;
        }

        // changes() still holds the last DML count after DDL or a SELECT
        if conn.total_changes() != before {
            affected_rows += conn.changes();
        }
    }

    let last_insert_id = (is_insert(sql) && affected_rows > 0)
        .then(|| conn.last_insert_rowid())
        .and_then(|id| u64::try_from(id).ok());

    Ok(StatementResult {
        affected_rows,
        last_insert_id,
    })
}

fn query_on(conn: &RusqliteConnection, sql: &str, params: &[Value]) -> Result<BufferedCursor> {
    let rusqlite_params = values_to_rusqlite(params);

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| SweetError::Database(format!("Failed to prepare query: {}", e)))?;

    // decl_type is the type from CREATE TABLE; expressions have none.
    let columns: Vec<ColumnMeta> = stmt
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| ColumnMeta::new(col.name(), col.decl_type().unwrap_or("DYNAMIC"), idx))
        .collect();

    let mut rows = Vec::new();
    let mut query_rows = stmt
        .query(params_from_iter(rusqlite_params.iter()))
        .map_err(|e| SweetError::Database(format!("Failed to execute query: {}", e)))?;

    while let Some(row) = query_rows
        .next()
        .map_err(|e| SweetError::Database(format!("Failed to fetch row: {}", e)))?
    {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(rusqlite_to_value(row, i)?);
        }
        rows.push(values);
    }

    Ok(BufferedCursor::new(columns, rows))
}

/// Step the statement once; later rows are never read
fn query_first_on(
    conn: &RusqliteConnection,
    sql: &str,
    params: &[Value],
) -> Result<Option<RecordsetRow>> {
    let rusqlite_params = values_to_rusqlite(params);

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| SweetError::Database(format!("Failed to prepare query: {}", e)))?;
    let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();

    let mut query_rows = stmt
        .query(params_from_iter(rusqlite_params.iter()))
        .map_err(|e| SweetError::Database(format!("Failed to execute query: {}", e)))?;
    let Some(row) = query_rows
        .next()
        .map_err(|e| SweetError::Database(format!("Failed to fetch row: {}", e)))?
    else {
        return Ok(None);
    };

    let values = (0..columns.len())
        .map(|i| rusqlite_to_value(row, i))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(RecordsetRow::new(columns, values)))
}

#[async_trait]
impl Session for SqliteSession {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let result = self.with_conn(|conn| execute_on(conn, sql, params))?;
        tracing::debug!(
            affected_rows = result.affected_rows,
            last_insert_id = ?result.last_insert_id,
            "statement executed"
        );
        Ok(result)
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Box<dyn Cursor>> {
        let start_time = std::time::Instant::now();
        let cursor = self.with_conn(|conn| query_on(conn, sql, params))?;

        tracing::debug!(
            row_count = cursor.row_count(),
            execution_time_ms = start_time.elapsed().as_millis() as u64,
            "query executed successfully"
        );
        Ok(Box::new(cursor))
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query_first(&self, sql: &str, params: &[Value]) -> Result<Option<RecordsetRow>> {
        let row = self.with_conn(|conn| query_first_on(conn, sql, params))?;
        tracing::debug!(found = row.is_some(), "first row fetched");
        Ok(row)
    }

    async fn close(&self) -> Result<()> {
        let conn = self.conn.lock().take();
        let Some(conn) = conn else {
            return Err(SweetError::Connection("SQLite connection is already closed".into()));
        };
        tracing::info!(path = %self.path, "closing SQLite connection");
        conn.close().map_err(|(_, e)| {
            SweetError::Connection(format!("Failed to close SQLite connection: {}", e))
        })
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }
}

fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;

    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(i64::from(*b)),
        Value::Int64(i) => Sql::Integer(*i),
        Value::UInt64(u) => i64::try_from(*u)
            .map(Sql::Integer)
            .unwrap_or_else(|_| Sql::Text(u.to_string())),
        Value::Float64(f) => Sql::Real(*f),
        Value::Decimal(d) => Sql::Text(d.clone()),
        Value::String(s) => Sql::Text(s.clone()),
        Value::Bytes(b) => Sql::Blob(b.clone()),
        Value::Date(d) => Sql::Text(d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => Sql::Text(t.format("%H:%M:%S%.f").to_string()),
        Value::DateTime(dt) => Sql::Text(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::Json(j) => Sql::Text(j.to_string()),
    }
}

/// Convert rusqlite row value to our Value type
fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| SweetError::Database(e.to_string()))?;

    Ok(match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    })
}
