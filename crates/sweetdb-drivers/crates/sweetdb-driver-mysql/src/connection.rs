//! MySQL session implementation

use async_trait::async_trait;
use mysql_async::{Conn, Opts, OptsBuilder, Row as MySqlRow, consts::ColumnType, prelude::*};
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use sweetdb_core::{
    BufferedCursor, ColumnMeta, Cursor, Dialect, RecordsetRow, Result, Session, StatementResult,
    SweetError, Value,
};
use tokio::sync::Mutex;

/// Global Tokio runtime for MySQL operations.
///
/// mysql_async spawns its I/O tasks with `tokio::spawn`, so every call is
/// dispatched onto this runtime no matter which executor the caller uses.
fn get_mysql_runtime() -> &'static tokio::runtime::Runtime {
    static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("sweetdb-mysql-runtime")
            .build()
            .expect("Failed to create Tokio runtime for MySQL driver")
    })
}

/// Where and how to connect
#[derive(Debug, Clone, Default)]
pub struct MySqlOptions {
    pub host: String,
    pub port: u16,
    /// Unix socket path. Takes precedence over host/port when set.
    pub socket: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Sent as `SET NAMES` right after connecting
    pub charset: Option<String>,
}

impl MySqlOptions {
    fn to_opts(&self) -> Result<Opts> {
        let mut builder = OptsBuilder::default()
            .ip_or_hostname(self.host.clone())
            .tcp_port(self.port)
            .user(self.user.clone())
            .pass(self.password.clone())
            .db_name(self.database.clone());

        if let Some(socket) = &self.socket {
            builder = builder.socket(Some(socket.clone()));
        }

        if let Some(charset) = &self.charset {
            if charset.is_empty()
                || !charset.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(SweetError::Configuration(format!(
                    "invalid charset '{}'",
                    charset
                )));
            }
            builder = builder.init(vec![format!("SET NAMES {}", charset)]);
        }

        Ok(builder.into())
    }
}

/// MySQL session wrapper.
///
/// Owns exactly one server connection. The connection is taken out of the
/// mutex on close.
pub struct MySqlSession {
    conn: Arc<Mutex<Option<Conn>>>,
    closed: AtomicBool,
}

impl MySqlSession {
    /// Connect to a MySQL server
    pub async fn connect(options: &MySqlOptions) -> Result<Self> {
        tracing::info!(
            host = %options.host,
            port = %options.port,
            socket = ?options.socket,
            database = ?options.database,
            "connecting to MySQL database"
        );

        let opts = options.to_opts()?;
        let conn = get_mysql_runtime()
            .spawn(async move { Conn::new(opts).await })
            .await
            .map_err(|e| SweetError::Connection(format!("MySQL connection task failed: {}", e)))?
            .map_err(|e| SweetError::Connection(format!("Failed to connect to MySQL: {}", e)))?;

        tracing::info!(
            server_version = ?conn.server_version(),
            connection_id = conn.id(),
            "MySQL connection established"
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            closed: AtomicBool::new(false),
        })
    }
}

/// Statement failures are database errors, except a broken transport which
/// means the session itself is gone.
fn map_mysql_error(context: &str, e: mysql_async::Error) -> SweetError {
    match e {
        mysql_async::Error::Io(io) => SweetError::Connection(format!("{}: {}", context, io)),
        other => SweetError::Database(format!("{}: {}", context, other)),
    }
}

fn closed_error() -> SweetError {
    SweetError::Connection("MySQL connection is closed".into())
}

fn value_to_mysql(value: &Value) -> mysql_async::Value {
    use chrono::{Datelike, Timelike};
    use mysql_async::Value as My;

    match value {
        Value::Null => My::NULL,
        Value::Bool(v) => My::Int(i64::from(*v)),
        Value::Int64(v) => My::Int(*v),
        Value::UInt64(v) => My::UInt(*v),
        Value::Float64(v) => My::Double(*v),
        Value::Decimal(v) | Value::String(v) => My::Bytes(v.as_bytes().to_vec()),
        Value::Bytes(v) => My::Bytes(v.clone()),
        Value::Date(d) => My::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0),
        Value::Time(t) => My::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1_000,
        ),
        Value::DateTime(dt) => My::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1_000,
        ),
        Value::Json(j) => My::Bytes(j.to_string().into_bytes()),
    }
}

/// Convert mysql_async Value to our Value type, using column type metadata
/// to interpret byte strings from the text protocol.
fn mysql_value_to_value(val: mysql_async::Value, col_type: ColumnType) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) => {
            let s = match String::from_utf8(bytes) {
                Ok(s) => s,
                Err(e) => return Value::Bytes(e.into_bytes()),
            };
            match col_type {
                ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_YEAR => s
                    .parse::<i64>()
                    .map(Value::Int64)
                    .or_else(|_| s.parse::<u64>().map(Value::UInt64))
                    .unwrap_or(Value::String(s)),
                ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => {
                    s.parse::<f64>().map(Value::Float64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                    Value::Decimal(s)
                }
                ColumnType::MYSQL_TYPE_DATE => chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map(Value::Date)
                    .unwrap_or(Value::String(s)),
                ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_TIMESTAMP => {
                    chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
                        .map(Value::DateTime)
                        .unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_JSON => serde_json::from_str(&s)
                    .map(Value::Json)
                    .unwrap_or(Value::String(s)),
                _ => Value::String(s),
            }
        }
        mysql_async::Value::Int(i) => Value::Int64(i),
        mysql_async::Value::UInt(u) => Value::from(u),
        mysql_async::Value::Float(f) => Value::Float64(f as f64),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            let date = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32);
            if col_type == ColumnType::MYSQL_TYPE_DATE {
                match date {
                    Some(date) => Value::Date(date),
                    None => Value::String(format!("{:04}-{:02}-{:02}", year, month, day)),
                }
            } else {
                match date.and_then(|d| {
                    d.and_hms_micro_opt(hour as u32, min as u32, sec as u32, micro)
                }) {
                    Some(dt) => Value::DateTime(dt),
                    None => Value::String(format!(
                        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                        year, month, day, hour, min, sec
                    )),
                }
            }
        }
        mysql_async::Value::Time(negative, days, hours, mins, secs, micros) => {
            // TIME is a duration and may exceed 24 hours
            let total_hours = days * 24 + hours as u32;
            let sign = if negative { "-" } else { "" };
            Value::String(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                sign, total_hours, mins, secs, micros
            ))
        }
    }
}

fn row_values(mut row: MySqlRow, types: &[ColumnType]) -> Vec<Value> {
    (0..types.len())
        .map(|idx| {
            let raw = row.take::<mysql_async::Value, _>(idx).unwrap_or(mysql_async::Value::NULL);
            mysql_value_to_value(raw, types[idx])
        })
        .collect()
}

fn rows_to_cursor(columns: Vec<ColumnMeta>, types: &[ColumnType], rows: Vec<MySqlRow>) -> BufferedCursor {
    let rows = rows.into_iter().map(|row| row_values(row, types)).collect();
    BufferedCursor::new(columns, rows)
}

fn describe(columns: &[mysql_async::Column]) -> (Vec<ColumnMeta>, Vec<ColumnType>) {
    columns
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            (
                ColumnMeta::new(col.name_str(), format!("{:?}", col.column_type()), idx),
                col.column_type(),
            )
        })
        .unzip()
}

#[async_trait]
impl Session for MySqlSession {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params: Vec<mysql_async::Value> = params.iter().map(value_to_mysql).collect();

        let result = get_mysql_runtime()
            .spawn(async move {
                let mut guard = conn.lock().await;
                let conn = guard.as_mut().ok_or_else(closed_error)?;

                // Unbound text goes through the text protocol: CREATE
                // PROCEDURE and friends cannot be prepared.
                if params.is_empty() {
                    conn.query_drop(sql.as_str())
                        .await
                        .map_err(|e| map_mysql_error("Failed to execute statement", e))?;
                } else {
                    conn.exec_drop(sql.as_str(), mysql_async::Params::Positional(params))
                        .await
                        .map_err(|e| map_mysql_error("Failed to execute statement", e))?;
                }

                Ok::<StatementResult, SweetError>(StatementResult {
                    affected_rows: conn.affected_rows(),
                    last_insert_id: conn.last_insert_id().filter(|id| *id > 0),
                })
            })
            .await
            .map_err(|e| SweetError::Connection(format!("MySQL execute task failed: {}", e)))??;

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
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params: Vec<mysql_async::Value> = params.iter().map(value_to_mysql).collect();

        let cursor = get_mysql_runtime()
            .spawn(async move {
                let mut guard = conn.lock().await;
                let conn = guard.as_mut().ok_or_else(closed_error)?;

                let (columns, types, rows) = if params.is_empty() {
                    let mut result = conn
                        .query_iter(sql.as_str())
                        .await
                        .map_err(|e| map_mysql_error("Failed to execute query", e))?;
                    let (columns, types) = describe(result.columns_ref());
                    let rows: Vec<MySqlRow> = result
                        .collect()
                        .await
                        .map_err(|e| map_mysql_error("Failed to fetch rows", e))?;
                    (columns, types, rows)
                } else {
                    let mut result = conn
                        .exec_iter(sql.as_str(), mysql_async::Params::Positional(params))
                        .await
                        .map_err(|e| map_mysql_error("Failed to execute query", e))?;
                    let (columns, types) = describe(result.columns_ref());
                    let rows: Vec<MySqlRow> = result
                        .collect()
                        .await
                        .map_err(|e| map_mysql_error("Failed to fetch rows", e))?;
                    (columns, types, rows)
                };

                Ok::<BufferedCursor, SweetError>(rows_to_cursor(columns, &types, rows))
            })
            .await
            .map_err(|e| SweetError::Connection(format!("MySQL query task failed: {}", e)))??;

        tracing::debug!(
            row_count = cursor.row_count(),
            execution_time_ms = start_time.elapsed().as_millis() as u64,
            "query executed successfully"
        );
        Ok(Box::new(cursor))
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query_first(&self, sql: &str, params: &[Value]) -> Result<Option<RecordsetRow>> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params: Vec<mysql_async::Value> = params.iter().map(value_to_mysql).collect();

        let row = get_mysql_runtime()
            .spawn(async move {
                let mut guard = conn.lock().await;
                let conn = guard.as_mut().ok_or_else(closed_error)?;

                // The rest of the result is drained from the wire, not converted
                let first: mysql_async::Result<Option<MySqlRow>> = if params.is_empty() {
                    conn.query_first(sql.as_str()).await
                } else {
                    conn.exec_first(sql.as_str(), mysql_async::Params::Positional(params))
                        .await
                };
                let row = first.map_err(|e| map_mysql_error("Failed to execute query", e))?;

                Ok::<Option<RecordsetRow>, SweetError>(row.map(|row| {
                    let (columns, types) = describe(row.columns_ref());
                    let names = columns.into_iter().map(|c| c.name).collect();
                    RecordsetRow::new(names, row_values(row, &types))
                }))
            })
            .await
            .map_err(|e| SweetError::Connection(format!("MySQL query task failed: {}", e)))??;

        tracing::debug!(found = row.is_some(), "first row fetched");
        Ok(row)
    }

    async fn close(&self) -> Result<()> {
        let conn = self.conn.clone();
        let closed = get_mysql_runtime()
            .spawn(async move {
                let Some(conn) = conn.lock().await.take() else {
                    return Err(SweetError::Connection(
                        "MySQL connection is already closed".into(),
                    ));
                };
                tracing::info!("closing MySQL connection");
                conn.disconnect().await.map_err(|e| {
                    SweetError::Connection(format!("Failed to close MySQL connection: {}", e))
                })
            })
            .await
            .map_err(|e| SweetError::Connection(format!("MySQL close task failed: {}", e)))?;

        self.closed.store(true, Ordering::SeqCst);
        closed
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
