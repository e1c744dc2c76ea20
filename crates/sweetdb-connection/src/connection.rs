//! Blocking connection facade over a driver session

use sweetdb_core::{
    ConnectionConfig, Dialect, FromValue, Params, Recordset, RecordsetRow, Result, Session,
    StatementResult, SweetError, Value, bind, sql,
};
use std::future::Future;
use sweetdb_drivers::{DriverRegistry, block_on_tokio};

/// A connection to one database.
///
/// Every method blocks the calling thread until the driver answers. The
/// connection owns its session exclusively and is meant to be used from one
/// thread at a time.
///
/// Calling it from async code works but still parks the calling worker
/// thread for the whole round trip. Async callers should move the work onto
/// `tokio::task::spawn_blocking`.
///
/// Parameters are anything convertible into [`Params`]:
///
/// ```ignore
/// conn.select("SELECT * FROM t", ())?;                                  // verbatim
/// conn.get_one_value("SELECT field2 FROM t WHERE id = ?", 1)?;          // one scalar
/// conn.get_one_value("SELECT field2 FROM t WHERE id = ? AND field2 <> ?", [1, 300])?;
/// conn.get_one_value(
///     "SELECT field2 FROM t WHERE id = :id",
///     Params::named([(":id", 1)]),
/// )?;
/// ```
pub struct Connection {
    session: Option<Box<dyn Session>>,
    driver_name: &'static str,
    dialect: Dialect,
    config: ConnectionConfig,
}

impl Connection {
    /// Connect using a DSN plus credentials.
    ///
    /// Empty `username`/`password` leave whatever the DSN carries.
    pub fn open(dsn: &str, username: &str, password: &str) -> Result<Self> {
        let config = ConnectionConfig::from_dsn(dsn)?.with_credentials(username, password);
        Self::connect(config)
    }

    /// Connect using the built-in drivers
    pub fn connect(config: ConnectionConfig) -> Result<Self> {
        Self::with_registry(&DriverRegistry::with_defaults(), config)
    }

    /// Connect using a driver from `registry`
    #[tracing::instrument(skip(registry, config), fields(driver = %config.driver))]
    pub fn with_registry(registry: &DriverRegistry, config: ConnectionConfig) -> Result<Self> {
        let driver = registry.resolve(&config)?;
        tracing::info!(
            target_db = %driver.build_connection_string(&config),
            "opening connection"
        );

        let session = run_blocking(driver.connect(&config)).map_err(|e| {
            tracing::error!(error = %e, "failed to connect");
            e
        })?;

        Ok(Self {
            dialect: session.dialect(),
            session: Some(session),
            driver_name: driver.name(),
            config,
        })
    }

    fn session(&self) -> Result<&dyn Session> {
        self.session
            .as_deref()
            .ok_or_else(|| SweetError::Connection("connection is closed".into()))
    }

    /// Run a statement that produces no rows (DDL, DML, `CALL`)
    #[tracing::instrument(skip(self, query, params), fields(driver = self.driver_name))]
    pub fn execute(&self, query: &str, params: impl Into<Params>) -> Result<StatementResult> {
        let params = params.into();
        tracing::debug!(mode = params.mode(), count = params.len(), "binding parameters");
        let bound = bind(query, params, self.dialect)?;
        run_blocking(self.session()?.execute(&bound.sql, &bound.values))
    }

    /// Run a row-producing statement
    #[tracing::instrument(skip(self, query, params), fields(driver = self.driver_name))]
    pub fn select(&self, query: &str, params: impl Into<Params>) -> Result<Recordset> {
        let params = params.into();
        tracing::debug!(mode = params.mode(), count = params.len(), "binding parameters");
        let bound = bind(query, params, self.dialect)?;
        let cursor = run_blocking(self.session()?.query(&bound.sql, &bound.values))?;
        let recordset = Recordset::new(cursor);
        tracing::debug!(row_count = recordset.row_count(), "recordset ready");
        Ok(recordset)
    }

    /// First column of the first row, or `None` when nothing matched.
    ///
    /// Only the first row is converted, but the server still produces the
    /// full result; add a `LIMIT` to queries that match many rows.
    pub fn get_one_value(&self, query: &str, params: impl Into<Params>) -> Result<Option<Value>> {
        Ok(self
            .get_one_row(query, params)?
            .and_then(|row| row.into_values().into_iter().next()))
    }

    /// [`Connection::get_one_value`] converted to `T`
    pub fn get_one_value_as<T: FromValue>(
        &self,
        query: &str,
        params: impl Into<Params>,
    ) -> Result<Option<T>> {
        self.get_one_value(query, params)?
            .map(|value| T::from_value(&value))
            .transpose()
    }

    /// First row, or `None` when nothing matched.
    ///
    /// Rows after the first are not converted. SQLite stops stepping the
    /// statement; MySQL drains the rest of the result from the wire.
    #[tracing::instrument(skip(self, query, params), fields(driver = self.driver_name))]
    pub fn get_one_row(
        &self,
        query: &str,
        params: impl Into<Params>,
    ) -> Result<Option<RecordsetRow>> {
        let params = params.into();
        tracing::debug!(mode = params.mode(), count = params.len(), "binding parameters");
        let bound = bind(query, params, self.dialect)?;
        run_blocking(self.session()?.query_first(&bound.sql, &bound.values))
    }

    /// Insert one row with bound values. Columns keep the order of `values`.
    pub fn insert<I, K, V>(&self, table: &str, values: I) -> Result<StatementResult>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<K>, Vec<Value>) =
            values.into_iter().map(|(k, v)| (k, v.into())).unzip();
        let statement = sql::insert_parameterized(self.dialect, table, &columns)?;
        self.execute(&statement, Params::Positional(values))
    }

    /// Build an INSERT with escaped literals for this connection's dialect.
    /// The statement is returned, not executed.
    pub fn insert_sql<I, K, V>(&self, table: &str, values: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        sql::insert(self.dialect, table, values)
    }

    /// Close the connection
    pub fn close(mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => {
                tracing::info!(driver = self.driver_name, "closing connection");
                run_blocking(session.close())
            }
            None => Ok(()),
        }
    }

    /// Driver name (e.g. "mysql", "sqlite")
    pub fn driver_name(&self) -> &str {
        self.driver_name
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The configuration this connection was opened with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// True once the session is gone (closed, or dropped by the server)
    pub fn is_closed(&self) -> bool {
        self.session.as_ref().is_none_or(|s| s.is_closed())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if session.is_closed() {
            return;
        }

        if let Err(e) = run_blocking(session.close()) {
            tracing::warn!(driver = self.driver_name, error = %e, "failed to close connection on drop");
        }
    }
}

/// Drive `future` to completion on the shared runtime.
///
/// A thread already inside a Tokio runtime (async code, `spawn_blocking`)
/// cannot block on another runtime, so the future is driven from a scoped
/// helper thread instead.
fn run_blocking<T: Send>(future: impl Future<Output = Result<T>> + Send) -> Result<T> {
    if tokio::runtime::Handle::try_current().is_err() {
        return block_on_tokio(future);
    }
    std::thread::scope(|scope| {
        scope
            .spawn(move || block_on_tokio(future))
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.driver_name)
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn memory() -> Connection {
        let conn = Connection::open("sqlite::memory:", "", "").unwrap();
        conn.execute(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, field1 TEXT, field2 INTEGER)",
            (),
        )
        .unwrap();
        conn.insert("t", [("field1", Value::from("Test 1")), ("field2", Value::from(10))])
            .unwrap();
        conn.insert("t", [("field1", Value::from("Test 2")), ("field2", Value::from(20))])
            .unwrap();
        conn
    }

    #[test]
    fn reports_driver_and_dialect() {
        let conn = memory();
        assert_eq!(conn.driver_name(), "sqlite");
        assert_eq!(conn.dialect(), Dialect::Sqlite);
        assert_eq!(conn.config().database.as_deref(), Some(":memory:"));
        assert!(!conn.is_closed());
    }

    #[test]
    fn one_value_and_one_row() {
        let conn = memory();
        assert_eq!(
            conn.get_one_value("SELECT field2 FROM t ORDER BY field1 DESC LIMIT 1", ())
                .unwrap(),
            Some(Value::Int64(20))
        );
        assert_eq!(
            conn.get_one_value_as::<i64>("SELECT field2 FROM t WHERE id = ?", 1).unwrap(),
            Some(10)
        );
        assert_eq!(conn.get_one_value("SELECT field2 FROM t WHERE id = ?", 99).unwrap(), None);

        let row = conn.get_one_row("SELECT * FROM t WHERE id = :id", Params::named([("id", 2)]))
            .unwrap()
            .unwrap();
        assert_eq!(row.get_as::<String>("field1").unwrap(), "Test 2");
        assert!(conn.get_one_row("SELECT * FROM t WHERE 0", ()).unwrap().is_none());
    }

    #[test]
    fn insert_reports_generated_id() {
        let conn = memory();
        let result = conn.insert("t", [("field1", "Test 3")]).unwrap();
        assert_eq!(result.affected_rows, 1);
        assert_eq!(result.last_insert_id, Some(3));
    }

    #[test]
    fn insert_sql_uses_connection_dialect() {
        let conn = memory();
        let statement = conn.insert_sql("t", [("field1", "it's")]).unwrap();
        assert_eq!(statement, "INSERT INTO \"t\" (\"field1\") VALUES ('it''s')");
        conn.execute(&statement, ()).unwrap();
        assert_eq!(
            conn.get_one_value_as::<String>("SELECT field1 FROM t WHERE id = 3", ()).unwrap(),
            Some("it's".to_string())
        );
    }

    #[test]
    fn binding_errors_do_not_reach_the_driver() {
        let conn = memory();
        let err = conn.select("SELECT * FROM t WHERE id = ?", [1, 2]).unwrap_err();
        assert!(err.is_logic());
    }

    #[test]
    fn unknown_driver_is_configuration_error() {
        let err = Connection::open("oracle:host=localhost", "scott", "tiger").unwrap_err();
        assert!(matches!(err, SweetError::Configuration(_)), "{err}");
    }

    #[test]
    fn close_consumes_connection() {
        let conn = memory();
        conn.close().unwrap();
    }

    #[test]
    fn debug_output_hides_password() {
        let dir = tempfile::tempdir().unwrap();
        let dsn = format!("sqlite:{}", dir.path().join("debug.db").display());
        let conn = Connection::open(&dsn, "user", "hunter2").unwrap();
        let debug = format!("{:?}", conn);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("sqlite"));
    }

    #[test]
    fn rows_serialize_as_objects() {
        let conn = memory();
        let row = conn.get_one_row("SELECT field1, field2 FROM t WHERE id = 1", ()).unwrap().unwrap();
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!({"field1": "Test 1", "field2": 10}));
    }

    #[test]
    fn get_one_row_skips_the_rest_of_the_result() {
        let conn = memory();
        let row = conn
            .get_one_row(
                "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n) SELECT x FROM n",
                (),
            )
            .unwrap()
            .unwrap();
        assert_eq!(row.get_as::<i64>("x").unwrap(), 1);
        assert_eq!(
            conn.get_one_value("SELECT field1 FROM t ORDER BY field1 ASC", ()).unwrap(),
            Some(Value::from("Test 1"))
        );
    }

    #[test]
    fn usable_from_inside_a_runtime() {
        let conn = memory();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let _guard = rt.enter();

        let count = rt.block_on(async { conn.select("SELECT * FROM t", ()).unwrap().row_count() });
        assert_eq!(count, 2);

        let conn = rt
            .block_on(tokio::task::spawn_blocking(move || {
                conn.insert("t", [("field1", "Test 3")]).unwrap();
                conn
            }))
            .unwrap();
        assert_eq!(conn.get_one_value_as::<i64>("SELECT COUNT(*) FROM t", ()).unwrap(), Some(3));

        // Dropped from async code without an explicit close
        rt.block_on(async move { drop(conn) });
    }
}
