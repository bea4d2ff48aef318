//! Traced database connection wrapper.
//!
//! Wraps a `duckdb::Connection` and logs all statements via tracing.

use duckdb::{Connection, Error, Row, ToSql};

/// A wrapper around a DuckDB connection that logs all queries via tracing.
///
/// This is a thin wrapper that delegates to the underlying connection but adds
/// `tracing::debug_span!` around each query/execute call.
///
/// # Example
///
/// ```ignore
/// use duckling::ConnectionExt;
///
/// let conn = duckdb::Connection::open_in_memory()?;
/// let traced = conn.traced();
///
/// // All statements are now logged at debug level
/// traced.execute("INSERT INTO users (email) VALUES (?)", &[&email])?;
/// let names = traced.query_map("SELECT name FROM users", &[], |row| row.get::<_, String>(0))?;
/// ```
#[derive(Clone, Copy)]
pub struct TracedConn<'a> {
    conn: &'a Connection,
}

impl<'a> TracedConn<'a> {
    /// Create a new traced connection wrapper.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Execute a statement, returning the number of rows affected.
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize, Error> {
        let span = tracing::debug_span!(
            "db.execute",
            sql = %sql,
            params = params.len(),
            affected = tracing::field::Empty,
        );
        let _guard = span.enter();
        let affected = self.conn.execute(sql, params)?;
        span.record("affected", affected);
        Ok(affected)
    }

    /// Execute a query, mapping every row.
    pub fn query_map<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> Result<Vec<T>, Error>
    where
        F: FnMut(&Row<'_>) -> Result<T, Error>,
    {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = tracing::field::Empty,
        );
        let _guard = span.enter();
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, f)?.collect::<Result<Vec<T>, Error>>()?;
        span.record("rows", rows.len());
        Ok(rows)
    }

    /// Execute a query, returning exactly one mapped row.
    ///
    /// Returns an error if the query returns no rows.
    pub fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> Result<T, Error>
    where
        F: FnOnce(&Row<'_>) -> Result<T, Error>,
    {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = 1u64,
        );
        let _guard = span.enter();
        let mut stmt = self.conn.prepare_cached(sql)?;
        stmt.query_row(params, f)
    }

    /// Run a `SELECT count(*)` style query and report whether it counted anything.
    pub fn exists(&self, sql: &str, params: &[&dyn ToSql]) -> Result<bool, Error> {
        let count: i64 = self.query_row(sql, params, |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Drop every cached prepared statement.
    ///
    /// DuckDB invalidates prepared statements when a table they touch is
    /// altered, so this runs after column drops and renames.
    pub fn flush_prepared_statement_cache(&self) {
        tracing::debug!("flushing prepared statement cache");
        self.conn.flush_prepared_statement_cache();
    }

    /// Get the inner connection (for cases where you need the raw connection).
    pub fn inner(&self) -> &'a Connection {
        self.conn
    }
}

/// Extension trait to get a traced wrapper from a connection.
pub trait ConnectionExt {
    /// Wrap this connection in a `TracedConn` for query logging.
    fn traced(&self) -> TracedConn<'_>;
}

impl ConnectionExt for Connection {
    fn traced(&self) -> TracedConn<'_> {
        TracedConn::new(self)
    }
}
