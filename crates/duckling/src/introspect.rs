//! Catalog queries.
//!
//! DuckDB exposes `information_schema` for the portable parts and the
//! `duckdb_*()` table functions for the rest. Every query is scoped to the
//! current database, since attached databases share the catalog views.

use crate::TracedConn;
use duckdb::{Error, params};
use duckling_sql::{quote_ident, quote_qualified};

/// A column as reported by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnType {
    /// Column name
    pub name: String,
    /// Type name, as DuckDB spells it (e.g. `BIGINT`, `TIMESTAMP WITH TIME ZONE`)
    pub data_type: String,
    /// Whether the column allows NULL
    pub nullable: bool,
    /// Default expression, if any
    pub default: Option<String>,
    /// Comment set with `COMMENT ON COLUMN`, if any
    pub comment: Option<String>,
}

pub(crate) fn current_database(db: &TracedConn<'_>) -> Result<String, Error> {
    db.query_row("SELECT CURRENT_DATABASE()", params![], |row| row.get(0))
}

pub(crate) fn current_schema(db: &TracedConn<'_>) -> Result<String, Error> {
    db.query_row("SELECT CURRENT_SCHEMA()", params![], |row| row.get(0))
}

pub(crate) fn table_exists(db: &TracedConn<'_>, schema: &str, table: &str) -> Result<bool, Error> {
    db.exists(
        "SELECT count(*) FROM information_schema.tables \
         WHERE table_catalog = CURRENT_DATABASE() AND table_schema = ? AND table_name = ? \
         AND table_type = 'BASE TABLE'",
        params![schema, table],
    )
}

pub(crate) fn list_tables(db: &TracedConn<'_>, schema: &str) -> Result<Vec<String>, Error> {
    db.query_map(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_catalog = CURRENT_DATABASE() AND table_schema = ? \
         AND table_type = 'BASE TABLE' ORDER BY table_name",
        params![schema],
        |row| row.get(0),
    )
}

pub(crate) fn column_exists(
    db: &TracedConn<'_>,
    schema: &str,
    table: &str,
    column: &str,
) -> Result<bool, Error> {
    db.exists(
        "SELECT count(*) FROM information_schema.columns \
         WHERE table_catalog = CURRENT_DATABASE() AND table_schema = ? AND table_name = ? \
         AND column_name = ?",
        params![schema, table, column],
    )
}

pub(crate) fn list_columns(
    db: &TracedConn<'_>,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnType>, Error> {
    db.query_map(
        "SELECT column_name, data_type, is_nullable, column_default, comment FROM duckdb_columns() \
         WHERE database_name = CURRENT_DATABASE() AND schema_name = ? AND table_name = ? \
         ORDER BY column_index",
        params![schema, table],
        |row| {
            Ok(ColumnType {
                name: row.get(0)?,
                data_type: row.get(1)?,
                nullable: row.get(2)?,
                default: row.get(3)?,
                comment: row.get(4)?,
            })
        },
    )
}

/// Whether a constraint of `kind` covers exactly `columns`, in order.
///
/// DuckDB does not keep user-supplied constraint names, so UNIQUE, PRIMARY
/// KEY and FOREIGN KEY constraints are matched structurally.
pub(crate) fn constraint_covers(
    db: &TracedConn<'_>,
    schema: &str,
    table: &str,
    kind: &str,
    columns: &[&str],
) -> Result<bool, Error> {
    let columns = columns.join(",");
    db.exists(
        "SELECT count(*) FROM duckdb_constraints() \
         WHERE database_name = CURRENT_DATABASE() AND schema_name = ? AND table_name = ? \
         AND constraint_type = ? AND array_to_string(constraint_column_names, ',') = ?",
        params![schema, table, kind, columns],
    )
}

/// Expressions of the CHECK constraints on a table, as DuckDB re-renders them.
pub(crate) fn check_expressions(
    db: &TracedConn<'_>,
    schema: &str,
    table: &str,
) -> Result<Vec<String>, Error> {
    db.query_map(
        "SELECT expression FROM duckdb_constraints() \
         WHERE database_name = CURRENT_DATABASE() AND schema_name = ? AND table_name = ? \
         AND constraint_type = 'CHECK' AND expression IS NOT NULL",
        params![schema, table],
        |row| row.get(0),
    )
}

pub(crate) fn constraint_named(
    db: &TracedConn<'_>,
    schema: &str,
    table: &str,
    name: &str,
) -> Result<bool, Error> {
    db.exists(
        "SELECT count(*) FROM information_schema.table_constraints \
         WHERE table_catalog = CURRENT_DATABASE() AND table_schema = ? AND table_name = ? \
         AND constraint_name = ?",
        params![schema, table, name],
    )
}

pub(crate) fn index_exists(
    db: &TracedConn<'_>,
    schema: &str,
    table: &str,
    name: &str,
) -> Result<bool, Error> {
    db.exists(
        "SELECT count(*) FROM duckdb_indexes() \
         WHERE database_name = CURRENT_DATABASE() AND schema_name = ? AND table_name = ? \
         AND index_name = ?",
        params![schema, table, name],
    )
}

pub(crate) fn list_indexes(
    db: &TracedConn<'_>,
    schema: &str,
    table: &str,
) -> Result<Vec<String>, Error> {
    db.query_map(
        "SELECT index_name FROM duckdb_indexes() \
         WHERE database_name = CURRENT_DATABASE() AND schema_name = ? AND table_name = ? \
         ORDER BY index_name",
        params![schema, table],
        |row| row.get(0),
    )
}

/// Whether any row of `table` holds NULL in `column`.
pub(crate) fn has_nulls(db: &TracedConn<'_>, table: &str, column: &str) -> Result<bool, Error> {
    let sql = format!(
        "SELECT count(*) FROM {} WHERE {} IS NULL",
        quote_qualified(table),
        quote_ident(column)
    );
    db.exists(&sql, params![])
}
