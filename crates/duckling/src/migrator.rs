//! Schema operations, translated to DuckDB.
//!
//! The operation set mirrors a generic ORM migrator. Each operation is one of:
//!
//! - plain SQL that DuckDB shares with other dialects (drop/rename column),
//! - rewritten for DuckDB (sequences instead of identity columns, catalog
//!   lookups through `duckdb_*()` functions, constraints declared inside
//!   CREATE TABLE),
//! - [`Error::NotSupported`], when DuckDB has no equivalent (views,
//!   adding or dropping constraints on existing tables, renaming indexes).

use std::borrow::Cow;

use crate::introspect::{self, ColumnType};
use crate::reorder::dependency_order;
use crate::schema::{
    add_column_sql, alter_column_type_sql, comment_on_column_sql, create_index_sql,
    create_sequence_sql, create_table_sql, drop_column_sql, drop_index_sql, drop_sequence_sql,
    drop_table_sql, in_schema, rename_column_sql, rename_table_sql, set_not_null_sql,
};
use crate::{Column, Constraint, ConnectionExt, Error, Result, Table, TracedConn};
use duckling_config::Config;
use duckling_sql::{check_expr_fingerprint, qualify, split_qualified};
use tracing::{debug, info, warn};

/// Something that names a table: a bare name, or a reflected model.
///
/// Operations that only need a name accept either. Operations that need
/// the model (to look up columns, indexes or constraints) fall back to the
/// plain name when there is none.
pub trait TableRef {
    /// The table name, optionally `schema.table`.
    fn table_name(&self) -> &str;

    /// The reflected model, if this refers to one.
    fn model(&self) -> Option<&Table> {
        None
    }
}

impl TableRef for str {
    fn table_name(&self) -> &str {
        self
    }
}

impl TableRef for String {
    fn table_name(&self) -> &str {
        self
    }
}

impl TableRef for Table {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> Option<&Table> {
        Some(self)
    }
}

impl<T: TableRef + ?Sized> TableRef for &T {
    fn table_name(&self) -> &str {
        (**self).table_name()
    }

    fn model(&self) -> Option<&Table> {
        (**self).model()
    }
}

/// Applies schema operations to a DuckDB connection.
///
/// # Example
///
/// ```ignore
/// let conn = duckdb::Connection::open_in_memory()?;
/// let migrator = Migrator::new(&conn);
/// migrator.auto_migrate(&[Table::of::<User>()?, Table::of::<Post>()?])?;
/// assert!(migrator.has_table("users")?);
/// ```
pub struct Migrator<'a> {
    db: TracedConn<'a>,
    config: Config,
}

impl<'a> Migrator<'a> {
    /// A migrator with the default configuration.
    pub fn new(conn: &'a duckdb::Connection) -> Self {
        Self::with_config(conn, Config::default())
    }

    pub fn with_config(conn: &'a duckdb::Connection, config: Config) -> Self {
        Self {
            db: conn.traced(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The traced connection this migrator runs statements on.
    pub fn conn(&self) -> TracedConn<'a> {
        self.db
    }

    fn exec(&self, sql: &str) -> Result<()> {
        self.db.execute(sql, &[])?;
        Ok(())
    }

    // Database

    /// Name of the database the connection is attached to (`memory` for
    /// in-memory databases).
    pub fn current_database(&self) -> Result<String> {
        Ok(introspect::current_database(&self.db)?)
    }

    /// Resolve the schema and bare table name a table lives in.
    ///
    /// `schema.table` names carry their schema; other names use the
    /// configured schema, or `CURRENT_SCHEMA()`.
    pub fn current_schema<T: TableRef + ?Sized>(&self, table: &T) -> Result<(String, String)> {
        match split_qualified(table.table_name()) {
            (Some(schema), name) => Ok((schema.to_string(), name.to_string())),
            (None, name) => Ok((self.default_schema()?, name.to_string())),
        }
    }

    fn default_schema(&self) -> Result<String> {
        match &self.config.schema {
            Some(schema) => Ok(schema.clone()),
            None => Ok(introspect::current_schema(&self.db)?),
        }
    }

    /// The name DDL uses for a table: unqualified names are placed in the
    /// configured schema, if any.
    fn qualified<T: TableRef + ?Sized>(&self, table: &T) -> String {
        qualify(table.table_name(), self.config.schema.as_deref())
    }

    /// The model as it is created, see [`qualified`](Self::qualified).
    fn placed<'t>(&self, table: &'t Table) -> Cow<'t, Table> {
        in_schema(table, self.config.schema.as_deref())
    }

    /// Other names DuckDB uses for the type `name`.
    pub fn type_aliases(&self, name: &str) -> &'static [&'static str] {
        duckling_schema::type_aliases(name)
    }

    // Tables

    /// Create tables, with their sequences, indexes and column comments.
    ///
    /// Referenced tables are created first.
    pub fn create_table(&self, tables: &[Table]) -> Result<()> {
        for table in self.ordered(tables) {
            let placed = self.placed(table);
            info!(table = %placed.name, "creating table");

            for col in placed.auto_increment_columns() {
                self.exec(&create_sequence_sql(&placed, col))?;
            }

            self.exec(&create_table_sql(&placed, &self.config))?;

            if !self.config.inline_indexes {
                for idx in &table.indices {
                    self.create_index(table, &idx.name)?;
                }
            }

            for col in &placed.columns {
                if let Some(comment) = col.comment_text() {
                    self.exec(&comment_on_column_sql(&placed.name, &col.name, Some(comment)))?;
                }
            }
        }
        Ok(())
    }

    /// Drop tables, dependents first, together with their sequences.
    pub fn drop_table<T: TableRef>(&self, tables: &[T]) -> Result<()> {
        for table in self.ordered(tables).into_iter().rev() {
            let name = self.qualified(table);
            info!(table = %name, "dropping table");
            self.exec(&drop_table_sql(&name))?;

            if let Some(model) = table.model() {
                let placed = self.placed(model);
                for col in placed.auto_increment_columns() {
                    self.exec(&drop_sequence_sql(&placed, col))?;
                }
            }
        }
        Ok(())
    }

    pub fn has_table<T: TableRef + ?Sized>(&self, table: &T) -> Result<bool> {
        let (schema, name) = self.current_schema(table)?;
        Ok(introspect::table_exists(&self.db, &schema, &name)?)
    }

    /// Rename a table. Does nothing when `from` does not exist.
    pub fn rename_table<F, T>(&self, from: &F, to: &T) -> Result<()>
    where
        F: TableRef + ?Sized,
        T: TableRef + ?Sized,
    {
        if !self.has_table(from)? {
            debug!(table = %from.table_name(), "rename skipped, table does not exist");
            return Ok(());
        }
        self.exec(&rename_table_sql(&self.qualified(from), to.table_name()))?;
        self.db.flush_prepared_statement_cache();
        Ok(())
    }

    /// Base tables of the default schema.
    pub fn get_tables(&self) -> Result<Vec<String>> {
        let schema = self.default_schema()?;
        Ok(introspect::list_tables(&self.db, &schema)?)
    }

    // Columns

    /// Add a model column to an existing table.
    ///
    /// DuckDB rejects constraints in `ADD COLUMN`, so NOT NULL is applied
    /// afterwards (only when a default fills existing rows), and the comment
    /// is set separately. UNIQUE and PRIMARY KEY cannot be added at all.
    pub fn add_column<T: TableRef + ?Sized>(&self, table: &T, name: &str) -> Result<()> {
        let (model, column) = self.lookup_column(table, name)?;
        let placed = self.placed(model);

        if column.primary_key || column.unique {
            warn!(
                table = %model.name,
                column = %column.name,
                "DuckDB cannot add constrained columns, adding without the constraint"
            );
        }

        if column.auto_increment {
            self.exec(&create_sequence_sql(&placed, column))?;
        }
        self.exec(&add_column_sql(&placed, column))?;

        let has_default = column.default.is_some() || column.auto_increment;
        if !column.nullable && has_default {
            self.exec(&set_not_null_sql(&placed.name, &column.name, true))?;
        }

        if let Some(comment) = column.comment_text() {
            self.exec(&comment_on_column_sql(&placed.name, &column.name, Some(comment)))?;
        }

        self.db.flush_prepared_statement_cache();
        Ok(())
    }

    /// Change a column's type to the model's.
    pub fn alter_column<T: TableRef + ?Sized>(&self, table: &T, name: &str) -> Result<()> {
        let (model, column) = self.lookup_column(table, name)?;
        self.exec(&alter_column_type_sql(&self.qualified(model), column))?;
        self.db.flush_prepared_statement_cache();
        Ok(())
    }

    pub fn drop_column<T: TableRef + ?Sized>(&self, table: &T, name: &str) -> Result<()> {
        let column = resolve_column(table, name);
        self.exec(&drop_column_sql(&self.qualified(table), column))?;
        self.db.flush_prepared_statement_cache();
        Ok(())
    }

    pub fn rename_column<T: TableRef + ?Sized>(&self, table: &T, from: &str, to: &str) -> Result<()> {
        let from = resolve_column(table, from);
        let to = resolve_column(table, to);
        self.exec(&rename_column_sql(&self.qualified(table), from, to))?;
        self.db.flush_prepared_statement_cache();
        Ok(())
    }

    /// Bring an existing column in line with the model.
    ///
    /// Primary key and unique columns are left alone, DuckDB cannot alter
    /// columns that carry those constraints. NOT NULL is only set when no
    /// row holds NULL, since a default does not fill existing rows. The
    /// comment is compared (quotes trimmed) and updated for every column.
    pub fn migrate_column(
        &self,
        table: &Table,
        column: &Column,
        existing: &ColumnType,
    ) -> Result<()> {
        let name = self.qualified(table);
        if column.primary_key || column.unique {
            debug!(table = %table.name, column = %column.name, "constrained column, not altering");
        } else {
            let wanted = column.sql_type.to_string();
            if !duckling_schema::types_match(&wanted, &existing.data_type) {
                info!(
                    table = %table.name,
                    column = %column.name,
                    from = %existing.data_type,
                    to = %wanted,
                    "altering column type"
                );
                self.exec(&alter_column_type_sql(&name, column))?;
            }

            match (column.nullable, existing.nullable) {
                (true, false) => {
                    self.exec(&set_not_null_sql(&name, &column.name, false))?;
                }
                (false, true) if existing.default.is_none() && column.default.is_none() => {
                    warn!(
                        table = %table.name,
                        column = %column.name,
                        "column has no default, leaving it nullable"
                    );
                }
                (false, true) if introspect::has_nulls(&self.db, &name, &column.name)? => {
                    warn!(
                        table = %table.name,
                        column = %column.name,
                        "column holds NULL rows, leaving it nullable"
                    );
                }
                (false, true) => {
                    self.exec(&set_not_null_sql(&name, &column.name, true))?;
                }
                _ => {}
            }
        }

        if let Some(wanted) = column.comment_text()
            && existing.comment.as_deref().unwrap_or_default() != wanted
        {
            self.exec(&comment_on_column_sql(&name, &column.name, Some(wanted)))?;
        }

        self.db.flush_prepared_statement_cache();
        Ok(())
    }

    /// Whether a column exists, by column name or model field name.
    pub fn has_column<T: TableRef + ?Sized>(&self, table: &T, name: &str) -> Result<bool> {
        let column = resolve_column(table, name);
        let (schema, table) = self.current_schema(table)?;
        Ok(introspect::column_exists(&self.db, &schema, &table, column)?)
    }

    /// Columns of a table as the catalog reports them, in declaration order.
    pub fn column_types<T: TableRef + ?Sized>(&self, table: &T) -> Result<Vec<ColumnType>> {
        let (schema, table) = self.current_schema(table)?;
        Ok(introspect::list_columns(&self.db, &schema, &table)?)
    }

    // Views

    pub fn create_view(&self, _name: &str, _query: &str) -> Result<()> {
        Err(Error::NotSupported("create_view"))
    }

    pub fn drop_view(&self, _name: &str) -> Result<()> {
        Err(Error::NotSupported("drop_view"))
    }

    // Constraints

    /// Whether a constraint exists, by constraint name or by the column it
    /// constrains.
    ///
    /// DuckDB forgets user-supplied constraint names, so model constraints
    /// are matched by structure: type and columns, or the CHECK expression.
    /// Names the model does not know are looked up by name.
    pub fn has_constraint<T: TableRef + ?Sized>(&self, table: &T, name: &str) -> Result<bool> {
        let constraint = table.model().and_then(|m| m.lookup_constraint(name));
        let (schema, table_name) = self.current_schema(table)?;

        match constraint {
            Some(Constraint::Check(check)) => {
                let wanted = check_expr_fingerprint(&check.expr);
                let found = introspect::check_expressions(&self.db, &schema, &table_name)?;
                Ok(found.iter().any(|expr| check_expr_fingerprint(expr) == wanted))
            }
            Some(constraint) => Ok(introspect::constraint_covers(
                &self.db,
                &schema,
                &table_name,
                constraint.catalog_type(),
                &constraint.columns(),
            )?),
            None => Ok(introspect::constraint_named(
                &self.db,
                &schema,
                &table_name,
                name,
            )?),
        }
    }

    /// DuckDB has no `ALTER TABLE ... ADD CONSTRAINT`.
    pub fn create_constraint<T: TableRef + ?Sized>(&self, _table: &T, _name: &str) -> Result<()> {
        Err(Error::NotSupported("create_constraint"))
    }

    /// DuckDB has no `ALTER TABLE ... DROP CONSTRAINT`.
    pub fn drop_constraint<T: TableRef + ?Sized>(&self, _table: &T, _name: &str) -> Result<()> {
        Err(Error::NotSupported("drop_constraint"))
    }

    // Indexes

    /// Create a model index, found by index name or by a column it covers.
    pub fn create_index<T: TableRef + ?Sized>(&self, table: &T, name: &str) -> Result<()> {
        let not_created = || Error::IndexNotCreated {
            name: name.to_string(),
        };
        let model = table.model().ok_or_else(not_created)?;
        let idx = model.lookup_index(name).ok_or_else(not_created)?;

        debug!(table = %model.name, index = %idx.name, "creating index");
        self.exec(&create_index_sql(&self.placed(model), idx))?;

        if !self.has_index(table, &idx.name)? {
            return Err(not_created());
        }
        Ok(())
    }

    pub fn drop_index<T: TableRef + ?Sized>(&self, table: &T, name: &str) -> Result<()> {
        let name = resolve_index(table, name);
        self.exec(&drop_index_sql(&self.qualified(table), name))?;
        self.db.flush_prepared_statement_cache();
        Ok(())
    }

    pub fn rename_index<T: TableRef + ?Sized>(&self, _table: &T, _from: &str, _to: &str) -> Result<()> {
        Err(Error::NotSupported("rename_index"))
    }

    pub fn has_index<T: TableRef + ?Sized>(&self, table: &T, name: &str) -> Result<bool> {
        let name = resolve_index(table, name);
        let (schema, table) = self.current_schema(table)?;
        Ok(introspect::index_exists(&self.db, &schema, &table, name)?)
    }

    /// Names of the indexes on a table, excluding the ones backing
    /// PRIMARY KEY and UNIQUE constraints.
    pub fn get_indexes<T: TableRef + ?Sized>(&self, table: &T) -> Result<Vec<String>> {
        let (schema, table) = self.current_schema(table)?;
        Ok(introspect::list_indexes(&self.db, &schema, &table)?)
    }

    // Auto-migration

    /// Create missing tables and bring existing ones in line with their models.
    ///
    /// Existing tables get missing columns and indexes. Constraints that are
    /// missing from an existing table are logged, since DuckDB cannot add
    /// them after the fact.
    pub fn auto_migrate(&self, tables: &[Table]) -> Result<()> {
        for table in self.ordered(tables) {
            if !self.has_table(table)? {
                self.create_table(std::slice::from_ref(table))?;
                continue;
            }

            debug!(table = %table.name, "table exists, migrating columns");
            let existing = self.column_types(table)?;
            for column in &table.columns {
                match existing
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(&column.name))
                {
                    Some(found) => self.migrate_column(table, column, found)?,
                    None => {
                        info!(table = %table.name, column = %column.name, "adding column");
                        self.add_column(table, &column.name)?;
                    }
                }
            }

            let mut constraints: Vec<String> = table
                .unique_constraints()
                .into_iter()
                .map(|u| u.name)
                .collect();
            constraints.extend(table.check_constraints.iter().map(|c| c.name.clone()));
            if self.config.emit_foreign_keys() {
                constraints.extend(table.foreign_keys.iter().map(|fk| table.foreign_key_name(fk)));
            }
            for name in constraints {
                if !self.has_constraint(table, &name)? {
                    warn!(
                        table = %table.name,
                        constraint = %name,
                        "constraint is missing, DuckDB cannot add constraints to existing tables"
                    );
                }
            }

            for idx in &table.indices {
                if !self.has_index(table, &idx.name)? {
                    self.create_index(table, &idx.name)?;
                }
            }
        }
        Ok(())
    }

    fn ordered<'t, T: TableRef>(&self, tables: &'t [T]) -> Vec<&'t T> {
        if self.config.ignore_relationships {
            tables.iter().collect()
        } else {
            dependency_order(tables)
        }
    }

    fn lookup_column<'t, T: TableRef + ?Sized>(
        &self,
        table: &'t T,
        name: &str,
    ) -> Result<(&'t Table, &'t Column)> {
        let not_found = || Error::ColumnNotFound {
            table: table.table_name().to_string(),
            name: name.to_string(),
        };
        let model = table.model().ok_or_else(not_found)?;
        let column = model.lookup_column(name).ok_or_else(not_found)?;
        Ok((model, column))
    }
}

/// Column name for a column or field name, falling back to `name` itself.
fn resolve_column<'t, T: TableRef + ?Sized>(table: &'t T, name: &'t str) -> &'t str {
    table
        .model()
        .and_then(|m| m.lookup_column(name))
        .map(|c| c.name.as_str())
        .unwrap_or(name)
}

/// Index name for an index or column name, falling back to `name` itself.
fn resolve_index<'t, T: TableRef + ?Sized>(table: &'t T, name: &'t str) -> &'t str {
    table
        .model()
        .and_then(|m| m.lookup_index(name))
        .map(|i| i.name.as_str())
        .unwrap_or(name)
}
