//! Database schema types for duckling.
//!
//! This crate contains the schema model that `duckling` reads when it
//! generates DuckDB DDL, plus the facet attribute grammar used to describe
//! tables on Rust structs.

use duckling_sql::{check_constraint_name, foreign_key_name, unique_constraint_name};
use indexmap::IndexMap;
use std::fmt;

mod reflect;
mod types;

pub use reflect::{TableDef, parse_fk_reference, shape_to_duck_type};
pub use types::{DuckType, type_aliases, types_match};

// Define the duckling attribute grammar using facet's macro.
// This generates:
// - `Attr` enum with all attribute variants
// - `__attr!` macro for parsing attributes
// - Re-exports for use as `duckling::table`, `duckling::pk`, etc.
facet::define_attr_grammar! {
    ns "duckling";
    crate_path ::duckling;

    /// Duckling schema attribute types.
    pub enum Attr {
        /// Marks a struct as a database table.
        ///
        /// Usage: `#[facet(duckling::table = "table_name")]` or
        /// `#[facet(duckling::table = "schema.table_name")]`
        Table(&'static str),

        /// Marks a field as (part of) the primary key.
        ///
        /// Usage: `#[facet(duckling::pk)]`
        Pk,

        /// Adds a UNIQUE constraint on the column.
        ///
        /// Usage: `#[facet(duckling::unique)]`
        Unique,

        /// Marks a field as a foreign key reference.
        ///
        /// Usage: `#[facet(duckling::fk = "other_table.column")]`
        Fk(&'static str),

        /// Marks a field as not null (explicit, inferred for non-Option types).
        ///
        /// Usage: `#[facet(duckling::not_null)]`
        NotNull,

        /// Sets a default value expression for the column.
        ///
        /// Usage: `#[facet(duckling::default = "current_timestamp")]`
        Default(&'static str),

        /// Overrides the column name (default: the field name).
        ///
        /// Usage: `#[facet(duckling::column = "column_name")]`
        Column(&'static str),

        /// Overrides the column type with raw SQL.
        ///
        /// Usage: `#[facet(duckling::sql_type = "VARCHAR(255)")]`
        SqlType(&'static str),

        /// Backs the column with a sequence (`DEFAULT nextval(...)`).
        ///
        /// Implied for an integer primary key named `id`.
        ///
        /// Usage: `#[facet(duckling::auto)]`
        Auto,

        /// Column comment, stored with `COMMENT ON COLUMN`.
        ///
        /// Usage: `#[facet(duckling::comment = "shown in the catalog")]`
        Comment(&'static str),

        /// Leaves the field out of the table entirely.
        ///
        /// Usage: `#[facet(duckling::ignore)]`
        Ignore,

        /// Creates an index on a single column (field-level).
        ///
        /// Usage: `#[facet(duckling::index)]` or `#[facet(duckling::index = "index_name")]`
        Index(Option<&'static str>),

        /// Creates a unique index on a single column (field-level).
        ///
        /// Usage: `#[facet(duckling::unique_index)]` or `#[facet(duckling::unique_index = "name")]`
        UniqueIndex(Option<&'static str>),

        /// Creates an index on one or more columns (container-level).
        ///
        /// Usage:
        /// - `#[facet(duckling::composite_index(columns = "col1,col2"))]`
        /// - `#[facet(duckling::composite_index(name = "idx_foo", columns = "col1,col2"))]`
        /// - `#[facet(duckling::composite_index(columns = "embedding", using = "HNSW"))]`
        CompositeIndex(CompositeIndex),

        /// Creates a unique index on one or more columns (container-level).
        ///
        /// Usage: `#[facet(duckling::composite_unique(columns = "col1,col2"))]`
        CompositeUnique(CompositeUnique),

        /// Creates a CHECK constraint (container-level).
        ///
        /// Usage:
        /// - `#[facet(duckling::check(expr = "price >= 0"))]` - auto-named constraint
        /// - `#[facet(duckling::check(name = "chk_price", expr = "price >= 0"))]`
        Check(Check),
    }

    /// Composite index definition for multi-column indices.
    pub struct CompositeIndex {
        /// Optional index name (auto-generated if not provided)
        pub name: Option<&'static str>,
        /// Comma-separated column names
        pub columns: &'static str,
        /// Optional index method, rendered as `USING method(...)`
        pub using: Option<&'static str>,
    }

    /// Composite unique index definition.
    pub struct CompositeUnique {
        /// Optional index name (auto-generated if not provided)
        pub name: Option<&'static str>,
        /// Comma-separated column names
        pub columns: &'static str,
    }

    /// CHECK constraint definition.
    pub struct Check {
        /// Optional constraint name (auto-generated if not provided)
        pub name: Option<&'static str>,
        /// SQL expression for CHECK(...)
        pub expr: &'static str,
    }
}

/// Errors produced while turning reflected types into tables.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("type {type_name} is not a table (missing duckling::table or not a struct)")]
    NotATable { type_name: String },

    #[error("unsupported type '{rust_type}' for column '{column}' in table '{table}'")]
    UnsupportedType {
        table: String,
        column: String,
        rust_type: String,
    },

    #[error(
        "invalid foreign key '{reference}' on '{table}.{column}', expected 'table.column' or 'table(column)'"
    )]
    InvalidForeignKey {
        table: String,
        column: String,
        reference: String,
    },
}

/// A database column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Rust field name, when the column was reflected from a struct
    pub field: Option<String>,
    /// DuckDB type
    pub sql_type: DuckType,
    /// Whether the column allows NULL
    pub nullable: bool,
    /// Default value expression (if any)
    pub default: Option<String>,
    /// Whether this is (part of) the primary key
    pub primary_key: bool,
    /// Whether this has a unique constraint
    pub unique: bool,
    /// Whether values come from the column's sequence
    pub auto_increment: bool,
    /// Catalog comment
    pub comment: Option<String>,
    /// Doc comment (if any)
    pub doc: Option<String>,
}

impl Column {
    /// A NOT NULL column with no constraints.
    pub fn new(name: impl Into<String>, sql_type: DuckType) -> Self {
        Self {
            name: name.into(),
            field: None,
            sql_type,
            nullable: false,
            default: None,
            primary_key: false,
            unique: false,
            auto_increment: false,
            comment: None,
            doc: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn with_default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// The comment as stored in the catalog: surrounding quotes removed,
    /// `None` when empty.
    pub fn comment_text(&self) -> Option<&str> {
        self.comment
            .as_deref()
            .map(|c| c.trim_matches('\'').trim_matches('"'))
            .filter(|c| !c.is_empty())
    }

    /// Whether `name` refers to this column, by column name or field name.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.field.as_deref() == Some(name)
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKey {
    /// Column(s) in this table
    pub columns: Vec<String>,
    /// Referenced table
    pub references_table: String,
    /// Referenced column(s)
    pub references_columns: Vec<String>,
}

/// A database index.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    /// Index name
    pub name: String,
    /// Column(s) in the index
    pub columns: Vec<String>,
    /// Whether this is a unique index
    pub unique: bool,
    /// Index method, e.g. `HNSW` from the vss extension
    pub using: Option<String>,
    /// Comment, only rendered for indexes declared inside CREATE TABLE
    pub comment: Option<String>,
    /// Trailing option text, only rendered for inline indexes
    pub option: Option<String>,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            unique: false,
            using: None,
            comment: None,
            option: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// The keyword placed before `INDEX`, if any.
    pub fn class(&self) -> Option<&'static str> {
        self.unique.then_some("UNIQUE")
    }
}

/// A table CHECK constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckConstraint {
    pub name: String,
    pub expr: String,
}

/// A single-column UNIQUE constraint, derived from a unique column.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueConstraint {
    pub name: String,
    pub column: String,
}

/// A constraint of a table, as found by [`Table::lookup_constraint`].
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    PrimaryKey { columns: Vec<String> },
    Unique(UniqueConstraint),
    ForeignKey { name: String, fk: ForeignKey },
    Check(CheckConstraint),
}

impl Constraint {
    pub fn name(&self) -> &str {
        match self {
            Constraint::PrimaryKey { .. } => "PRIMARY KEY",
            Constraint::Unique(u) => &u.name,
            Constraint::ForeignKey { name, .. } => name,
            Constraint::Check(c) => &c.name,
        }
    }

    /// The value DuckDB reports in `duckdb_constraints().constraint_type`.
    pub fn catalog_type(&self) -> &'static str {
        match self {
            Constraint::PrimaryKey { .. } => "PRIMARY KEY",
            Constraint::Unique(_) => "UNIQUE",
            Constraint::ForeignKey { .. } => "FOREIGN KEY",
            Constraint::Check(_) => "CHECK",
        }
    }

    /// Constrained columns, empty for CHECK constraints.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Constraint::PrimaryKey { columns } => columns.iter().map(String::as_str).collect(),
            Constraint::Unique(u) => vec![u.column.as_str()],
            Constraint::ForeignKey { fk, .. } => fk.columns.iter().map(String::as_str).collect(),
            Constraint::Check(_) => Vec::new(),
        }
    }
}

/// Source location of a schema element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceLocation {
    /// Source file path
    pub file: Option<String>,
    /// Line number (1-indexed)
    pub line: Option<u32>,
    /// Column number (1-indexed)
    pub column: Option<u32>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(col)) => write!(f, "{}:{}:{}", file, line, col),
            (Some(file), Some(line), None) => write!(f, "{}:{}", file, line),
            (Some(file), None, _) => write!(f, "{}", file),
            (None, _, _) => write!(f, "<unknown>"),
        }
    }
}

/// A database table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Table name, optionally `schema.table`
    pub name: String,
    /// Columns, in declaration order
    pub columns: Vec<Column>,
    /// CHECK constraints
    pub check_constraints: Vec<CheckConstraint>,
    /// Foreign keys
    pub foreign_keys: Vec<ForeignKey>,
    /// Indices
    pub indices: Vec<Index>,
    /// Source location of the Rust struct
    pub source: SourceLocation,
    /// Doc comment from the Rust struct
    pub doc: Option<String>,
}

impl Table {
    /// An empty table, to be filled with the `with_*` builders.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            check_constraints: Vec::new(),
            foreign_keys: Vec::new(),
            indices: Vec::new(),
            source: SourceLocation::default(),
            doc: None,
        }
    }

    /// Reflect a table from a facet type annotated with `duckling::table`.
    pub fn of<T: facet::Facet<'static>>() -> Result<Self, SchemaError> {
        TableDef::new::<T>().to_table()
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indices.push(index);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn with_check(mut self, name: Option<&str>, expr: impl Into<String>) -> Self {
        let expr = expr.into();
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| check_constraint_name(&self.name, &expr));
        self.check_constraints.push(CheckConstraint { name, expr });
        self
    }

    /// Find a column by column name or Rust field name.
    pub fn lookup_column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.answers_to(name)))
    }

    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    pub fn auto_increment_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.auto_increment)
    }

    /// Single-column UNIQUE constraints, one per unique non-key column.
    pub fn unique_constraints(&self) -> Vec<UniqueConstraint> {
        self.columns
            .iter()
            .filter(|c| c.unique && !c.primary_key)
            .map(|c| UniqueConstraint {
                name: unique_constraint_name(&self.name, &c.name),
                column: c.name.clone(),
            })
            .collect()
    }

    /// Name of the constraint generated for a foreign key.
    pub fn foreign_key_name(&self, fk: &ForeignKey) -> String {
        foreign_key_name(&self.name, &fk.columns)
    }

    /// Find an index by name, or by the name of a column it covers.
    pub fn lookup_index(&self, name: &str) -> Option<&Index> {
        self.indices.iter().find(|idx| idx.name == name).or_else(|| {
            let column = self.lookup_column(name)?;
            self.indices
                .iter()
                .find(|idx| idx.columns.iter().any(|c| *c == column.name))
        })
    }

    /// Find a constraint by constraint name, or by the column it constrains.
    pub fn lookup_constraint(&self, name: &str) -> Option<Constraint> {
        let mut constraints: Vec<Constraint> = Vec::new();
        let pk: Vec<String> = self
            .primary_key_columns()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        if !pk.is_empty() {
            constraints.push(Constraint::PrimaryKey { columns: pk });
        }
        constraints.extend(self.unique_constraints().into_iter().map(Constraint::Unique));
        constraints.extend(self.foreign_keys.iter().map(|fk| Constraint::ForeignKey {
            name: self.foreign_key_name(fk),
            fk: fk.clone(),
        }));
        constraints.extend(self.check_constraints.iter().cloned().map(Constraint::Check));

        if let Some(pos) = constraints.iter().position(|c| c.name() == name) {
            return Some(constraints.swap_remove(pos));
        }

        let column = self.lookup_column(name)?.name.clone();
        constraints.into_iter().find(|c| match c {
            Constraint::Unique(u) => u.column == column,
            Constraint::ForeignKey { fk, .. } => fk.columns.contains(&column),
            _ => false,
        })
    }

    /// Tables this table references through foreign keys, excluding itself.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.references_table.as_str())
            .filter(move |t| *t != self.name)
    }
}

/// A complete database schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Tables in the schema, indexed by name, in registration order
    pub tables: IndexMap<String, Table>,
}

impl Schema {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from tables, keeping their order.
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// Get a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Iterate over all tables.
    pub fn iter_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }
}

inventory::collect!(TableDef);

/// Collect every table registered with `inventory::submit!(TableDef::new::<T>())`.
pub fn collect_schema() -> Result<Schema, SchemaError> {
    let mut tables = Vec::new();
    for def in inventory::iter::<TableDef> {
        tables.push(def.to_table()?);
    }
    Ok(Schema::from_tables(tables))
}
