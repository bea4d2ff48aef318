//! DuckDB schema migrations for Rust, powered by facet reflection.
//!
//! This crate provides:
//! - Table models as plain structs, described with `#[facet(duckling::...)]`
//! - A [`Migrator`] that creates and evolves tables in DuckDB's dialect
//! - DDL generation for a whole schema ([`SchemaCodegen::to_sql`])
//!
//! # Models
//!
//! ```ignore
//! use facet::Facet;
//!
//! #[derive(Facet)]
//! #[facet(duckling::table = "users")]
//! pub struct User {
//!     #[facet(duckling::pk)]
//!     pub id: i64,
//!
//!     #[facet(duckling::unique)]
//!     pub email: String,
//!
//!     #[facet(duckling::default = "current_timestamp")]
//!     pub created_at: jiff::Timestamp,
//! }
//!
//! inventory::submit!(duckling::TableDef::new::<User>());
//! ```
//!
//! An integer primary key named `id` is backed by a sequence
//! (`users_id_seq`), so inserts can leave it out.
//!
//! # Migrating
//!
//! ```ignore
//! let conn = duckdb::Connection::open_in_memory()?;
//! let schema = duckling::collect_schema()?;
//! let tables: Vec<_> = schema.tables.into_values().collect();
//! duckling::Migrator::new(&conn).auto_migrate(&tables)?;
//! ```
//!
//! # DuckDB limitations
//!
//! Views are not managed here, and DuckDB cannot add or drop constraints on
//! existing tables or rename indexes. Those operations return
//! [`Error::NotSupported`].

mod error;
mod introspect;
mod migrator;
pub mod reorder;
pub mod schema;
mod traced;

pub use duckling_config::{Config, ConfigError};
pub use error::{Error, Result};
pub use introspect::ColumnType;
pub use migrator::{Migrator, TableRef};
pub use schema::{
    CheckConstraint, Column, Constraint, DuckType, ForeignKey, Index, Schema, SchemaCodegen,
    SourceLocation, Table, TableDef, UniqueConstraint, collect_schema,
};
pub use traced::{ConnectionExt, TracedConn};

pub use duckling_schema::SchemaError;

// Re-export attr grammar
pub use duckling_schema::{__attr, __parse_attr, Attr};

// Re-exported for `inventory::submit!` in downstream crates
pub use inventory;
