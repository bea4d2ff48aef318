use duckling_schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// The operation has no DuckDB equivalent.
    #[error("DuckDB does not support this operation: {0}")]
    NotSupported(&'static str),

    #[error("failed to create index with name {name}")]
    IndexNotCreated { name: String },

    #[error("failed to look up field with name {name} on table {table}")]
    ColumnNotFound { table: String, name: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl Error {
    /// Whether this is the "not supported" sentinel.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Error::NotSupported(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
