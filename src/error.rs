//! Typed errors for query compilation, execution, and materialization.

use std::time::Duration;
use thiserror::Error;

/// Failure while converting a driver column value into a typed value.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("cannot decode {type_name} literal {literal:?}")]
    Parse { type_name: String, literal: String },
    #[error("unsupported column type {0}")]
    UnsupportedType(String),
    #[error("column {index}: {source}")]
    Column {
        index: usize,
        #[source]
        source: sqlx::Error,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    /// Schema introspection failed; the model never becomes usable.
    #[error("initializing model for table {table}: {source}")]
    Init {
        table: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("relation cycle: table {0} already appears in the relation graph")]
    RelationCycle(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("statement timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Zero rows where exactly one was required. Distinguishable from
    /// execution errors so callers can render an empty result instead.
    #[error("no records found")]
    NoRecords,
    #[error("column {0} not present in result row")]
    MissingColumn(String),
    #[error("password hashing: {0}")]
    PasswordHash(String),
}
