// ABOUTME: Typed error taxonomy for the dump engine
// ABOUTME: Classifies catalog, schema, row-stream, formatting and output failures

use thiserror::Error;

/// Result type alias using the dump engine's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while streaming statements or assembling a dump.
///
/// Every variant is fatal for the dump in progress; nothing in the engine
/// retries or skips past one.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to read row: {0}")]
    RowRead(#[source] rusqlite::Error),

    #[error("Row stream failed: {0}")]
    Stream(String),

    #[error("Cannot submit statement: {0}")]
    NoRuntime(String),

    #[error("Unexpected schema for table '{table}': {reason}")]
    Schema { table: String, reason: String },

    #[error("Unsupported cell value: {0}")]
    UnsupportedValue(String),

    #[error("Float value {0} has no SQL literal form")]
    UnrepresentableFloat(f64),

    #[error("Invalid database path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to write dump output: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Catalog,
    Schema,
    RowStream,
    Formatting,
    Output,
    Config,
}

impl Error {
    pub fn schema(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Database(_) | Self::NoRuntime(_) | Self::InvalidPath(_) => ErrorKind::Catalog,
            Self::RowRead(_) | Self::Stream(_) => ErrorKind::RowStream,
            Self::Schema { .. } => ErrorKind::Schema,
            Self::UnsupportedValue(_) | Self::UnrepresentableFloat(_) => ErrorKind::Formatting,
            Self::Io(_) => ErrorKind::Output,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}
