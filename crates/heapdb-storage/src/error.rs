//! Storage error types.

use heapdb_common::{DbError, ErrorCode, RecordPos};
use thiserror::Error;

use crate::file::IoError;

/// Storage result type.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File I/O failed.
    #[error(transparent)]
    Io(#[from] IoError),

    /// Type or casting error.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Table already exists.
    #[error("table already exists: {0}")]
    TableExists(String),

    /// Column not found.
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Position is past end-of-file or not on a slot boundary.
    #[error("invalid position {pos}: heap has {heap_len} bytes in {slot_size}-byte slots")]
    InvalidPosition {
        /// Requested position.
        pos: RecordPos,
        /// Heap data length.
        heap_len: u64,
        /// Slot size.
        slot_size: usize,
    },

    /// The record at a position is tombstoned.
    #[error("record at {0} is deleted")]
    RecordDeleted(RecordPos),

    /// A row does not match the table schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A buffer held fewer bytes than a row needs.
    #[error("truncated row: expected {expected} bytes, got {available}")]
    Truncated {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        available: usize,
    },

    /// On-disk state failed validation.
    #[error("corrupted: {0}")]
    Corrupted(String),
}

impl From<std::io::Error> for StorageError {
    fn from(source: std::io::Error) -> Self {
        StorageError::Io(IoError::Io { source })
    }
}

impl StorageError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(e) if e.is_not_found() => ErrorCode::FileNotFound,
            Self::Io(IoError::PermissionDenied { .. }) => ErrorCode::PermissionDenied,
            Self::Io(_) => ErrorCode::Io,
            Self::Db(e) => e.code(),
            Self::TableExists(_) => ErrorCode::TableExists,
            Self::ColumnNotFound { .. } => ErrorCode::ColumnNotFound,
            Self::InvalidPosition { .. } => ErrorCode::InvalidPosition,
            Self::RecordDeleted(_) => ErrorCode::RecordDeleted,
            Self::SchemaMismatch(_) => ErrorCode::SchemaMismatch,
            Self::Truncated { .. } | Self::Corrupted(_) => ErrorCode::Corruption,
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Creates a schema mismatch error.
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }
}
