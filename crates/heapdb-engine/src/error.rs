//! Engine error types.

use heapdb_common::{DbError, ErrorCode, IndexKind, TypeTag};
use heapdb_index::IndexError;
use heapdb_storage::StorageError;
use thiserror::Error;

/// Engine result type.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by [`Engine`](crate::Engine) operations.
///
/// None of them leave a table half-written: a failed write either never
/// touched disk or was rolled back before returning.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Heap file or block I/O failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Index failure.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Type, casting or configuration error.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Table not found.
    #[error("table not found: {0}")]
    TableNotFound(String),

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

    /// No row has the key.
    #[error("key {key} not found in table '{table}'")]
    KeyNotFound {
        /// Table name.
        table: String,
        /// Rendered key.
        key: String,
    },

    /// A row with the primary key already exists.
    #[error("duplicate primary key {key} in table '{table}'")]
    DuplicateKey {
        /// Table name.
        table: String,
        /// Rendered key.
        key: String,
    },

    /// The index already exists.
    #[error("{kind} index on '{table}.{column}' already exists")]
    IndexExists {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Index kind.
        kind: IndexKind,
    },

    /// The index does not exist.
    #[error("no {kind} index on '{table}.{column}'")]
    IndexNotFound {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Index kind.
        kind: IndexKind,
    },

    /// The column's type cannot be indexed or used as a primary key.
    #[error("column '{table}.{column}' of type {tag} cannot be indexed")]
    NotIndexable {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Column type.
        tag: TypeTag,
    },

    /// Range bounds name different columns.
    #[error("range bounds name different columns: '{begin}' and '{end}'")]
    CrossColumnRange {
        /// Column of the lower bound.
        begin: String,
        /// Column of the upper bound.
        end: String,
    },

    /// The table failed to load and is quarantined until repaired.
    #[error("table '{table}' is corrupted: {reason}")]
    TableCorrupted {
        /// Table name.
        table: String,
        /// Load failure.
        reason: String,
    },

    /// Request rejected before touching any table.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A bulk index worker panicked.
    #[error("index worker failed: {0}")]
    WorkerFailed(String),
}

impl From<std::io::Error> for EngineError {
    fn from(source: std::io::Error) -> Self {
        EngineError::Storage(source.into())
    }
}

impl EngineError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Storage(e) => e.code(),
            Self::Index(e) => e.code(),
            Self::Db(e) => e.code(),
            Self::TableNotFound(_) => ErrorCode::TableNotFound,
            Self::TableExists(_) => ErrorCode::TableExists,
            Self::ColumnNotFound { .. } => ErrorCode::ColumnNotFound,
            Self::KeyNotFound { .. } => ErrorCode::KeyNotFound,
            Self::DuplicateKey { .. } => ErrorCode::KeyExists,
            Self::IndexExists { .. } => ErrorCode::IndexExists,
            Self::IndexNotFound { .. } => ErrorCode::IndexNotFound,
            Self::NotIndexable { .. } => ErrorCode::NotIndexable,
            Self::CrossColumnRange { .. } => ErrorCode::CrossColumnRange,
            Self::TableCorrupted { .. } => ErrorCode::Corruption,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::WorkerFailed(_) => ErrorCode::Internal,
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns true for "does not exist" errors.
    pub fn is_not_found(&self) -> bool {
        self.code().is_not_found()
    }
}
