//! Index error types.

use heapdb_common::{DbError, ErrorCode, TypeTag};
use heapdb_storage::file::IoError;
use thiserror::Error;

/// Index result type.
pub type IndexResult<T> = Result<T, IndexError>;

/// Index error type.
#[derive(Debug, Error)]
pub enum IndexError {
    /// File I/O failed.
    #[error(transparent)]
    Io(#[from] IoError),

    /// Type or casting error.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A key of the wrong type was routed to an index.
    #[error("key type mismatch: index holds {expected} keys, got {actual}")]
    KeyTypeMismatch {
        /// Key type of the index.
        expected: TypeTag,
        /// Key type supplied.
        actual: TypeTag,
    },

    /// Key width does not suit the key type.
    #[error("invalid key width {width} for {tag} keys")]
    InvalidKeyWidth {
        /// Key type.
        tag: TypeTag,
        /// Width supplied.
        width: usize,
    },

    /// The index file failed validation.
    #[error("corrupted index file: {0}")]
    Corrupted(String),
}

impl From<std::io::Error> for IndexError {
    fn from(source: std::io::Error) -> Self {
        IndexError::Io(IoError::Io { source })
    }
}

impl IndexError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(e) if e.is_not_found() => ErrorCode::FileNotFound,
            Self::Io(_) => ErrorCode::Io,
            Self::Db(e) => e.code(),
            Self::KeyTypeMismatch { .. } => ErrorCode::KeyTypeMismatch,
            Self::InvalidKeyWidth { .. } => ErrorCode::InvalidArgument,
            Self::Corrupted(_) => ErrorCode::Corruption,
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}
