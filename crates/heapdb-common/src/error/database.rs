//! Database error types.
//!
//! Provides the error type shared by the lower layers and the error codes
//! that the storage, index and engine errors report through `code()`.

use std::fmt;
use thiserror::Error;

use crate::types::TypeTag;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Internal error (bug).
    Internal = 0x0001,
    /// Invalid argument provided.
    InvalidArgument = 0x0002,

    // I/O errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,
    /// File not found.
    FileNotFound = 0x0101,
    /// Permission denied.
    PermissionDenied = 0x0102,
    /// Data corruption detected.
    Corruption = 0x0103,

    // Storage errors (0x0200 - 0x02FF)
    /// Position is outside the heap or not slot aligned.
    InvalidPosition = 0x0200,
    /// Record at a position has been tombstoned.
    RecordDeleted = 0x0201,
    /// Row does not match the table schema.
    SchemaMismatch = 0x0202,

    // Index errors (0x0300 - 0x03FF)
    /// Key not found.
    KeyNotFound = 0x0300,
    /// Key already exists.
    KeyExists = 0x0301,
    /// Key variant does not match the index key type.
    KeyTypeMismatch = 0x0302,
    /// Column type cannot be used as an index key.
    NotIndexable = 0x0303,
    /// Index already exists.
    IndexExists = 0x0304,
    /// Index not found.
    IndexNotFound = 0x0305,

    // Query errors (0x0400 - 0x04FF)
    /// Table not found.
    TableNotFound = 0x0400,
    /// Table already exists.
    TableExists = 0x0401,
    /// Column not found.
    ColumnNotFound = 0x0402,
    /// Malformed literal for the column type.
    MalformedLiteral = 0x0403,
    /// Range bounds name different columns.
    CrossColumnRange = 0x0404,
    /// Invalid column type declaration.
    InvalidType = 0x0405,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "I/O",
            0x02 => "Storage",
            0x03 => "Index",
            0x04 => "Query",
            _ => "Unknown",
        }
    }

    /// Returns true for "does not exist" codes.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound
                | Self::TableNotFound
                | Self::ColumnNotFound
                | Self::IndexNotFound
                | Self::FileNotFound
        )
    }

    /// Returns true for constraint violations.
    #[must_use]
    pub const fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::KeyExists | Self::TableExists | Self::IndexExists | Self::NotIndexable
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The shared error type for HeapDB's type model and configuration.
///
/// # Example
///
/// ```rust
/// use heapdb_common::error::{DbError, ErrorCode};
/// use heapdb_common::types::{ColumnType, TypeTag};
///
/// let err = ColumnType::new(TypeTag::Varchar).unwrap_err();
/// assert_eq!(err.code(), ErrorCode::InvalidType);
/// ```
#[derive(Debug, Error)]
pub enum DbError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Data corruption detected.
    #[error("data corruption detected: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    // ==========================================================================
    // Type Errors
    // ==========================================================================
    /// Column type declaration is invalid.
    #[error("invalid type: {message}")]
    InvalidType {
        /// Error message.
        message: String,
    },

    /// A string literal could not be converted to the column type.
    #[error("malformed {tag} literal '{literal}'")]
    MalformedLiteral {
        /// Target type.
        tag: TypeTag,
        /// The offending literal.
        literal: String,
    },

    /// The type cannot be used as an index key.
    #[error("type {tag} is not indexable")]
    NotIndexable {
        /// The rejected type.
        tag: TypeTag,
    },

    /// A raw field does not have the width its type requires.
    #[error("field width mismatch: expected {expected} bytes, got {actual}")]
    WidthMismatch {
        /// Width required by the type.
        expected: usize,
        /// Width supplied.
        actual: usize,
    },
}

impl DbError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::InvalidConfig { .. } => ErrorCode::InvalidArgument,
            Self::Io { .. } => ErrorCode::Io,
            Self::Corruption { .. } => ErrorCode::Corruption,
            Self::InvalidType { .. } => ErrorCode::InvalidType,
            Self::MalformedLiteral { .. } => ErrorCode::MalformedLiteral,
            Self::NotIndexable { .. } => ErrorCode::NotIndexable,
            Self::WidthMismatch { .. } => ErrorCode::SchemaMismatch,
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an invalid type error.
    #[must_use]
    pub fn invalid_type(message: impl Into<String>) -> Self {
        Self::InvalidType {
            message: message.into(),
        }
    }

    /// Creates a malformed literal error.
    #[must_use]
    pub fn malformed(tag: TypeTag, literal: impl Into<String>) -> Self {
        Self::MalformedLiteral {
            tag,
            literal: literal.into(),
        }
    }

    /// Creates a corruption error.
    #[must_use]
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }
}
