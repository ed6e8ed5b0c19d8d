//! Errors of positional file access.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for block file operations.
pub type IoResult<T> = Result<T, IoError>;

/// Block file errors. Path-bearing variants name the file involved.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum IoError {
    /// Any other OS error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("file already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// A read reaching past the cached end-of-file.
    #[error("short read at offset {offset}: wanted {expected} bytes, {available} available")]
    ShortRead {
        offset: u64,
        expected: usize,
        available: u64,
    },

    /// A write through a read-only handle.
    #[error("{path} is open read-only")]
    ReadOnly { path: PathBuf },
}

impl IoError {
    /// A `NotFound` for `path`.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// A `ShortRead` of `expected` bytes at `offset` in a file of `file_len`.
    pub fn short_read(offset: u64, expected: usize, file_len: u64) -> Self {
        Self::ShortRead {
            offset,
            expected,
            available: file_len.saturating_sub(offset),
        }
    }

    /// True for a missing file, with or without path context.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Attaches `path` to the common error kinds.
    pub fn from_io_with_path(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { source: err },
        }
    }
}
