//! Error handling for HeapDB.
//!
//! This module provides the shared error type and result alias used by
//! the type model, casting and configuration, plus the stable error codes
//! every HeapDB error maps onto.

mod database;

pub use database::{DbError, ErrorCode};

/// Result type alias for HeapDB common operations.
pub type DbResult<T> = std::result::Result<T, DbError>;
