//! # heapdb-common
//!
//! Common types, errors, and utilities for HeapDB.
//!
//! This crate provides the foundational types used by every HeapDB layer:
//!
//! - **Types**: column types, typed values and keys, record positions,
//!   index identities and timing wrappers
//! - **Casting**: string-encoded values to their native representation
//! - **Errors**: the shared `DbError` and stable `ErrorCode`s
//! - **Config**: engine configuration structures
//! - **Constants**: on-disk names, sentinels and limits
//!
//! ## Example
//!
//! ```rust
//! use heapdb_common::types::{ColumnType, TypeTag, Value};
//! use heapdb_common::error::DbResult;
//!
//! fn example() -> DbResult<()> {
//!     let ty = ColumnType::new(TypeTag::Int)?;
//!     let value = Value::parse(ty, "42")?;
//!     assert_eq!(value, Value::Int(42));
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cast;
pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use error::{DbError, DbResult, ErrorCode};
pub use types::{
    Attribute, ColumnType, IndexId, IndexKind, Key, RecordPos, Timed, TypeTag, Value,
};
