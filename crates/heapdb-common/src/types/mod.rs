//! Core types for HeapDB.
//!
//! This module provides the fundamental types used throughout the database:
//! - `TypeTag` / `ColumnType`: the closed set of column types and their widths
//! - `Value` / `Key`: typed values and the indexable subset of them
//! - `RecordPos`, `IndexKind`, `IndexId`, `Attribute`: identities and positions
//! - `Timed`: a result paired with the wall time it took

mod column;
mod ids;
mod timing;
mod value;

pub use column::{ColumnType, TypeTag};
pub use ids::{Attribute, IndexId, IndexKind, RecordPos};
pub use timing::Timed;
pub use value::{Key, Value};
