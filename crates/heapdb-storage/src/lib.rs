//! # heapdb-storage
//!
//! Record storage for HeapDB.
//!
//! This crate implements the per-table heap file:
//! - Positional block file I/O
//! - A fixed-width record codec with no separators or length prefixes
//! - Append-only heap files with in-place tombstones and a deleted chain
//! - Versioned, checksummed table metadata

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Positional file I/O
pub mod file;

/// Records and the fixed-width row codec
pub mod record;

/// Heap files and table metadata
pub mod heap;

mod error;

pub use error::{StorageError, StorageResult};
pub use heap::{HeapFile, HeapStats, TableMetadata, TableSchema};
pub use record::{Record, RecordStatus, RowCodec, SlotHeader, SLOT_HEADER_SIZE};
