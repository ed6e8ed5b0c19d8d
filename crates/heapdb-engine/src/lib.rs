//! # heapdb-engine
//!
//! The coordinator of a HeapDB data directory.
//!
//! An [`Engine`] owns every table: its heap file, the mandatory Sequential
//! index over the primary key and any number of secondary indexes
//! (Sequential, AVL or ISAM) over INT, FLOAT and VARCHAR columns. It
//! routes typed operations across them:
//!
//! - `add` / `insert`: primary uniqueness first, then the heap, then every
//!   secondary index
//! - `search` / `range_search`: index lookup (or a scan for unindexed
//!   columns), heap read, predicate, projection
//! - `remove`: primary index, heap tombstone, then every secondary index
//! - `bulk_insert` / `load_csv`: one heap pass and parallel index loads
//!
//! ## Example
//!
//! ```rust
//! use heapdb_common::config::EngineConfig;
//! use heapdb_common::{Attribute, ColumnType};
//! use heapdb_engine::{accept_all, Engine};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let engine = Engine::open(EngineConfig::for_testing(dir.path())).unwrap();
//! engine
//!     .create_table(
//!         "t",
//!         "id",
//!         vec![ColumnType::int(), ColumnType::float()],
//!         vec!["id".into(), "v".into()],
//!     )
//!     .unwrap();
//!
//! let row = engine.record_from_strings("t", &["7", "0.5"]).unwrap();
//! assert!(engine.add("t", &row).unwrap());
//!
//! let hit = engine
//!     .search("t", &Attribute::new("id", "7"), accept_all(), &["v"])
//!     .unwrap();
//! assert_eq!(hit.to_strings().unwrap(), vec![vec!["0.5".to_string()]]);
//! engine.close().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bulk;
mod engine;
mod error;
mod layout;
mod predicate;
mod response;
mod table;

pub use bulk::{BulkLoadReport, RejectedRow};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use predicate::{accept_all, Comparison, Predicate};
pub use response::{QueryResponse, QueryTimings};

pub use heapdb_common::{Attribute, ColumnType, IndexId, IndexKind, Key, RecordPos, TypeTag, Value};
pub use heapdb_storage::{HeapStats, Record, TableSchema};
