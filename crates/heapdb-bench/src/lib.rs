//! HeapDB Performance Benchmarks
//!
//! This crate contains benchmarks for:
//! - Heap file appends, reads and scans
//! - Sequential, AVL and ISAM indexes
//! - End-to-end engine operations
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p heapdb-bench
//! ```

pub mod workload;
