//! Configuration for HeapDB.
//!
//! This module provides the configuration structures for the engine and
//! its index implementations.

mod engine;

pub use engine::{BulkConfig, EngineConfig, IsamConfig, SequentialConfig};
