//! Query results.

use std::fmt;
use std::time::Duration;

use heapdb_common::ColumnType;
use heapdb_storage::Record;

use crate::error::EngineResult;

/// Where a query spent its time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryTimings {
    /// Time spent in index lookups.
    pub index: Duration,
    /// Time spent reading the heap.
    pub heap: Duration,
}

impl QueryTimings {
    /// Index plus heap time.
    pub fn total(&self) -> Duration {
        self.index + self.heap
    }
}

/// Rows returned by a search, projected to the selected columns.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// Names of the returned columns, in table order.
    pub columns: Vec<String>,
    /// Types of the returned columns.
    pub types: Vec<ColumnType>,
    /// Matching rows.
    pub rows: Vec<Record>,
    /// Elapsed time per layer.
    pub timings: QueryTimings,
}

impl QueryResponse {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders every row as text.
    pub fn to_strings(&self) -> EngineResult<Vec<Vec<String>>> {
        self.rows
            .iter()
            .map(|row| Ok(row.to_strings(&self.types)?))
            .collect()
    }
}

/// Comma-separated header line followed by one line per row.
impl fmt::Display for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join(","))?;
        for row in &self.rows {
            match row.to_strings(&self.types) {
                Ok(fields) => writeln!(f, "{}", fields.join(","))?,
                Err(_) => writeln!(f, "<undecodable row>")?,
            }
        }
        Ok(())
    }
}
