//! Bulk and CSV loading.
//!
//! Rows are validated and deduplicated up front, written to the heap in
//! one pass, then bulk-loaded into the primary index. Each indexed column
//! hands its key batch to one scoped worker per index kind; the workers
//! touch disjoint files and are all joined before the load returns.

use std::collections::{BTreeMap, HashSet};
use std::thread;
use std::time::Duration;

use heapdb_common::{IndexKind, Key, RecordPos, Timed};
use heapdb_index::IndexContainer;
use heapdb_storage::Record;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::table::Table;

/// A row left out of a bulk load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// Line number for CSV loads, input index for [`bulk_insert`](crate::Engine::bulk_insert).
    pub row: usize,
    /// Why the row was rejected.
    pub reason: String,
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Default)]
pub struct BulkLoadReport {
    /// Rows written.
    pub inserted: usize,
    /// Rows rejected, in input order.
    pub rejected: Vec<RejectedRow>,
    /// Secondary index entries refused as duplicates.
    pub secondary_conflicts: usize,
    /// Time spent writing the heap.
    pub heap_time: Duration,
    /// Time spent loading indexes.
    pub index_time: Duration,
}

impl BulkLoadReport {
    /// Number of rejected rows.
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub(crate) fn reject(&mut self, row: usize, reason: impl Into<String>) {
        self.rejected.push(RejectedRow {
            row,
            reason: reason.into(),
        });
    }
}

impl Table {
    /// Loads numbered rows. Rejections already recorded in `report` are kept.
    pub(crate) fn bulk_load(
        &mut self,
        rows: Vec<(usize, Record)>,
        parallel: bool,
        mut report: BulkLoadReport,
    ) -> EngineResult<BulkLoadReport> {
        let types = self.heap.get_types().to_vec();
        let pk_idx = self.heap.get_key_idx();

        let mut seen: HashSet<Vec<u8>> = HashSet::with_capacity(rows.len());
        let mut records = Vec::with_capacity(rows.len());
        let mut keys = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for (row, record) in rows {
            let row_values = match record.values(&types) {
                Ok(v) => v,
                Err(e) => {
                    report.reject(row, e.to_string());
                    continue;
                }
            };
            let key = Key::from_value(row_values[pk_idx].clone())?;
            let fresh = seen.insert(record.fields()[pk_idx].clone());
            if !fresh || self.primary.search(key.clone())?.value.is_some() {
                report.reject(row, format!("duplicate primary key {}", key));
                continue;
            }
            records.push(record);
            keys.push(key);
            values.push(row_values);
        }
        if records.is_empty() {
            return Ok(report);
        }

        let Timed {
            value: positions,
            elapsed,
        } = self.heap.bulk_insert(&records)?;
        report.heap_time = elapsed;
        report.inserted = positions.len();

        let primary = self
            .primary
            .bulk_insert(keys.into_iter().zip(positions.iter().copied()).collect())?;
        report.index_time += primary.elapsed;
        let refused = primary.value.iter().filter(|ok| !**ok).count();
        if refused > 0 {
            warn!(table = %self.heap.name(), refused, "primary index refused bulk entries");
        }

        for (column, kinds) in self.secondary.iter_mut() {
            let idx = self.heap.get_attribute_idx(column)?;
            let entries = values
                .iter()
                .zip(&positions)
                .map(|(row, pos)| Ok((Key::from_value(row[idx].clone())?, *pos)))
                .collect::<EngineResult<Vec<(Key, RecordPos)>>>()?;
            for (kind, timed) in load_column(kinds, entries, parallel)? {
                report.index_time += timed.elapsed;
                let conflicts = timed.value.iter().filter(|ok| !**ok).count();
                if conflicts > 0 {
                    warn!(
                        table = %self.heap.name(),
                        column = %column,
                        kind = %kind,
                        conflicts,
                        "secondary index refused duplicate keys"
                    );
                }
                report.secondary_conflicts += conflicts;
            }
        }

        info!(
            table = %self.heap.name(),
            inserted = report.inserted,
            rejected = report.rejected.len(),
            heap_ms = report.heap_time.as_millis() as u64,
            index_ms = report.index_time.as_millis() as u64,
            "bulk load finished"
        );
        Ok(report)
    }
}

/// Loads one column's batch into each of its indexes.
fn load_column(
    kinds: &mut BTreeMap<IndexKind, IndexContainer>,
    entries: Vec<(Key, RecordPos)>,
    parallel: bool,
) -> EngineResult<Vec<(IndexKind, Timed<Vec<bool>>)>> {
    if !parallel {
        return kinds
            .iter_mut()
            .map(|(kind, index)| Ok((*kind, index.bulk_insert(entries.clone())?)))
            .collect();
    }

    thread::scope(|scope| {
        let workers: Vec<_> = kinds
            .iter_mut()
            .map(|(kind, index)| {
                let batch = entries.clone();
                (*kind, scope.spawn(move || index.bulk_insert(batch)))
            })
            .collect();
        workers
            .into_iter()
            .map(|(kind, worker)| {
                let timed = worker
                    .join()
                    .map_err(|_| EngineError::WorkerFailed(format!("{} index load panicked", kind)))??;
                Ok((kind, timed))
            })
            .collect()
    })
}

/// Splits one CSV line into fields.
///
/// Quoted fields may contain commas and doubled quotes; unquoted fields are
/// trimmed.
pub(crate) fn parse_csv_line(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while chars.peek().map_or(false, |c| *c == ' ' || *c == '\t') {
            chars.next();
        }
        let mut field = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    Some('"') => break,
                    Some(c) => field.push(c),
                    None => return Err("unterminated quoted field".to_string()),
                }
            }
            while chars.peek().map_or(false, |c| *c == ' ' || *c == '\t') {
                chars.next();
            }
            match chars.next() {
                None => {
                    fields.push(field);
                    return Ok(fields);
                }
                Some(',') => fields.push(field),
                Some(c) => return Err(format!("unexpected '{}' after quoted field", c)),
            }
        } else {
            loop {
                match chars.next() {
                    None => {
                        fields.push(field.trim().to_string());
                        return Ok(fields);
                    }
                    Some(',') => break,
                    Some(c) => field.push(c),
                }
            }
            fields.push(field.trim().to_string());
        }
    }
}
