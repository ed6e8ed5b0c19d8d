//! The engine coordinator.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use heapdb_common::cast::index_cast;
use heapdb_common::config::EngineConfig;
use heapdb_common::constants::{RANGE_MAX_SENTINEL, RANGE_MIN_SENTINEL};
use heapdb_common::{
    Attribute, ColumnType, DbError, IndexId, IndexKind, Key, RecordPos, TypeTag, Value,
};
use heapdb_index::{IndexContainer, IndexOptions};
use heapdb_storage::file::IoError;
use heapdb_storage::{HeapFile, HeapStats, Record, StorageError, TableSchema};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::bulk::{parse_csv_line, BulkLoadReport};
use crate::error::{EngineError, EngineResult};
use crate::layout::{is_valid_name, Layout};
use crate::predicate::{self, Comparison, Predicate};
use crate::response::{QueryResponse, QueryTimings};
use crate::table::{build_index, Table, TableSlot};

type SharedSlot = Arc<Mutex<TableSlot>>;

/// An open HeapDB data directory.
///
/// Every table sits behind its own mutex, so writers to one table are
/// serialized while different tables proceed in parallel. The table map
/// itself is behind a read-write lock taken only to find, add or remove a
/// table.
pub struct Engine {
    config: EngineConfig,
    layout: Layout,
    options: IndexOptions,
    tables: RwLock<HashMap<String, SharedSlot>>,
}

impl Engine {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens (or initializes) the data directory and loads every table.
    ///
    /// A table that fails to load is quarantined rather than failing the
    /// open; its operations report `TableCorrupted` until
    /// [`repair_table`](Self::repair_table) succeeds.
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        config
            .validate()
            .map_err(|message| DbError::InvalidConfig { message })?;
        let layout = Layout::new(&config.data_dir);
        layout.ensure()?;
        let options = IndexOptions::from_config(&config);

        let mut tables = HashMap::new();
        let mut quarantined = 0usize;
        for name in layout.table_names()? {
            let slot = match load_table(&layout, &name, &options) {
                Ok(table) => TableSlot::Open(table),
                Err(e) => {
                    warn!(table = %name, error = %e, "quarantining table");
                    quarantined += 1;
                    TableSlot::Quarantined(e.to_string())
                }
            };
            tables.insert(name, Arc::new(Mutex::new(slot)));
        }

        info!(
            data_dir = %layout.root().display(),
            tables = tables.len(),
            quarantined,
            "engine opened"
        );
        Ok(Self {
            config,
            layout,
            options,
            tables: RwLock::new(tables),
        })
    }

    /// Flushes every table, then closes the engine.
    ///
    /// All tables are attempted; the first failure is returned.
    pub fn close(self) -> EngineResult<()> {
        let result = self.sync();
        info!(data_dir = %self.layout.root().display(), "engine closed");
        result
    }

    /// Flushes every open table's heap and index files.
    pub fn sync(&self) -> EngineResult<()> {
        let mut first_err = None;
        for (name, slot) in self.tables.read().iter() {
            if let TableSlot::Open(table) = &*slot.lock() {
                if let Err(e) = table.sync() {
                    error!(table = %name, error = %e, "failed to sync table");
                    first_err.get_or_insert(e);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// The configuration the engine was opened with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Root of the on-disk layout.
    pub fn data_dir(&self) -> &Path {
        self.layout.root()
    }

    fn slot(&self, name: &str) -> EngineResult<SharedSlot> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::TableNotFound(name.to_string()))
    }

    fn with_table<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Table) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let slot = self.slot(name)?;
        let mut guard = slot.lock();
        match &mut *guard {
            TableSlot::Open(table) => f(table),
            TableSlot::Quarantined(reason) => Err(EngineError::TableCorrupted {
                table: name.to_string(),
                reason: reason.clone(),
            }),
            TableSlot::Dropped => Err(EngineError::TableNotFound(name.to_string())),
        }
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Creates a table and its primary Sequential index.
    ///
    /// Returns false, changing nothing, if the table already exists. The
    /// primary key must be an INT or FLOAT column.
    pub fn create_table(
        &self,
        name: &str,
        primary_key: &str,
        types: Vec<ColumnType>,
        column_names: Vec<String>,
    ) -> EngineResult<bool> {
        if !is_valid_name(name) {
            return Err(EngineError::invalid(format!("invalid table name '{}'", name)));
        }
        if let Some(bad) = column_names.iter().find(|c| !is_valid_name(c)) {
            return Err(EngineError::invalid(format!("invalid column name '{}'", bad)));
        }
        let schema = TableSchema::new(column_names, types, primary_key)?;
        let pk_type = schema.types()[schema.primary_key_index()];
        if !pk_type.tag().is_key_type() {
            return Err(EngineError::NotIndexable {
                table: name.to_string(),
                column: primary_key.to_string(),
                tag: pk_type.tag(),
            });
        }

        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            warn!(table = name, "table already exists");
            return Ok(false);
        }
        let heap = match HeapFile::create(
            &self.layout.tables_dir(),
            name,
            schema,
            self.options.sync_writes,
        ) {
            Ok(heap) => heap,
            Err(StorageError::TableExists(_)) => {
                warn!(table = name, "table directory already exists");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let path = self.layout.index_path(IndexKind::Sequential, name, primary_key);
        let primary = build_index(&heap, primary_key, IndexKind::Sequential, &path, &self.options)?;
        tables.insert(
            name.to_string(),
            Arc::new(Mutex::new(TableSlot::Open(Table::new(heap, primary)))),
        );

        info!(table = name, primary_key, "created table");
        Ok(true)
    }

    /// Deletes a table's heap and index files and forgets the table.
    ///
    /// If the files cannot be removed the table stays registered,
    /// quarantined, so a later `drop_table` or `repair_table` can retry.
    pub fn drop_table(&self, name: &str) -> EngineResult<()> {
        let mut tables = self.tables.write();
        let slot = tables
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::TableNotFound(name.to_string()))?;
        let mut guard = slot.lock();
        // close the table's files before deleting them
        *guard = TableSlot::Dropped;
        if let Err(e) = self.layout.remove_table(name) {
            error!(table = name, error = %e, "failed to remove table files");
            *guard = TableSlot::Quarantined(format!("drop failed: {}", e));
            return Err(e.into());
        }
        drop(guard);
        tables.remove(name);
        info!(table = name, "dropped table");
        Ok(())
    }

    /// Returns true if the table exists, quarantined or not.
    pub fn is_table(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Names of every table, sorted.
    pub fn get_table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Column names of a table, in schema order.
    pub fn get_table_attributes(&self, name: &str) -> EngineResult<Vec<String>> {
        self.with_table(name, |t| Ok(t.heap.get_attribute_names().to_vec()))
    }

    /// Schema of a table.
    pub fn get_table_schema(&self, name: &str) -> EngineResult<TableSchema> {
        self.with_table(name, |t| Ok(t.heap.schema().clone()))
    }

    /// Every index of a table, primary first.
    pub fn get_indexes(&self, name: &str) -> EngineResult<Vec<(IndexId, IndexKind)>> {
        self.with_table(name, |t| Ok(t.indexes()))
    }

    /// Columns of a table that have at least one index, sorted.
    pub fn get_indexes_names(&self, name: &str) -> EngineResult<Vec<String>> {
        let mut columns: Vec<String> = self
            .get_indexes(name)?
            .into_iter()
            .map(|(id, _)| id.column)
            .collect();
        columns.sort();
        columns.dedup();
        Ok(columns)
    }

    /// Live rows, deleted slots and heap size of a table.
    pub fn table_stats(&self, name: &str) -> EngineResult<HeapStats> {
        self.with_table(name, |t| Ok(t.heap.stats()))
    }

    /// Rebuilds a quarantined (or healthy) table from its data file.
    ///
    /// The metadata is rewritten from `schema` and every index file of the
    /// table is rebuilt from the heap.
    pub fn repair_table(&self, name: &str, schema: TableSchema) -> EngineResult<()> {
        let slot = self.slot(name)?;
        let mut guard = slot.lock();
        if matches!(*guard, TableSlot::Dropped) {
            return Err(EngineError::TableNotFound(name.to_string()));
        }
        // release open handles before rewriting the files
        *guard = TableSlot::Quarantined("repair in progress".to_string());

        let heap = HeapFile::repair(&self.layout.table_dir(name), schema, self.options.sync_writes)?;
        let pk = heap.get_key_name().to_string();
        let primary = build_index(
            &heap,
            &pk,
            IndexKind::Sequential,
            &self.layout.index_path(IndexKind::Sequential, name, &pk),
            &self.options,
        )?;
        let mut table = Table::new(heap, primary);
        for (column, kind) in discover_secondary(&self.layout, &table.heap)? {
            let path = self.layout.index_path(kind, name, &column);
            let index = build_index(&table.heap, &column, kind, &path, &self.options)?;
            table.attach(&column, kind, index);
        }

        info!(table = name, indexes = table.indexes().len(), "repaired table");
        *guard = TableSlot::Open(table);
        Ok(())
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Builds a record of `table` from string-encoded values.
    pub fn record_from_strings<S: AsRef<str>>(
        &self,
        table: &str,
        values: &[S],
    ) -> EngineResult<Record> {
        self.with_table(table, |t| Ok(Record::from_strings(values, t.heap.get_types())?))
    }

    /// Inserts a row, returning its heap position.
    ///
    /// A duplicate primary key is `DuplicateKey` and leaves the table
    /// unchanged.
    pub fn insert(&self, table: &str, record: &Record) -> EngineResult<RecordPos> {
        self.with_table(table, |t| t.insert(record))
    }

    /// Inserts a row. Returns false, changing nothing, on a duplicate
    /// primary key.
    pub fn add(&self, table: &str, record: &Record) -> EngineResult<bool> {
        match self.insert(table, record) {
            Ok(_) => Ok(true),
            Err(EngineError::DuplicateKey { table, key }) => {
                warn!(table = %table, key = %key, "duplicate primary key");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Removes the row whose primary key is `key.value`.
    ///
    /// Returns false if no row has the key.
    pub fn remove(&self, table: &str, key: &Attribute) -> EngineResult<bool> {
        self.with_table(table, |t| {
            let pk = t.heap.get_key_name();
            if !key.name.is_empty() && key.name != pk {
                return Err(EngineError::invalid(format!(
                    "rows are removed by primary key '{}', not '{}'",
                    pk, key.name
                )));
            }
            let key = index_cast(t.heap.get_key(), &key.value)?;
            t.remove(key)
        })
    }

    /// Point lookup of `key.value` in column `key.name`.
    ///
    /// An empty column name means the primary key. Columns without an index
    /// are scanned. Matches failing `predicate` are dropped and the rest
    /// projected to `selected` (empty selects every column). No row with
    /// the key is `KeyNotFound`.
    pub fn search<P, S>(
        &self,
        table: &str,
        key: &Attribute,
        predicate: P,
        selected: &[S],
    ) -> EngineResult<QueryResponse>
    where
        P: Fn(&Record) -> bool,
        S: AsRef<str>,
    {
        let epsilon = self.config.float_epsilon;
        self.with_table(table, |t| {
            let column = if key.name.is_empty() {
                t.heap.get_key_name().to_string()
            } else {
                key.name.clone()
            };
            let ty = t.heap.get_type(&column)?;
            let mut timings = QueryTimings::default();

            let rows = match t.index_for(&column) {
                Some(index) => {
                    let hit = index.search(index_cast(ty, &key.value)?)?;
                    timings.index = hit.elapsed;
                    match hit.value {
                        Some(pos) => {
                            let read = t.heap.read(pos)?;
                            timings.heap = read.elapsed;
                            vec![read.value]
                        }
                        None => Vec::new(),
                    }
                }
                None => {
                    let idx = t.heap.get_attribute_idx(&column)?;
                    let matches = predicate::equals(idx, ty, &key.value, epsilon)?;
                    let loaded = t.heap.load()?;
                    timings.heap = loaded.elapsed;
                    loaded.value.into_iter().filter(|r| matches(r)).collect()
                }
            };
            if rows.is_empty() {
                return Err(EngineError::KeyNotFound {
                    table: t.name().to_string(),
                    key: format!("{}={}", column, key.value),
                });
            }
            debug!(table = %t.name(), column = %column, rows = rows.len(), "search");
            respond(t, rows, &predicate, selected, timings)
        })
    }

    /// Rows whose column value lies in `[begin.value, end.value]`, ordered
    /// by that value.
    ///
    /// A bound whose value is `MIN` or `MAX` is unbounded and takes its
    /// column from the other bound. Bounds naming different columns are
    /// `CrossColumnRange`.
    pub fn range_search<P, S>(
        &self,
        table: &str,
        begin: &Attribute,
        end: &Attribute,
        predicate: P,
        selected: &[S],
    ) -> EngineResult<QueryResponse>
    where
        P: Fn(&Record) -> bool,
        S: AsRef<str>,
    {
        self.with_table(table, |t| {
            let column = range_column(t, begin, end)?;
            let ty = t.heap.get_type(&column)?;
            let low = bound_value(ty, &begin.value)?;
            let high = bound_value(ty, &end.value)?;
            let mut timings = QueryTimings::default();

            let rows = match t.index_for(&column) {
                Some(index) => {
                    let hits = index
                        .range_search(Key::from_value(low)?, Key::from_value(high)?)?;
                    timings.index = hits.elapsed;
                    let read = t.heap.read_many(&hits.value)?;
                    timings.heap = read.elapsed;
                    read.value
                }
                None => {
                    let idx = t.heap.get_attribute_idx(&column)?;
                    let within = predicate::between(idx, ty, low, high);
                    let loaded = t.heap.load()?;
                    timings.heap = loaded.elapsed;
                    let mut rows: Vec<(Value, Record)> = loaded
                        .value
                        .into_iter()
                        .filter(|r| within(r))
                        .map(|r| Ok((r.value(idx, ty)?, r)))
                        .collect::<EngineResult<_>>()?;
                    rows.sort_by(|a, b| a.0.compare(&b.0).unwrap_or(std::cmp::Ordering::Equal));
                    rows.into_iter().map(|(_, r)| r).collect()
                }
            };
            debug!(table = %t.name(), column = %column, rows = rows.len(), "range search");
            respond(t, rows, &predicate, selected, timings)
        })
    }

    /// Builds the predicate `record[column] <cmp> literal` for `table`.
    pub fn get_comparator(
        &self,
        table: &str,
        cmp: Comparison,
        column: &str,
        literal: &str,
    ) -> EngineResult<Predicate> {
        let epsilon = self.config.float_epsilon;
        self.with_table(table, |t| {
            let idx = t.heap.get_attribute_idx(column)?;
            let ty = t.heap.get_types()[idx];
            Ok(predicate::comparator(idx, ty, cmp, literal, epsilon)?)
        })
    }

    // =========================================================================
    // Indexes
    // =========================================================================

    /// Creates an index of `kind` on `column` and loads every live row.
    ///
    /// BOOL columns cannot be indexed, and the primary key column always has
    /// its Sequential index.
    pub fn create_index(&self, table: &str, column: &str, kind: IndexKind) -> EngineResult<()> {
        let options = &self.options;
        let layout = &self.layout;
        self.with_table(table, |t| {
            let ty = t.heap.get_type(column)?;
            if !ty.tag().is_indexable() {
                return Err(EngineError::NotIndexable {
                    table: table.to_string(),
                    column: column.to_string(),
                    tag: ty.tag(),
                });
            }
            if t.has_index(column, kind) {
                return Err(EngineError::IndexExists {
                    table: table.to_string(),
                    column: column.to_string(),
                    kind,
                });
            }
            let path = layout.index_path(kind, table, column);
            let index = build_index(&t.heap, column, kind, &path, options)?;
            let entries = index.len();
            t.attach(column, kind, index);
            info!(table, column, kind = %kind, entries, "created index");
            Ok(())
        })
    }

    /// Removes a secondary index and its file.
    pub fn drop_index(&self, table: &str, column: &str, kind: IndexKind) -> EngineResult<()> {
        let layout = &self.layout;
        self.with_table(table, |t| {
            if t.is_primary(column, kind) {
                return Err(EngineError::invalid(format!(
                    "the primary index of '{}' cannot be dropped",
                    table
                )));
            }
            let index = t.detach(column, kind).ok_or_else(|| EngineError::IndexNotFound {
                table: table.to_string(),
                column: column.to_string(),
                kind,
            })?;
            drop(index);
            let path = layout.index_path(kind, table, column);
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(e.into());
                }
            }
            info!(table, column, kind = %kind, "dropped index");
            Ok(())
        })
    }

    // =========================================================================
    // Bulk loading
    // =========================================================================

    /// Loads many rows at once.
    ///
    /// Rows that do not fit the schema or repeat a primary key are rejected
    /// and reported by input index; the rest are loaded.
    pub fn bulk_insert(&self, table: &str, rows: Vec<Record>) -> EngineResult<BulkLoadReport> {
        let parallel = self.config.bulk.parallel_index_build;
        self.with_table(table, |t| {
            t.bulk_load(
                rows.into_iter().enumerate().collect(),
                parallel,
                BulkLoadReport::default(),
            )
        })
    }

    /// Loads a CSV file into `table`.
    ///
    /// Blank lines are skipped, as is a first line equal to the column
    /// names. Rejected rows are reported by 1-based line number.
    pub fn load_csv(&self, table: &str, path: impl AsRef<Path>) -> EngineResult<BulkLoadReport> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| StorageError::from(IoError::from_io_with_path(e, path)))?;
        let parallel = self.config.bulk.parallel_index_build;

        self.with_table(table, |t| {
            let mut report = BulkLoadReport::default();
            let mut rows = Vec::new();
            let mut first = true;
            for (i, line) in text.lines().enumerate() {
                let line_no = i + 1;
                if line.trim().is_empty() {
                    continue;
                }
                let fields = match parse_csv_line(line) {
                    Ok(fields) => fields,
                    Err(reason) => {
                        report.reject(line_no, reason);
                        first = false;
                        continue;
                    }
                };
                if std::mem::take(&mut first) && fields == t.heap.get_attribute_names() {
                    continue;
                }
                match Record::from_strings(&fields, t.heap.get_types()) {
                    Ok(record) => rows.push((line_no, record)),
                    Err(e) => report.reject(line_no, e.to_string()),
                }
            }
            info!(table = %t.name(), path = %path.display(), rows = rows.len(), "loading csv");
            t.bulk_load(rows, parallel, report)
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("data_dir", &self.layout.root())
            .field("tables", &self.tables.read().len())
            .finish()
    }
}

/// Loads a table's heap and reopens its index files.
///
/// An index file that is missing or fails to open is rebuilt from the heap.
fn load_table(layout: &Layout, name: &str, options: &IndexOptions) -> EngineResult<Table> {
    let heap = HeapFile::load_from_existing(&layout.table_dir(name), options.sync_writes)?;
    let pk = heap.get_key_name().to_string();
    let primary = open_or_rebuild(layout, &heap, &pk, IndexKind::Sequential, options)?;
    if primary.len() as u64 != heap.record_count() {
        return Err(EngineError::TableCorrupted {
            table: name.to_string(),
            reason: format!(
                "primary index holds {} keys, heap holds {} rows",
                primary.len(),
                heap.record_count()
            ),
        });
    }

    let mut table = Table::new(heap, primary);
    for (column, kind) in discover_secondary(layout, &table.heap)? {
        let index = open_or_rebuild(layout, &table.heap, &column, kind, options)?;
        table.attach(&column, kind, index);
    }
    debug!(table = name, indexes = table.indexes().len(), "loaded table");
    Ok(table)
}

fn open_or_rebuild(
    layout: &Layout,
    heap: &HeapFile,
    column: &str,
    kind: IndexKind,
    options: &IndexOptions,
) -> EngineResult<IndexContainer> {
    let path = layout.index_path(kind, heap.name(), column);
    if path.exists() {
        match IndexContainer::open(kind, &path, heap.get_type(column)?, options) {
            Ok(index) => return Ok(index),
            Err(e) => {
                warn!(table = %heap.name(), column, kind = %kind, error = %e, "rebuilding unreadable index");
            }
        }
    } else {
        warn!(table = %heap.name(), column, kind = %kind, "rebuilding missing index");
    }
    build_index(heap, column, kind, &path, options)
}

/// Secondary index files on disk for a table's known columns.
fn discover_secondary(layout: &Layout, heap: &HeapFile) -> EngineResult<Vec<(String, IndexKind)>> {
    let mut found = Vec::new();
    for kind in IndexKind::ALL {
        for column in layout.indexed_columns(kind, heap.name())? {
            if kind == IndexKind::Sequential && column == heap.get_key_name() {
                continue;
            }
            match heap.get_type(&column) {
                Ok(ty) if ty.tag().is_indexable() => found.push((column, kind)),
                _ => warn!(table = %heap.name(), column = %column, kind = %kind, "ignoring stray index file"),
            }
        }
    }
    Ok(found)
}

fn is_sentinel(raw: &str) -> bool {
    raw == RANGE_MIN_SENTINEL || raw == RANGE_MAX_SENTINEL
}

/// Column a range applies to.
fn range_column(t: &Table, begin: &Attribute, end: &Attribute) -> EngineResult<String> {
    let name = |a: &Attribute| {
        if a.name.is_empty() {
            t.heap.get_key_name().to_string()
        } else {
            a.name.clone()
        }
    };
    match (is_sentinel(&begin.value), is_sentinel(&end.value)) {
        (false, false) if name(begin) != name(end) => Err(EngineError::CrossColumnRange {
            begin: name(begin),
            end: name(end),
        }),
        (true, false) => Ok(name(end)),
        _ => Ok(name(begin)),
    }
}

/// Casts a range bound, mapping the sentinels to the type's extremes.
fn bound_value(ty: ColumnType, raw: &str) -> EngineResult<Value> {
    let is_bool = ty.tag() == TypeTag::Bool;
    Ok(match raw {
        RANGE_MIN_SENTINEL if is_bool => Value::Bool(false),
        RANGE_MAX_SENTINEL if is_bool => Value::Bool(true),
        RANGE_MIN_SENTINEL => Key::min_for(ty)?.into(),
        RANGE_MAX_SENTINEL => Key::max_for(ty)?.into(),
        _ => Value::parse(ty, raw)?,
    })
}

fn respond<P, S>(
    t: &Table,
    mut rows: Vec<Record>,
    predicate: &P,
    selected: &[S],
    timings: QueryTimings,
) -> EngineResult<QueryResponse>
where
    P: Fn(&Record) -> bool,
    S: AsRef<str>,
{
    rows.retain(|r| predicate(r));
    let indices = t.heap.projection(selected)?;
    let columns = indices
        .iter()
        .map(|i| t.heap.get_attribute_names()[*i].clone())
        .collect();
    let types = indices.iter().map(|i| t.heap.get_types()[*i]).collect();
    let rows = t.heap.filter(rows, selected)?;
    Ok(QueryResponse {
        columns,
        types,
        rows,
        timings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_values() {
        assert_eq!(bound_value(ColumnType::int(), "MIN").unwrap(), Value::Int(i32::MIN));
        assert_eq!(bound_value(ColumnType::int(), "MAX").unwrap(), Value::Int(i32::MAX));
        assert_eq!(
            bound_value(ColumnType::float(), "MAX").unwrap(),
            Value::Float(f32::INFINITY)
        );
        assert_eq!(bound_value(ColumnType::int(), " 12 ").unwrap(), Value::Int(12));
        assert!(bound_value(ColumnType::int(), "min").is_err());
        assert_eq!(bound_value(ColumnType::bool(), "MIN").unwrap(), Value::Bool(false));
        assert_eq!(bound_value(ColumnType::bool(), "MAX").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_sentinels_are_exact() {
        assert!(is_sentinel("MIN"));
        assert!(is_sentinel("MAX"));
        assert!(!is_sentinel("max"));
        assert!(!is_sentinel("5"));
    }
}
