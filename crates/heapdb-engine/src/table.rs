//! One table's heap file and indexes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use heapdb_common::{ColumnType, IndexId, IndexKind, Key, RecordPos, Value};
use heapdb_index::{IndexContainer, IndexOptions};
use heapdb_storage::{HeapFile, Record};
use tracing::{debug, error, warn};

use crate::error::{EngineError, EngineResult};

/// Secondary indexes are consulted in this order when a column has several.
const LOOKUP_ORDER: [IndexKind; 3] = [IndexKind::Avl, IndexKind::Isam, IndexKind::Sequential];

/// State of a table slot in the engine's table map.
#[derive(Debug)]
pub(crate) enum TableSlot {
    Open(Table),
    /// Failed to load; holds the reason.
    Quarantined(String),
    /// Dropped while another caller still held the slot.
    Dropped,
}

/// A table: heap file, mandatory primary Sequential index and secondary
/// indexes keyed by column then kind.
#[derive(Debug)]
pub(crate) struct Table {
    pub heap: HeapFile,
    pub primary: IndexContainer,
    pub secondary: BTreeMap<String, BTreeMap<IndexKind, IndexContainer>>,
}

impl Table {
    pub fn new(heap: HeapFile, primary: IndexContainer) -> Self {
        Self {
            heap,
            primary,
            secondary: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.heap.name()
    }

    pub fn is_primary(&self, column: &str, kind: IndexKind) -> bool {
        kind == IndexKind::Sequential && column == self.heap.get_key_name()
    }

    pub fn has_index(&self, column: &str, kind: IndexKind) -> bool {
        self.is_primary(column, kind)
            || self
                .secondary
                .get(column)
                .map_or(false, |kinds| kinds.contains_key(&kind))
    }

    pub fn attach(&mut self, column: &str, kind: IndexKind, index: IndexContainer) {
        self.secondary
            .entry(column.to_string())
            .or_default()
            .insert(kind, index);
    }

    pub fn detach(&mut self, column: &str, kind: IndexKind) -> Option<IndexContainer> {
        let kinds = self.secondary.get_mut(column)?;
        let index = kinds.remove(&kind);
        if kinds.is_empty() {
            self.secondary.remove(column);
        }
        index
    }

    /// The index used to look up `column`, if it has one.
    pub fn index_for(&self, column: &str) -> Option<&IndexContainer> {
        if column == self.heap.get_key_name() {
            return Some(&self.primary);
        }
        let kinds = self.secondary.get(column)?;
        LOOKUP_ORDER.iter().find_map(|kind| kinds.get(kind))
    }

    /// Every index of the table, primary first.
    pub fn indexes(&self) -> Vec<(IndexId, IndexKind)> {
        let name = self.name();
        let mut out = vec![(
            IndexId::new(name, self.heap.get_key_name()),
            IndexKind::Sequential,
        )];
        for (column, kinds) in &self.secondary {
            out.extend(
                kinds
                    .keys()
                    .map(|kind| (IndexId::new(name, column.as_str()), *kind)),
            );
        }
        out
    }

    /// Appends a row, enforcing primary key uniqueness first.
    pub fn insert(&mut self, record: &Record) -> EngineResult<RecordPos> {
        let values = record.values(self.heap.get_types())?;
        let pk_idx = self.heap.get_key_idx();
        let key = Key::from_value(values[pk_idx].clone())?;

        let pos = self.heap.next_pos();
        if !self.primary.add(key.clone(), pos)?.value {
            return Err(EngineError::DuplicateKey {
                table: self.name().to_string(),
                key: key.to_string(),
            });
        }

        let pos = match self.heap.add(record) {
            Ok(pos) => pos,
            Err(e) => {
                self.primary.remove(key)?;
                return Err(e.into());
            }
        };

        let mut indexed = Vec::new();
        if let Err(e) = self.index_secondary(&values, pos, &mut indexed) {
            warn!(table = %self.heap.name(), error = %e, "secondary index write failed, rolling back row");
            self.roll_back(key, pos, indexed);
            return Err(e);
        }

        debug!(table = %self.heap.name(), key = %values[pk_idx], pos = pos.as_u64(), "inserted row");
        Ok(pos)
    }

    /// Removes the row with primary key `key` from the heap and every index.
    ///
    /// Returns false if no row has the key.
    pub fn remove(&mut self, key: Key) -> EngineResult<bool> {
        let Some(pos) = self.primary.remove(key.clone())?.value else {
            return Ok(false);
        };
        let record = self.heap.read(pos)?.value;
        self.heap.remove(pos)?;

        for (column, kinds) in self.secondary.iter_mut() {
            let idx = self.heap.get_attribute_idx(column)?;
            let ty = self.heap.get_types()[idx];
            let column_key = Key::from_value(record.value(idx, ty)?)?;
            let mut holder = None;
            for index in kinds.values_mut() {
                // another row may own the key if this one was never indexed
                if index.search(column_key.clone())?.value != Some(pos) {
                    continue;
                }
                index.remove(column_key.clone())?;
                if holder.is_none() {
                    holder = Some(first_holder(&self.heap, idx, ty, &column_key)?);
                }
                if let Some(Some(next)) = holder {
                    index.add(column_key.clone(), next)?;
                }
            }
        }

        debug!(table = %self.heap.name(), key = %key, pos = pos.as_u64(), "removed row");
        Ok(true)
    }

    /// Adds the row at `pos` to every secondary index, recording each
    /// entry written in `indexed`.
    fn index_secondary(
        &mut self,
        values: &[Value],
        pos: RecordPos,
        indexed: &mut Vec<(String, IndexKind, Key)>,
    ) -> EngineResult<()> {
        for (column, kinds) in self.secondary.iter_mut() {
            let idx = self.heap.get_attribute_idx(column)?;
            let key = Key::from_value(values[idx].clone())?;
            for (kind, index) in kinds.iter_mut() {
                if index.add(key.clone(), pos)?.value {
                    indexed.push((column.clone(), *kind, key.clone()));
                } else {
                    warn!(
                        table = %self.heap.name(),
                        column = %column,
                        kind = %kind,
                        key = %key,
                        "secondary index already holds key, row not indexed"
                    );
                }
            }
        }
        Ok(())
    }

    /// Undoes a partly indexed insert: the secondary entries in `indexed`,
    /// the primary entry and the heap slot, which is left tombstoned.
    fn roll_back(&mut self, primary_key: Key, pos: RecordPos, indexed: Vec<(String, IndexKind, Key)>) {
        let table = self.heap.name().to_string();
        for (column, kind, key) in indexed {
            let Some(index) = self.secondary.get_mut(&column).and_then(|k| k.get_mut(&kind)) else {
                continue;
            };
            if let Err(e) = index.remove(key) {
                error!(table = %table, column = %column, kind = %kind, error = %e, "rollback left secondary entry");
            }
        }
        if let Err(e) = self.primary.remove(primary_key) {
            error!(table = %table, error = %e, "rollback left primary entry");
        }
        if let Err(e) = self.heap.remove(pos) {
            error!(table = %table, pos = pos.as_u64(), error = %e, "rollback left heap row");
        }
    }

    pub fn sync(&self) -> EngineResult<()> {
        self.heap.sync()?;
        self.primary.sync()?;
        for index in self.secondary.values().flat_map(BTreeMap::values) {
            index.sync()?;
        }
        Ok(())
    }
}

/// Position of the first live row whose column `idx` holds `key`.
fn first_holder(heap: &HeapFile, idx: usize, ty: ColumnType, key: &Key) -> EngineResult<Option<RecordPos>> {
    for (pos, record) in heap.scan()? {
        if Key::from_value(record.value(idx, ty)?)? == *key {
            return Ok(Some(pos));
        }
    }
    Ok(None)
}

/// Keys of `column` for every live row, with their positions.
pub(crate) fn column_keys(heap: &HeapFile, column: &str) -> EngineResult<Vec<(Key, RecordPos)>> {
    let idx = heap.get_attribute_idx(column)?;
    let ty = heap.get_types()[idx];
    heap.scan()?
        .into_iter()
        .map(|(pos, record)| Ok((Key::from_value(record.value(idx, ty)?)?, pos)))
        .collect()
}

/// Creates `path` afresh and loads every live row of `column` into it.
pub(crate) fn build_index(
    heap: &HeapFile,
    column: &str,
    kind: IndexKind,
    path: &Path,
    options: &IndexOptions,
) -> EngineResult<IndexContainer> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let ty = heap.get_type(column)?;
    let mut index = IndexContainer::create(kind, path, ty, options)?;
    let entries = column_keys(heap, column)?;
    let total = entries.len();
    let flags = index.bulk_insert(entries)?.value;
    let skipped = flags.iter().filter(|ok| !**ok).count();
    if skipped > 0 {
        warn!(
            table = %heap.name(),
            column = column,
            kind = %kind,
            skipped,
            "duplicate keys left out of index"
        );
    }
    debug!(table = %heap.name(), column = column, kind = %kind, entries = total, "built index");
    Ok(index)
}


#[cfg(test)]
mod tests {
    use super::*;
    use heapdb_index::IndexError;
    use heapdb_storage::TableSchema;
    use tempfile::tempdir;

    fn table(dir: &Path) -> Table {
        let schema = TableSchema::new(
            vec!["id".into(), "name".into()],
            vec![ColumnType::int(), ColumnType::varchar(8).unwrap()],
            "id",
        )
        .unwrap();
        let heap = HeapFile::create(dir, "t", schema, false).unwrap();
        let options = IndexOptions::default();
        let primary =
            build_index(&heap, "id", IndexKind::Sequential, &dir.join("pk.idx"), &options).unwrap();
        let mut table = Table::new(heap, primary);
        let by_id = build_index(&table.heap, "id", IndexKind::Avl, &dir.join("id.idx"), &options).unwrap();
        table.attach("id", IndexKind::Avl, by_id);
        table
    }

    fn row(table: &Table, id: i32, name: &str) -> Record {
        Record::from_values(&[Value::Int(id), Value::Varchar(name.into())], table.heap.get_types())
            .unwrap()
    }

    #[test]
    fn test_failed_secondary_write_rolls_back_insert() {
        let dir = tempdir().unwrap();
        let mut table = table(dir.path());
        // INT keyed index over a VARCHAR column rejects every write
        let wrong = IndexContainer::create(
            IndexKind::Sequential,
            &dir.path().join("name.idx"),
            ColumnType::int(),
            &IndexOptions::default(),
        )
        .unwrap();
        table.attach("name", IndexKind::Sequential, wrong);

        let record = row(&table, 1, "ana");
        let err = table.insert(&record).unwrap_err();
        assert!(matches!(err, EngineError::Index(IndexError::KeyTypeMismatch { .. })));

        assert_eq!(table.primary.search(Key::Int(1)).unwrap().value, None);
        assert!(table.secondary["id"][&IndexKind::Avl].is_empty());
        let stats = table.heap.stats();
        assert_eq!(stats.live_records, 0);
        assert_eq!(stats.deleted_slots, 1);

        table.detach("name", IndexKind::Sequential);
        let pos = table.insert(&record).unwrap();
        assert_eq!(table.primary.search(Key::Int(1)).unwrap().value, Some(pos));
    }

    #[test]
    fn test_remove_reindexes_row_sharing_key() {
        let dir = tempdir().unwrap();
        let mut table = table(dir.path());
        let by_name = build_index(
            &table.heap,
            "name",
            IndexKind::Avl,
            &dir.path().join("name.idx"),
            &IndexOptions::default(),
        )
        .unwrap();
        table.attach("name", IndexKind::Avl, by_name);

        let (ana, twin) = (row(&table, 1, "ana"), row(&table, 2, "ana"));
        let first = table.insert(&ana).unwrap();
        let second = table.insert(&twin).unwrap();
        let name = Key::Varchar("ana".into());
        let index = |t: &Table| t.secondary["name"][&IndexKind::Avl].search(name.clone()).unwrap().value;
        assert_eq!(index(&table), Some(first));

        assert!(table.remove(Key::Int(1)).unwrap());
        assert_eq!(index(&table), Some(second));
        assert!(table.remove(Key::Int(2)).unwrap());
        assert_eq!(index(&table), None);
    }
}
