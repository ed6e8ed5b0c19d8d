//! Heap files.
//!
//! A heap file stores one table's rows in fixed-size slots appended to
//! `data.bin`; the slot offset is the record's position. Removal flips the
//! slot status in place and threads the slot onto a deleted chain; slots
//! are never compacted. Schema, deleted-chain head and live count live in
//! `metadata.bin` (see [`TableMetadata`]).

mod metadata;

pub use metadata::{TableMetadata, TableSchema};

use std::fs;
use std::path::{Path, PathBuf};

use heapdb_common::constants::DATA_FILE;
use heapdb_common::{ColumnType, RecordPos, Timed};
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::file::{BlockFile, IoError, OpenOptions};
use crate::record::{Record, RecordStatus, RowCodec, SlotHeader, SLOT_HEADER_SIZE};

/// Slots decoded per read while scanning.
const SCAN_BATCH_SLOTS: usize = 1024;

/// Counters reported by [`HeapFile::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    /// Live records.
    pub live_records: u64,
    /// Tombstoned slots.
    pub deleted_slots: u64,
    /// Size of the data file in bytes.
    pub heap_bytes: u64,
}

/// Per-table record store.
#[derive(Debug)]
pub struct HeapFile {
    name: String,
    dir: PathBuf,
    data: BlockFile,
    meta: TableMetadata,
    codec: RowCodec,
    sync_writes: bool,
}

impl HeapFile {
    /// Creates the storage of a new table under `tables_dir/name`.
    ///
    /// Fails with `TableExists` if the table's data file is already there.
    pub fn create(
        tables_dir: &Path,
        name: &str,
        schema: TableSchema,
        sync_writes: bool,
    ) -> StorageResult<Self> {
        let dir = tables_dir.join(name);
        let data_path = dir.join(DATA_FILE);
        if data_path.exists() {
            return Err(StorageError::TableExists(name.to_string()));
        }
        fs::create_dir_all(&dir)?;

        let data = BlockFile::open(
            &data_path,
            OpenOptions::for_create_new().sync_on_write(sync_writes),
        )
        .map_err(|e| match e {
            IoError::AlreadyExists { .. } => StorageError::TableExists(name.to_string()),
            other => other.into(),
        })?;

        let meta = TableMetadata::new(schema);
        meta.write_to(&dir, sync_writes)?;
        let codec = RowCodec::new(meta.schema.types().to_vec());

        info!(
            table = name,
            columns = meta.schema.column_names().len(),
            slot_size = codec.slot_size(),
            "created heap file"
        );

        Ok(Self {
            name: name.to_string(),
            dir,
            data,
            meta,
            codec,
            sync_writes,
        })
    }

    /// Reopens an existing table from its directory.
    ///
    /// Metadata that fails validation, or a data file that does not hold a
    /// whole number of slots, is reported as `Corrupted`.
    pub fn load_from_existing(table_dir: &Path, sync_writes: bool) -> StorageResult<Self> {
        let name = table_name(table_dir);
        let meta = TableMetadata::read_from(table_dir)?;
        let data = BlockFile::open(
            table_dir.join(DATA_FILE),
            OpenOptions::for_read_write().sync_on_write(sync_writes),
        )?;
        let codec = RowCodec::new(meta.schema.types().to_vec());

        let slot_size = codec.slot_size() as u64;
        if data.len() % slot_size != 0 {
            return Err(StorageError::corrupted(format!(
                "data file of '{}' is {} bytes, not a multiple of the {}-byte slot",
                name,
                data.len(),
                slot_size
            )));
        }
        if meta.record_count > data.len() / slot_size {
            return Err(StorageError::corrupted(format!(
                "metadata of '{}' counts {} records but the data file has {} slots",
                name,
                meta.record_count,
                data.len() / slot_size
            )));
        }

        debug!(table = %name, records = meta.record_count, "loaded heap file");
        Ok(Self {
            name,
            dir: table_dir.to_path_buf(),
            data,
            meta,
            codec,
            sync_writes,
        })
    }

    /// Rewrites a table's metadata from a caller-supplied schema.
    ///
    /// The data file is scanned: a trailing partial slot is cut off, live
    /// slots are counted and the deleted chain is relinked in position
    /// order.
    pub fn repair(table_dir: &Path, schema: TableSchema, sync_writes: bool) -> StorageResult<Self> {
        let name = table_name(table_dir);
        let mut data = BlockFile::open(
            table_dir.join(DATA_FILE),
            OpenOptions::for_create().sync_on_write(sync_writes),
        )?;
        let codec = RowCodec::new(schema.types().to_vec());
        let slot_size = codec.slot_size() as u64;

        let tail = data.len() % slot_size;
        if tail != 0 {
            warn!(table = %name, bytes = tail, "dropping partial trailing slot");
            data.set_len(data.len() - tail)?;
        }

        let slots = data.len() / slot_size;
        let mut live = 0u64;
        let mut deleted = Vec::new();
        for slot in 0..slots {
            let offset = slot * slot_size;
            let mut status = [0u8; 1];
            data.read_exact_at(&mut status, offset)?;
            if RecordStatus::from_u8(status[0]) == Some(RecordStatus::Ok) {
                live += 1;
            } else {
                deleted.push(RecordPos::new(offset));
            }
        }

        let mut next = None;
        for pos in deleted.iter().rev() {
            let mut header = Vec::with_capacity(SLOT_HEADER_SIZE);
            SlotHeader::deleted(next).encode(&mut header);
            data.write_all_at(&header, pos.as_u64())?;
            next = Some(*pos);
        }

        let meta = TableMetadata {
            schema,
            first_deleted: next,
            record_count: live,
        };
        meta.write_to(table_dir, sync_writes)?;

        info!(
            table = %name,
            live = live,
            deleted = deleted.len(),
            "repaired heap metadata"
        );
        Ok(Self {
            name,
            dir: table_dir.to_path_buf(),
            data,
            meta,
            codec,
            sync_writes,
        })
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Position the next `add` will occupy.
    pub fn next_pos(&self) -> RecordPos {
        RecordPos::new(self.data.len())
    }

    /// Bytes per slot (header + row).
    pub fn slot_size(&self) -> usize {
        self.codec.slot_size()
    }

    /// Appends a record and returns its position.
    pub fn add(&mut self, record: &Record) -> StorageResult<RecordPos> {
        let mut buf = Vec::with_capacity(self.codec.slot_size());
        self.codec.encode_slot(SlotHeader::LIVE, record, &mut buf)?;
        let offset = self.data.append(&buf)?;

        self.meta.record_count += 1;
        self.persist_metadata()?;

        debug!(table = %self.name, pos = offset, "appended record");
        Ok(RecordPos::new(offset))
    }

    /// Appends many records contiguously in one write.
    ///
    /// Metadata is persisted once. Positions are returned in input order.
    pub fn bulk_insert(&mut self, records: &[Record]) -> StorageResult<Timed<Vec<RecordPos>>> {
        Timed::try_measure(|| {
            let slot_size = self.codec.slot_size();
            let mut buf = Vec::with_capacity(slot_size * records.len());
            for record in records {
                self.codec.encode_slot(SlotHeader::LIVE, record, &mut buf)?;
            }
            let start = self.data.append(&buf)?;

            self.meta.record_count += records.len() as u64;
            self.persist_metadata()?;

            debug!(table = %self.name, count = records.len(), "bulk appended records");
            Ok((0..records.len())
                .map(|i| RecordPos::new(start + (i * slot_size) as u64))
                .collect())
        })
    }

    /// Reads the live record at `pos`.
    pub fn read(&self, pos: RecordPos) -> StorageResult<Timed<Record>> {
        Timed::try_measure(|| {
            let (header, record) = self.read_slot(pos)?;
            if header.status == RecordStatus::Deleted {
                return Err(StorageError::RecordDeleted(pos));
            }
            Ok(record)
        })
    }

    /// Reads several positions, omitting tombstoned slots.
    pub fn read_many(&self, positions: &[RecordPos]) -> StorageResult<Timed<Vec<Record>>> {
        Timed::try_measure(|| {
            let mut records = Vec::with_capacity(positions.len());
            for pos in positions {
                let (_, record) = self.read_slot(*pos)?;
                if !record.is_deleted() {
                    records.push(record);
                }
            }
            Ok(records)
        })
    }

    /// Every live record with its position, in position order.
    pub fn scan(&self) -> StorageResult<Vec<(RecordPos, Record)>> {
        let slot_size = self.codec.slot_size();
        let total = (self.data.len() / slot_size as u64) as usize;
        let mut out = Vec::with_capacity(self.meta.record_count as usize);

        let mut slot = 0;
        while slot < total {
            let batch = SCAN_BATCH_SLOTS.min(total - slot);
            let offset = (slot * slot_size) as u64;
            let bytes = self.data.read_vec_at(offset, batch * slot_size)?;
            let mut buf = bytes.as_slice();
            for i in 0..batch {
                let (header, record) = self.codec.decode_slot(&mut buf)?;
                if header.status == RecordStatus::Ok {
                    out.push((RecordPos::new(offset + (i * slot_size) as u64), record));
                }
            }
            slot += batch;
        }
        Ok(out)
    }

    /// Every live record, in position order.
    pub fn load(&self) -> StorageResult<Timed<Vec<Record>>> {
        Timed::try_measure(|| Ok(self.scan()?.into_iter().map(|(_, r)| r).collect()))
    }

    /// Tombstones the record at `pos` in place.
    ///
    /// Returns false if the slot was already deleted.
    pub fn remove(&mut self, pos: RecordPos) -> StorageResult<bool> {
        let (header, _) = self.read_slot(pos)?;
        if header.status == RecordStatus::Deleted {
            return Ok(false);
        }

        let mut buf = Vec::with_capacity(SLOT_HEADER_SIZE);
        SlotHeader::deleted(self.meta.first_deleted).encode(&mut buf);
        self.data.write_all_at(&buf, pos.as_u64())?;

        self.meta.first_deleted = Some(pos);
        self.meta.record_count = self.meta.record_count.saturating_sub(1);
        self.persist_metadata()?;

        debug!(table = %self.name, pos = pos.as_u64(), "tombstoned record");
        Ok(true)
    }

    /// Walks the deleted chain from its head.
    pub fn deleted_positions(&self) -> StorageResult<Vec<RecordPos>> {
        let max_slots = self.data.len() / self.codec.slot_size() as u64;
        let mut out = Vec::new();
        let mut next = self.meta.first_deleted;
        while let Some(pos) = next {
            if out.len() as u64 >= max_slots {
                return Err(StorageError::corrupted(format!(
                    "deleted chain of '{}' is longer than the heap",
                    self.name
                )));
            }
            let (header, _) = self.read_slot(pos)?;
            if header.status != RecordStatus::Deleted {
                return Err(StorageError::corrupted(format!(
                    "deleted chain of '{}' reaches live slot {}",
                    self.name, pos
                )));
            }
            out.push(pos);
            next = header.next_deleted;
        }
        Ok(out)
    }

    /// Resolves selected column names to ascending physical indices.
    ///
    /// An empty selection means every column.
    pub fn projection<S: AsRef<str>>(&self, selected: &[S]) -> StorageResult<Vec<usize>> {
        if selected.is_empty() {
            return Ok((0..self.codec.types().len()).collect());
        }
        let mut indices = selected
            .iter()
            .map(|name| self.get_attribute_idx(name.as_ref()))
            .collect::<StorageResult<Vec<_>>>()?;
        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }

    /// Projects records down to the selected columns, in physical order.
    pub fn filter<S: AsRef<str>>(
        &self,
        records: Vec<Record>,
        selected: &[S],
    ) -> StorageResult<Vec<Record>> {
        let indices = self.projection(selected)?;
        if indices.len() == self.codec.types().len() {
            return Ok(records);
        }
        Ok(records.into_iter().map(|r| r.project(&indices)).collect())
    }

    /// Renders a full record as text, one string per column.
    pub fn to_strings(&self, record: &Record) -> StorageResult<Vec<String>> {
        record.to_strings(self.codec.types())
    }

    /// Type of a column.
    pub fn get_type(&self, column: &str) -> StorageResult<ColumnType> {
        let idx = self.get_attribute_idx(column)?;
        Ok(self.codec.types()[idx])
    }

    /// Type of the primary key column.
    pub fn get_key(&self) -> ColumnType {
        self.codec.types()[self.get_key_idx()]
    }

    /// Primary key column name.
    pub fn get_key_name(&self) -> &str {
        self.meta.schema.primary_key()
    }

    /// Position of the primary key column.
    pub fn get_key_idx(&self) -> usize {
        self.meta.schema.primary_key_index()
    }

    /// Position of a column.
    pub fn get_attribute_idx(&self, column: &str) -> StorageResult<usize> {
        self.meta
            .schema
            .column_index(column)
            .ok_or_else(|| StorageError::ColumnNotFound {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Bytes per row, excluding the slot header.
    pub fn get_record_size(&self) -> usize {
        self.codec.row_size()
    }

    /// Column types.
    pub fn get_types(&self) -> &[ColumnType] {
        self.codec.types()
    }

    /// Column names.
    pub fn get_attribute_names(&self) -> &[String] {
        self.meta.schema.column_names()
    }

    /// Schema.
    pub fn schema(&self) -> &TableSchema {
        &self.meta.schema
    }

    /// Persisted metadata.
    pub fn metadata(&self) -> &TableMetadata {
        &self.meta
    }

    /// Live record count.
    pub fn record_count(&self) -> u64 {
        self.meta.record_count
    }

    /// Live, deleted and byte counters.
    pub fn stats(&self) -> HeapStats {
        let slots = self.data.len() / self.codec.slot_size() as u64;
        HeapStats {
            live_records: self.meta.record_count,
            deleted_slots: slots.saturating_sub(self.meta.record_count),
            heap_bytes: self.data.len(),
        }
    }

    /// Flushes data and metadata to disk.
    pub fn sync(&self) -> StorageResult<()> {
        self.data.sync()?;
        self.meta.write_to(&self.dir, true)
    }

    fn persist_metadata(&self) -> StorageResult<()> {
        self.meta.write_to(&self.dir, self.sync_writes)
    }

    fn check_position(&self, pos: RecordPos) -> StorageResult<()> {
        let slot_size = self.codec.slot_size() as u64;
        let offset = pos.as_u64();
        if offset % slot_size != 0 || offset + slot_size > self.data.len() {
            return Err(StorageError::InvalidPosition {
                pos,
                heap_len: self.data.len(),
                slot_size: self.codec.slot_size(),
            });
        }
        Ok(())
    }

    fn read_slot(&self, pos: RecordPos) -> StorageResult<(SlotHeader, Record)> {
        self.check_position(pos)?;
        let bytes = self.data.read_vec_at(pos.as_u64(), self.codec.slot_size())?;
        self.codec.decode_slot(&mut bytes.as_slice())
    }
}

fn table_name(table_dir: &Path) -> String {
    table_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
