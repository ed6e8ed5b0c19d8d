//! Table schema and persisted table metadata.
//!
//! # File Format
//!
//! All integers little-endian:
//! - Magic (4 bytes) "HPMT"
//! - Version (4 bytes)
//! - Column count (4 bytes)
//! - Per column: name length (2 bytes), name, type code (1 byte), width (4 bytes)
//! - Primary key length (2 bytes), primary key name
//! - First deleted slot (8 bytes, -1 = none)
//! - Live record count (8 bytes)
//! - CRC32 of everything above (4 bytes)

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};
use heapdb_common::constants::METADATA_FILE;
use heapdb_common::{ColumnType, RecordPos, TypeTag};

use crate::error::{StorageError, StorageResult};

/// Magic number for metadata files.
const METADATA_MAGIC: u32 = 0x544D_5048; // "HPMT"

/// Version of the metadata file format.
const METADATA_VERSION: u32 = 1;

/// Temporary file used for atomic replacement.
const METADATA_TMP_FILE: &str = "metadata.bin.tmp";

/// Column names, types and primary key of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    column_names: Vec<String>,
    types: Vec<ColumnType>,
    primary_key: String,
}

impl TableSchema {
    /// Creates a schema.
    ///
    /// Fails unless names and types have the same non-zero length, names
    /// are unique and non-empty, and the primary key is one of them.
    pub fn new(
        column_names: Vec<String>,
        types: Vec<ColumnType>,
        primary_key: impl Into<String>,
    ) -> StorageResult<Self> {
        let primary_key = primary_key.into();
        if column_names.is_empty() {
            return Err(StorageError::schema_mismatch("a table needs at least one column"));
        }
        if column_names.len() != types.len() {
            return Err(StorageError::schema_mismatch(format!(
                "{} column names but {} types",
                column_names.len(),
                types.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in &column_names {
            if name.is_empty() {
                return Err(StorageError::schema_mismatch("empty column name"));
            }
            if !seen.insert(name.as_str()) {
                return Err(StorageError::schema_mismatch(format!(
                    "duplicate column name '{}'",
                    name
                )));
            }
        }
        if !seen.contains(primary_key.as_str()) {
            return Err(StorageError::schema_mismatch(format!(
                "primary key '{}' is not a column",
                primary_key
            )));
        }
        Ok(Self {
            column_names,
            types,
            primary_key,
        })
    }

    /// Column names, in schema order.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Column types, in schema order.
    pub fn types(&self) -> &[ColumnType] {
        &self.types
    }

    /// Primary key column name.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|c| c == name)
    }

    /// Position of the primary key column.
    pub fn primary_key_index(&self) -> usize {
        // validated in `new`
        self.column_index(&self.primary_key).unwrap_or(0)
    }
}

/// Persisted state of a heap file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    /// Schema.
    pub schema: TableSchema,
    /// Head of the deleted chain.
    pub first_deleted: Option<RecordPos>,
    /// Number of live records.
    pub record_count: u64,
}

impl TableMetadata {
    /// Metadata of an empty table.
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            first_deleted: None,
            record_count: 0,
        }
    }

    /// Serializes the metadata, checksum included.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u32_le(METADATA_MAGIC);
        buf.put_u32_le(METADATA_VERSION);
        buf.put_u32_le(self.schema.column_names.len() as u32);
        for (name, ty) in self.schema.column_names.iter().zip(&self.schema.types) {
            put_str(&mut buf, name);
            buf.put_u8(ty.tag().as_u8());
            buf.put_u32_le(ty.size() as u32);
        }
        put_str(&mut buf, &self.schema.primary_key);
        buf.put_i64_le(RecordPos::to_disk(self.first_deleted));
        buf.put_u64_le(self.record_count);
        let checksum = crc32fast::hash(&buf);
        buf.put_u32_le(checksum);
        buf.to_vec()
    }

    /// Deserializes and validates metadata.
    pub fn decode(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() < 4 + 4 + 4 + 4 {
            return Err(StorageError::corrupted(format!(
                "metadata too short: {} bytes",
                bytes.len()
            )));
        }
        let (body, trailer) = bytes.split_at(bytes.len() - 4);
        let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let computed = crc32fast::hash(body);

        let mut buf = body;
        let magic = buf.get_u32_le();
        if magic != METADATA_MAGIC {
            return Err(StorageError::corrupted(format!(
                "invalid magic: expected {:08x}, got {:08x}",
                METADATA_MAGIC, magic
            )));
        }
        let version = buf.get_u32_le();
        if version != METADATA_VERSION {
            return Err(StorageError::corrupted(format!(
                "unsupported metadata version: {}",
                version
            )));
        }
        if stored != computed {
            return Err(StorageError::corrupted(format!(
                "checksum mismatch: expected {:08x}, got {:08x}",
                stored, computed
            )));
        }

        let count = get_u32(&mut buf)? as usize;
        let mut column_names = Vec::with_capacity(count.min(1024));
        let mut types = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            column_names.push(get_str(&mut buf)?);
            let code = get_u8(&mut buf)?;
            let tag = TypeTag::from_u8(code)
                .ok_or_else(|| StorageError::corrupted(format!("unknown type code {}", code)))?;
            let size = get_u32(&mut buf)? as usize;
            let ty = ColumnType::with_size(tag, size)
                .map_err(|e| StorageError::corrupted(e.to_string()))?;
            types.push(ty);
        }
        let primary_key = get_str(&mut buf)?;
        let first_deleted = RecordPos::from_disk(get_i64(&mut buf)?);
        let record_count = get_u64(&mut buf)?;
        if buf.has_remaining() {
            return Err(StorageError::corrupted(format!(
                "{} trailing metadata bytes",
                buf.remaining()
            )));
        }

        let schema = TableSchema::new(column_names, types, primary_key)
            .map_err(|e| StorageError::corrupted(e.to_string()))?;
        Ok(Self {
            schema,
            first_deleted,
            record_count,
        })
    }

    /// Reads the metadata file of a table directory.
    pub fn read_from(dir: &Path) -> StorageResult<Self> {
        let bytes = fs::read(dir.join(METADATA_FILE))?;
        Self::decode(&bytes)
    }

    /// Writes the metadata file of a table directory.
    ///
    /// Uses atomic file replacement: write to temp file, sync, rename.
    pub fn write_to(&self, dir: &Path, sync: bool) -> StorageResult<()> {
        let tmp_path = dir.join(METADATA_TMP_FILE);
        let path = dir.join(METADATA_FILE);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&self.encode())?;
        if sync {
            file.sync_all()?;
        }
        drop(file);

        fs::rename(&tmp_path, &path)?;

        if sync {
            if let Ok(dir) = File::open(dir) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }
}

fn put_str(buf: &mut BytesMut, s: &str) {
    buf.put_u16_le(s.len() as u16);
    buf.put_slice(s.as_bytes());
}

fn need(buf: &[u8], n: usize) -> StorageResult<()> {
    if buf.len() < n {
        return Err(StorageError::corrupted("metadata ends unexpectedly"));
    }
    Ok(())
}

fn get_u8(buf: &mut &[u8]) -> StorageResult<u8> {
    need(buf, 1)?;
    Ok(buf.get_u8())
}

fn get_u32(buf: &mut &[u8]) -> StorageResult<u32> {
    need(buf, 4)?;
    Ok(buf.get_u32_le())
}

fn get_i64(buf: &mut &[u8]) -> StorageResult<i64> {
    need(buf, 8)?;
    Ok(buf.get_i64_le())
}

fn get_u64(buf: &mut &[u8]) -> StorageResult<u64> {
    need(buf, 8)?;
    Ok(buf.get_u64_le())
}

fn get_str(buf: &mut &[u8]) -> StorageResult<String> {
    need(buf, 2)?;
    let len = buf.get_u16_le() as usize;
    need(buf, len)?;
    let s = std::str::from_utf8(&buf[..len])
        .map_err(|_| StorageError::corrupted("column name is not UTF-8"))?
        .to_string();
    buf.advance(len);
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn schema() -> TableSchema {
        TableSchema::new(
            vec!["id".into(), "name".into(), "score".into()],
            vec![
                ColumnType::int(),
                ColumnType::varchar(10).unwrap(),
                ColumnType::float(),
            ],
            "id",
        )
        .unwrap()
    }

    #[test]
    fn test_schema_validation() {
        assert!(TableSchema::new(vec![], vec![], "id").is_err());
        assert!(TableSchema::new(vec!["id".into()], vec![], "id").is_err());
        assert!(TableSchema::new(vec!["id".into()], vec![ColumnType::int()], "pk").is_err());
        assert!(TableSchema::new(
            vec!["a".into(), "a".into()],
            vec![ColumnType::int(), ColumnType::int()],
            "a"
        )
        .is_err());

        let schema = schema();
        assert_eq!(schema.primary_key_index(), 0);
        assert_eq!(schema.column_index("score"), Some(2));
        assert_eq!(schema.column_index("nope"), None);
    }

    #[test]
    fn test_encode_decode() {
        let meta = TableMetadata {
            schema: schema(),
            first_deleted: Some(RecordPos::new(42)),
            record_count: 7,
        };
        let decoded = TableMetadata::decode(&meta.encode()).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_detects_corruption() {
        let bytes = TableMetadata::new(schema()).encode();

        let mut flipped = bytes.clone();
        let mid = flipped.len() / 2;
        flipped[mid] ^= 0xFF;
        assert!(matches!(
            TableMetadata::decode(&flipped),
            Err(StorageError::Corrupted(_))
        ));

        let mut bad_magic = bytes.clone();
        bad_magic[0] = 0;
        assert!(TableMetadata::decode(&bad_magic).is_err());

        assert!(TableMetadata::decode(&bytes[..bytes.len() - 3]).is_err());
        assert!(TableMetadata::decode(&[]).is_err());
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let meta = TableMetadata::new(schema());
        meta.write_to(dir.path(), true).unwrap();
        assert!(!dir.path().join(METADATA_TMP_FILE).exists());
        assert_eq!(TableMetadata::read_from(dir.path()).unwrap(), meta);
    }
}
