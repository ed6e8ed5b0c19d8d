//! Fixed-width row codec.
//!
//! # Encoding Format
//!
//! A row is the concatenation of each column's fixed-width encoding in
//! schema order: no separators, no length prefixes, no null markers.
//!
//! A heap slot prefixes the row with a slot header:
//! - Status (1 byte): 1 = OK, 0 = DELETED
//! - Next deleted slot (8 bytes, i64 LE, -1 = none)

use bytes::{Buf, BufMut};
use heapdb_common::{ColumnType, RecordPos};

use super::{Record, RecordStatus};
use crate::error::{StorageError, StorageResult};

/// Size of the per-slot header.
pub const SLOT_HEADER_SIZE: usize = 1 + 8;

/// Header stored in front of every row in a heap file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotHeader {
    /// Liveness of the slot.
    pub status: RecordStatus,
    /// Next slot on the deleted chain. Only meaningful while deleted.
    pub next_deleted: Option<RecordPos>,
}

impl SlotHeader {
    /// Header of a live slot.
    pub const LIVE: SlotHeader = SlotHeader {
        status: RecordStatus::Ok,
        next_deleted: None,
    };

    /// Header of a tombstoned slot linked to `next`.
    pub fn deleted(next: Option<RecordPos>) -> Self {
        Self {
            status: RecordStatus::Deleted,
            next_deleted: next,
        }
    }

    /// Writes the header.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.status.as_u8());
        buf.put_i64_le(RecordPos::to_disk(self.next_deleted));
    }

    /// Reads a header.
    pub fn decode(buf: &mut impl Buf) -> StorageResult<Self> {
        if buf.remaining() < SLOT_HEADER_SIZE {
            return Err(StorageError::Truncated {
                expected: SLOT_HEADER_SIZE,
                available: buf.remaining(),
            });
        }
        let raw = buf.get_u8();
        let status = RecordStatus::from_u8(raw)
            .ok_or_else(|| StorageError::corrupted(format!("invalid slot status byte {}", raw)))?;
        let next_deleted = RecordPos::from_disk(buf.get_i64_le());
        Ok(Self {
            status,
            next_deleted,
        })
    }
}

/// Encodes and decodes rows of one table.
#[derive(Debug, Clone)]
pub struct RowCodec {
    types: Vec<ColumnType>,
    row_size: usize,
}

impl RowCodec {
    /// Creates a codec for the given column types.
    pub fn new(types: Vec<ColumnType>) -> Self {
        let row_size = types.iter().map(ColumnType::size).sum();
        Self { types, row_size }
    }

    /// Column types, in schema order.
    pub fn types(&self) -> &[ColumnType] {
        &self.types
    }

    /// Bytes per row.
    #[inline]
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Bytes per heap slot (header + row).
    #[inline]
    pub fn slot_size(&self) -> usize {
        SLOT_HEADER_SIZE + self.row_size
    }

    /// Serializes a row in one pass.
    pub fn encode(&self, record: &Record, buf: &mut impl BufMut) -> StorageResult<()> {
        if record.len() != self.types.len() {
            return Err(StorageError::schema_mismatch(format!(
                "record has {} fields, schema has {}",
                record.len(),
                self.types.len()
            )));
        }
        for (idx, (field, ty)) in record.fields().iter().zip(&self.types).enumerate() {
            if field.len() != ty.size() {
                return Err(StorageError::schema_mismatch(format!(
                    "field {} is {} bytes, {} needs {}",
                    idx,
                    field.len(),
                    ty,
                    ty.size()
                )));
            }
        }
        if buf.remaining_mut() < self.row_size {
            return Err(StorageError::Truncated {
                expected: self.row_size,
                available: buf.remaining_mut(),
            });
        }
        for field in record.fields() {
            buf.put_slice(field);
        }
        Ok(())
    }

    /// Deserializes a row in one pass.
    pub fn decode(&self, buf: &mut impl Buf) -> StorageResult<Record> {
        if buf.remaining() < self.row_size {
            return Err(StorageError::Truncated {
                expected: self.row_size,
                available: buf.remaining(),
            });
        }
        let mut fields = Vec::with_capacity(self.types.len());
        for ty in &self.types {
            let mut field = vec![0u8; ty.size()];
            buf.copy_to_slice(&mut field);
            fields.push(field);
        }
        Ok(Record::new(fields))
    }

    /// Serializes a slot header followed by the row.
    pub fn encode_slot(
        &self,
        header: SlotHeader,
        record: &Record,
        buf: &mut impl BufMut,
    ) -> StorageResult<()> {
        header.encode(buf);
        self.encode(record, buf)
    }

    /// Deserializes a slot. The record's status is taken from the header.
    pub fn decode_slot(&self, buf: &mut impl Buf) -> StorageResult<(SlotHeader, Record)> {
        let header = SlotHeader::decode(buf)?;
        let mut record = self.decode(buf)?;
        record.set_status(header.status);
        Ok((header, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapdb_common::Value;

    fn codec() -> RowCodec {
        RowCodec::new(vec![
            ColumnType::int(),
            ColumnType::float(),
            ColumnType::bool(),
            ColumnType::varchar(6).unwrap(),
        ])
    }

    #[test]
    fn test_row_size() {
        let codec = codec();
        assert_eq!(codec.row_size(), 4 + 4 + 1 + 6);
        assert_eq!(codec.slot_size(), codec.row_size() + 9);
    }

    #[test]
    fn test_roundtrip_preserves_bytes() {
        let codec = codec();
        let record = Record::from_values(
            &[
                Value::Int(-3),
                Value::Float(1.25),
                Value::Bool(true),
                Value::Varchar("héllo".into()),
            ],
            codec.types(),
        )
        .unwrap();

        let mut buf = Vec::new();
        codec.encode(&record, &mut buf).unwrap();
        assert_eq!(buf.len(), codec.row_size());

        let decoded = codec.decode(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded.fields(), record.fields());
    }

    #[test]
    fn test_slot_roundtrip() {
        let codec = RowCodec::new(vec![ColumnType::int()]);
        let record = Record::from_values(&[Value::Int(9)], codec.types()).unwrap();

        let mut buf = Vec::new();
        codec
            .encode_slot(SlotHeader::deleted(Some(RecordPos::new(26))), &record, &mut buf)
            .unwrap();
        assert_eq!(buf.len(), codec.slot_size());

        let (header, decoded) = codec.decode_slot(&mut buf.as_slice()).unwrap();
        assert_eq!(header.next_deleted, Some(RecordPos::new(26)));
        assert!(decoded.is_deleted());
    }

    #[test]
    fn test_decode_short_buffer() {
        let codec = codec();
        let err = codec.decode(&mut &[0u8; 3][..]).unwrap_err();
        assert!(matches!(err, StorageError::Truncated { expected: 15, available: 3 }));
    }

    #[test]
    fn test_encode_wrong_width() {
        let codec = RowCodec::new(vec![ColumnType::int()]);
        let record = Record::new(vec![vec![1, 2]]);
        let err = codec.encode(&record, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, StorageError::SchemaMismatch(_)));
    }

    #[test]
    fn test_bad_status_byte() {
        let mut bytes = vec![7u8];
        bytes.extend_from_slice(&(-1i64).to_le_bytes());
        let err = SlotHeader::decode(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, StorageError::Corrupted(_)));
    }
}
