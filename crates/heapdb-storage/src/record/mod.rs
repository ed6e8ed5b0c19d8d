//! Records.
//!
//! A [`Record`] is one row as raw fixed-width fields, in schema order,
//! plus a liveness status. Records are owned by whoever read them or is
//! about to write them.

mod codec;

pub use codec::{RowCodec, SlotHeader, SLOT_HEADER_SIZE};

use heapdb_common::{ColumnType, Value};

use crate::error::{StorageError, StorageResult};

/// Liveness of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    /// Live record.
    Ok,
    /// Tombstoned record.
    Deleted,
}

impl RecordStatus {
    /// Returns the on-disk status byte.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        match self {
            RecordStatus::Ok => 1,
            RecordStatus::Deleted => 0,
        }
    }

    /// Decodes a status byte.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(RecordStatus::Ok),
            0 => Some(RecordStatus::Deleted),
            _ => None,
        }
    }
}

/// One row: raw fields in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<Vec<u8>>,
    status: RecordStatus,
}

impl Record {
    /// Creates a live record from raw fields.
    pub fn new(fields: Vec<Vec<u8>>) -> Self {
        Self {
            fields,
            status: RecordStatus::Ok,
        }
    }

    /// Encodes typed values into a record.
    pub fn from_values(values: &[Value], types: &[ColumnType]) -> StorageResult<Self> {
        if values.len() != types.len() {
            return Err(StorageError::schema_mismatch(format!(
                "expected {} values, got {}",
                types.len(),
                values.len()
            )));
        }
        let fields = values
            .iter()
            .zip(types)
            .map(|(value, ty)| value.encode(*ty))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(fields))
    }

    /// Casts string-encoded values and encodes them into a record.
    pub fn from_strings<S: AsRef<str>>(raw: &[S], types: &[ColumnType]) -> StorageResult<Self> {
        if raw.len() != types.len() {
            return Err(StorageError::schema_mismatch(format!(
                "expected {} values, got {}",
                types.len(),
                raw.len()
            )));
        }
        let values = raw
            .iter()
            .zip(types)
            .map(|(s, ty)| Value::parse(*ty, s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_values(&values, types)
    }

    /// Returns the raw fields.
    pub fn fields(&self) -> &[Vec<u8>] {
        &self.fields
    }

    /// Returns one raw field.
    pub fn field(&self, idx: usize) -> Option<&[u8]> {
        self.fields.get(idx).map(Vec::as_slice)
    }

    /// Consumes the record, returning its fields.
    pub fn into_fields(self) -> Vec<Vec<u8>> {
        self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the status.
    pub fn status(&self) -> RecordStatus {
        self.status
    }

    /// Returns true if the record is tombstoned.
    pub fn is_deleted(&self) -> bool {
        self.status == RecordStatus::Deleted
    }

    /// Sets the status.
    pub fn set_status(&mut self, status: RecordStatus) {
        self.status = status;
    }

    /// Decodes field `idx` as a value of type `ty`.
    pub fn value(&self, idx: usize, ty: ColumnType) -> StorageResult<Value> {
        let field = self.field(idx).ok_or_else(|| {
            StorageError::schema_mismatch(format!(
                "field {} out of range for a record of {} fields",
                idx,
                self.fields.len()
            ))
        })?;
        Ok(Value::decode(ty, field)?)
    }

    /// Decodes every field.
    pub fn values(&self, types: &[ColumnType]) -> StorageResult<Vec<Value>> {
        if types.len() != self.fields.len() {
            return Err(StorageError::schema_mismatch(format!(
                "record has {} fields, schema has {}",
                self.fields.len(),
                types.len()
            )));
        }
        types
            .iter()
            .enumerate()
            .map(|(idx, ty)| self.value(idx, *ty))
            .collect()
    }

    /// Renders every field as text.
    pub fn to_strings(&self, types: &[ColumnType]) -> StorageResult<Vec<String>> {
        Ok(self
            .values(types)?
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    /// Keeps only the fields at `indices`, which must be ascending.
    pub(crate) fn project(self, indices: &[usize]) -> Self {
        let mut fields = self.fields;
        // walk backwards so earlier indices stay valid while removing
        for idx in (0..fields.len()).rev() {
            if indices.binary_search(&idx).is_err() {
                fields.remove(idx);
            }
        }
        Self {
            fields,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types() -> Vec<ColumnType> {
        vec![
            ColumnType::int(),
            ColumnType::varchar(5).unwrap(),
            ColumnType::bool(),
        ]
    }

    #[test]
    fn test_from_strings_and_back() {
        let record = Record::from_strings(&["7", "ann", "yes"], &types()).unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record.field(1).unwrap(), b"ann\0\0");
        assert_eq!(
            record.to_strings(&types()).unwrap(),
            vec!["7".to_string(), "ann".to_string(), "true".to_string()]
        );
    }

    #[test]
    fn test_arity_mismatch() {
        let err = Record::from_strings(&["7"], &types()).unwrap_err();
        assert!(matches!(err, StorageError::SchemaMismatch(_)));
    }

    #[test]
    fn test_malformed_field() {
        let err = Record::from_strings(&["x", "a", "1"], &types()).unwrap_err();
        assert_eq!(err.code(), heapdb_common::ErrorCode::MalformedLiteral);
    }

    #[test]
    fn test_project() {
        let record = Record::from_strings(&["7", "ann", "no"], &types()).unwrap();
        let projected = record.project(&[0, 2]);
        assert_eq!(projected.len(), 2);
        assert_eq!(projected.field(0).unwrap(), 7i32.to_le_bytes());
        assert_eq!(projected.field(1).unwrap(), &[0u8]);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RecordStatus::from_u8(RecordStatus::Ok.as_u8()), Some(RecordStatus::Ok));
        assert_eq!(RecordStatus::from_u8(0), Some(RecordStatus::Deleted));
        assert_eq!(RecordStatus::from_u8(5), None);
    }
}
