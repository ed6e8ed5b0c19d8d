//! Typed values and index keys.

use std::cmp::Ordering;
use std::fmt;

use crate::cast::{self, truncate_to_width};
use crate::error::{DbError, DbResult};
use crate::types::{ColumnType, TypeTag};

/// A typed column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// BOOL value.
    Bool(bool),
    /// INT value.
    Int(i32),
    /// FLOAT value.
    Float(f32),
    /// VARCHAR value, without padding.
    Varchar(String),
}

impl Value {
    /// Parses a string-encoded value into the given column type.
    ///
    /// VARCHAR values longer than the column width are truncated at a
    /// char boundary.
    pub fn parse(ty: ColumnType, raw: &str) -> DbResult<Self> {
        cast::cast_value(ty, raw)
    }

    /// Returns the type tag of this value.
    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        match self {
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Varchar(_) => TypeTag::Varchar,
        }
    }

    /// Encodes this value into exactly `ty.size()` bytes, appending to `out`.
    pub fn encode_into(&self, ty: ColumnType, out: &mut Vec<u8>) -> DbResult<()> {
        match (self, ty.tag()) {
            (Value::Bool(v), TypeTag::Bool) => out.push(u8::from(*v)),
            (Value::Int(v), TypeTag::Int) => out.extend_from_slice(&v.to_le_bytes()),
            (Value::Float(v), TypeTag::Float) => out.extend_from_slice(&v.to_le_bytes()),
            (Value::Varchar(s), TypeTag::Varchar) => {
                let bytes = truncate_to_width(s, ty.size()).as_bytes();
                out.extend_from_slice(bytes);
                out.resize(out.len() + ty.size() - bytes.len(), 0);
            }
            (value, tag) => {
                return Err(DbError::invalid_type(format!(
                    "cannot encode {} value as {}",
                    value.tag(),
                    tag
                )))
            }
        }
        Ok(())
    }

    /// Encodes this value into a fresh buffer of `ty.size()` bytes.
    pub fn encode(&self, ty: ColumnType) -> DbResult<Vec<u8>> {
        let mut out = Vec::with_capacity(ty.size());
        self.encode_into(ty, &mut out)?;
        Ok(out)
    }

    /// Decodes a fixed-width field.
    pub fn decode(ty: ColumnType, bytes: &[u8]) -> DbResult<Self> {
        if bytes.len() != ty.size() {
            return Err(DbError::WidthMismatch {
                expected: ty.size(),
                actual: bytes.len(),
            });
        }
        let value = match ty.tag() {
            TypeTag::Bool => Value::Bool(bytes[0] != 0),
            TypeTag::Int => Value::Int(i32::from_le_bytes(fixed4(bytes))),
            TypeTag::Float => Value::Float(f32::from_le_bytes(fixed4(bytes))),
            TypeTag::Varchar => Value::Varchar(decode_padded(bytes)),
        };
        Ok(value)
    }

    /// Compares two values of the same type.
    ///
    /// Returns `None` when the variants differ. Floats use a total order.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Some(a.total_cmp(b)),
            (Value::Varchar(a), Value::Varchar(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Varchar(v) => f.write_str(v),
        }
    }
}

/// An indexable key.
///
/// BOOL is never a key. Primary keys are INT or FLOAT; secondary indexes
/// also accept VARCHAR.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    /// INT key.
    Int(i32),
    /// FLOAT key.
    Float(f32),
    /// VARCHAR key.
    Varchar(String),
}

impl Key {
    /// Returns the type tag of this key.
    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        match self {
            Key::Int(_) => TypeTag::Int,
            Key::Float(_) => TypeTag::Float,
            Key::Varchar(_) => TypeTag::Varchar,
        }
    }

    /// Converts a value into a key, rejecting BOOL.
    pub fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Int(v) => Ok(Key::Int(v)),
            Value::Float(v) => Ok(Key::Float(v)),
            Value::Varchar(v) => Ok(Key::Varchar(v)),
            Value::Bool(_) => Err(DbError::NotIndexable { tag: TypeTag::Bool }),
        }
    }

    /// Smallest key of the column type, used for an unbounded lower range.
    pub fn min_for(ty: ColumnType) -> DbResult<Self> {
        match ty.tag() {
            TypeTag::Int => Ok(Key::Int(i32::MIN)),
            TypeTag::Float => Ok(Key::Float(f32::NEG_INFINITY)),
            TypeTag::Varchar => Ok(Key::Varchar(String::new())),
            TypeTag::Bool => Err(DbError::NotIndexable { tag: TypeTag::Bool }),
        }
    }

    /// Largest key of the column type, used for an unbounded upper range.
    pub fn max_for(ty: ColumnType) -> DbResult<Self> {
        match ty.tag() {
            TypeTag::Int => Ok(Key::Int(i32::MAX)),
            TypeTag::Float => Ok(Key::Float(f32::INFINITY)),
            TypeTag::Varchar => Ok(Key::Varchar(
                std::iter::repeat(char::MAX).take(ty.size()).collect(),
            )),
            TypeTag::Bool => Err(DbError::NotIndexable { tag: TypeTag::Bool }),
        }
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Int(v) => Value::Int(v),
            Key::Float(v) => Value::Float(v),
            Key::Varchar(v) => Value::Varchar(v),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{}", v),
            Key::Float(v) => write!(f, "{}", v),
            Key::Varchar(v) => f.write_str(v),
        }
    }
}

fn fixed4(bytes: &[u8]) -> [u8; 4] {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    buf
}

fn decode_padded(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
