//! Column types.
//!
//! HeapDB supports a closed set of column types. BOOL, INT and FLOAT have
//! fixed native widths; VARCHAR width is declared per column.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{BOOL_WIDTH, FLOAT_WIDTH, INT_WIDTH, MAX_VARCHAR_WIDTH};
use crate::error::{DbError, DbResult};

/// Tag of a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    /// Boolean, stored as one byte.
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 32-bit float.
    Float,
    /// Fixed-width, zero-padded string.
    Varchar,
}

impl TypeTag {
    /// All type tags, in declaration order.
    pub const ALL: [TypeTag; 4] = [TypeTag::Bool, TypeTag::Int, TypeTag::Float, TypeTag::Varchar];

    /// Returns the one-byte on-disk code for this tag.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            TypeTag::Bool => b'b',
            TypeTag::Int => b'i',
            TypeTag::Float => b'f',
            TypeTag::Varchar => b'c',
        }
    }

    /// Decodes an on-disk code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            b'b' => Some(TypeTag::Bool),
            b'i' => Some(TypeTag::Int),
            b'f' => Some(TypeTag::Float),
            b'c' => Some(TypeTag::Varchar),
            _ => None,
        }
    }

    /// Returns the native width, or `None` for VARCHAR.
    #[must_use]
    pub const fn native_width(self) -> Option<usize> {
        match self {
            TypeTag::Bool => Some(BOOL_WIDTH),
            TypeTag::Int => Some(INT_WIDTH),
            TypeTag::Float => Some(FLOAT_WIDTH),
            TypeTag::Varchar => None,
        }
    }

    /// Returns true if a primary key may have this type (INT, FLOAT).
    #[must_use]
    pub const fn is_key_type(self) -> bool {
        matches!(self, TypeTag::Int | TypeTag::Float)
    }

    /// Returns true if a secondary index may be built on this type.
    #[must_use]
    pub const fn is_indexable(self) -> bool {
        !matches!(self, TypeTag::Bool)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Bool => "BOOL",
            TypeTag::Int => "INT",
            TypeTag::Float => "FLOAT",
            TypeTag::Varchar => "VARCHAR",
        };
        f.write_str(name)
    }
}

/// A column type: tag plus byte width.
///
/// Invariant: `size > 0`, and for the fixed-width tags `size` equals the
/// native width.
///
/// # Example
///
/// ```rust
/// use heapdb_common::types::{ColumnType, TypeTag};
///
/// let int = ColumnType::new(TypeTag::Int).unwrap();
/// assert_eq!(int.size(), 4);
///
/// let name = ColumnType::varchar(12).unwrap();
/// assert_eq!(name.size(), 12);
///
/// assert!(ColumnType::new(TypeTag::Varchar).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    tag: TypeTag,
    size: usize,
}

impl ColumnType {
    /// Creates a fixed-width type from its tag.
    ///
    /// Fails for VARCHAR, which must be declared with a width.
    pub fn new(tag: TypeTag) -> DbResult<Self> {
        match tag.native_width() {
            Some(size) => Ok(Self { tag, size }),
            None => Err(DbError::invalid_type(
                "VARCHAR must be declared with an explicit width",
            )),
        }
    }

    /// Creates a VARCHAR type of the given width.
    pub fn varchar(size: usize) -> DbResult<Self> {
        if size == 0 || size > MAX_VARCHAR_WIDTH {
            return Err(DbError::invalid_type(format!(
                "VARCHAR width must be in 1..={}, got {}",
                MAX_VARCHAR_WIDTH, size
            )));
        }
        Ok(Self {
            tag: TypeTag::Varchar,
            size,
        })
    }

    /// Creates a type from a tag and width, validating the pair.
    ///
    /// Used when decoding persisted schemas.
    pub fn with_size(tag: TypeTag, size: usize) -> DbResult<Self> {
        match tag.native_width() {
            Some(native) if native == size => Ok(Self { tag, size }),
            Some(native) => Err(DbError::invalid_type(format!(
                "{} has width {}, got {}",
                tag, native, size
            ))),
            None => Self::varchar(size),
        }
    }

    /// Shorthand for `BOOL`.
    #[must_use]
    pub const fn bool() -> Self {
        Self {
            tag: TypeTag::Bool,
            size: BOOL_WIDTH,
        }
    }

    /// Shorthand for `INT`.
    #[must_use]
    pub const fn int() -> Self {
        Self {
            tag: TypeTag::Int,
            size: INT_WIDTH,
        }
    }

    /// Shorthand for `FLOAT`.
    #[must_use]
    pub const fn float() -> Self {
        Self {
            tag: TypeTag::Float,
            size: FLOAT_WIDTH,
        }
    }

    /// Returns the type tag.
    #[inline]
    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Returns the width in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            TypeTag::Varchar => write!(f, "VARCHAR({})", self.size),
            tag => write!(f, "{}", tag),
        }
    }
}
