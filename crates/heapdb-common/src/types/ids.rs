//! Identifier types: record positions, index identities, attributes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::NULL_POS;

/// Byte offset of a record slot inside a heap data file.
///
/// In memory a missing position is `Option::None`; on disk it is `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordPos(u64);

impl RecordPos {
    /// Creates a position from a byte offset.
    #[inline]
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// Returns the byte offset.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Encodes an optional position using the on-disk null sentinel.
    #[inline]
    #[must_use]
    pub fn to_disk(pos: Option<RecordPos>) -> i64 {
        match pos {
            Some(p) => p.0 as i64,
            None => NULL_POS,
        }
    }

    /// Decodes an on-disk position. Negative values are null.
    #[inline]
    #[must_use]
    pub fn from_disk(raw: i64) -> Option<RecordPos> {
        u64::try_from(raw).ok().map(RecordPos)
    }
}

impl fmt::Display for RecordPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// The kinds of single-column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexKind {
    /// Sorted file with an overflow area.
    Sequential,
    /// On-disk AVL tree.
    Avl,
    /// Static ISAM with overflow pages.
    Isam,
}

impl IndexKind {
    /// All index kinds.
    pub const ALL: [IndexKind; 3] = [IndexKind::Sequential, IndexKind::Avl, IndexKind::Isam];

    /// Name of the directory under `Indexes/` holding this kind's files.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            IndexKind::Sequential => "Sequential",
            IndexKind::Avl => "AVL",
            IndexKind::Isam => "ISAM",
        }
    }

    /// Parses a directory name (or a case-insensitive kind name).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SEQUENTIAL" => Some(IndexKind::Sequential),
            "AVL" => Some(IndexKind::Avl),
            "ISAM" => Some(IndexKind::Isam),
            _ => None,
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Identity of one index instance within a kind: (table, column).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexId {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
}

impl IndexId {
    /// Creates a new index identity.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// A (column name, string-encoded value) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    /// Column name.
    pub name: String,
    /// Value, uncast.
    pub value: String,
}

impl Attribute {
    /// Creates a new attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
