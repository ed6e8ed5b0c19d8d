//! Type-erased index handle.

use std::path::Path;

use heapdb_common::config::{EngineConfig, IsamConfig, SequentialConfig};
use heapdb_common::{ColumnType, DbError, IndexKind, Key, RecordPos, Timed, TypeTag};

use crate::avl::AvlIndex;
use crate::error::IndexResult;
use crate::isam::IsamIndex;
use crate::key::KeyType;
use crate::sequential::SequentialIndex;
use crate::Index;

/// Settings shared by every index an engine opens.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Flush each index write to disk.
    pub sync_writes: bool,
    /// Sequential index tuning.
    pub sequential: SequentialConfig,
    /// ISAM index tuning.
    pub isam: IsamConfig,
}

impl IndexOptions {
    /// Extracts the index settings from an engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            sync_writes: config.sync_writes,
            sequential: config.sequential.clone(),
            isam: config.isam.clone(),
        }
    }
}

/// An index of any kind over one of the indexable key types.
pub enum IndexContainer {
    /// INT keys.
    Int(Box<dyn Index<i32>>),
    /// FLOAT keys.
    Float(Box<dyn Index<f32>>),
    /// VARCHAR keys.
    Varchar(Box<dyn Index<String>>),
}

fn build<K: KeyType>(
    kind: IndexKind,
    path: &Path,
    width: usize,
    options: &IndexOptions,
    create: bool,
) -> IndexResult<Box<dyn Index<K>>> {
    let sync = options.sync_writes;
    let threshold = options.sequential.rebuild_threshold;
    Ok(match (kind, create) {
        (IndexKind::Sequential, true) => {
            Box::new(SequentialIndex::<K>::create(path, width, threshold, sync)?)
        }
        (IndexKind::Sequential, false) => {
            Box::new(SequentialIndex::<K>::open(path, width, threshold, sync)?)
        }
        (IndexKind::Avl, true) => Box::new(AvlIndex::<K>::create(path, width, sync)?),
        (IndexKind::Avl, false) => Box::new(AvlIndex::<K>::open(path, width, sync)?),
        (IndexKind::Isam, true) => {
            Box::new(IsamIndex::<K>::create(path, width, &options.isam, sync)?)
        }
        (IndexKind::Isam, false) => {
            Box::new(IsamIndex::<K>::open(path, width, &options.isam, sync)?)
        }
    })
}

/// Applies one expression to whichever typed index is inside.
macro_rules! dispatch {
    ($self:expr, $index:ident => $body:expr) => {
        match $self {
            IndexContainer::Int($index) => $body,
            IndexContainer::Float($index) => $body,
            IndexContainer::Varchar($index) => $body,
        }
    };
}

/// Same as `dispatch!`, additionally unwrapping `$key` to the index's key type.
macro_rules! dispatch_key {
    ($self:expr, $key:expr, ($index:ident, $k:ident) => $body:expr) => {
        match $self {
            IndexContainer::Int($index) => {
                let $k = <i32 as KeyType>::from_key($key)?;
                $body
            }
            IndexContainer::Float($index) => {
                let $k = <f32 as KeyType>::from_key($key)?;
                $body
            }
            IndexContainer::Varchar($index) => {
                let $k = <String as KeyType>::from_key($key)?;
                $body
            }
        }
    };
}

impl IndexContainer {
    fn with_kind(
        kind: IndexKind,
        path: &Path,
        ty: ColumnType,
        options: &IndexOptions,
        create: bool,
    ) -> IndexResult<Self> {
        let width = ty.size();
        Ok(match ty.tag() {
            TypeTag::Int => Self::Int(build(kind, path, width, options, create)?),
            TypeTag::Float => Self::Float(build(kind, path, width, options, create)?),
            TypeTag::Varchar => Self::Varchar(build(kind, path, width, options, create)?),
            TypeTag::Bool => return Err(DbError::NotIndexable { tag: TypeTag::Bool }.into()),
        })
    }

    /// Creates an empty index file for a column of type `ty`.
    pub fn create(
        kind: IndexKind,
        path: &Path,
        ty: ColumnType,
        options: &IndexOptions,
    ) -> IndexResult<Self> {
        Self::with_kind(kind, path, ty, options, true)
    }

    /// Opens an existing index file for a column of type `ty`.
    pub fn open(
        kind: IndexKind,
        path: &Path,
        ty: ColumnType,
        options: &IndexOptions,
    ) -> IndexResult<Self> {
        Self::with_kind(kind, path, ty, options, false)
    }

    /// Which kind of index this is.
    pub fn kind(&self) -> IndexKind {
        dispatch!(self, index => index.kind())
    }

    /// Key type of the index.
    pub fn key_tag(&self) -> TypeTag {
        match self {
            Self::Int(_) => TypeTag::Int,
            Self::Float(_) => TypeTag::Float,
            Self::Varchar(_) => TypeTag::Varchar,
        }
    }

    /// Inserts `key → pos`; false if the key already exists.
    pub fn add(&mut self, key: Key, pos: RecordPos) -> IndexResult<Timed<bool>> {
        dispatch_key!(self, key, (index, k) => index.add(k, pos))
    }

    /// Point lookup.
    pub fn search(&self, key: Key) -> IndexResult<Timed<Option<RecordPos>>> {
        dispatch_key!(self, key, (index, k) => index.search(&k))
    }

    /// Positions of every key in `[begin, end]`, ordered by key.
    pub fn range_search(&self, begin: Key, end: Key) -> IndexResult<Timed<Vec<RecordPos>>> {
        match self {
            Self::Int(index) => index.range_search(&i32::from_key(begin)?, &i32::from_key(end)?),
            Self::Float(index) => index.range_search(&f32::from_key(begin)?, &f32::from_key(end)?),
            Self::Varchar(index) => {
                index.range_search(&String::from_key(begin)?, &String::from_key(end)?)
            }
        }
    }

    /// Removes a key, returning the position it mapped to.
    pub fn remove(&mut self, key: Key) -> IndexResult<Timed<Option<RecordPos>>> {
        dispatch_key!(self, key, (index, k) => index.remove(&k))
    }

    /// Inserts a batch, returning per-entry success in input order.
    pub fn bulk_insert(&mut self, entries: Vec<(Key, RecordPos)>) -> IndexResult<Timed<Vec<bool>>> {
        fn unwrap_all<K: KeyType>(entries: Vec<(Key, RecordPos)>) -> IndexResult<Vec<(K, RecordPos)>> {
            entries
                .into_iter()
                .map(|(key, pos)| Ok((K::from_key(key)?, pos)))
                .collect()
        }
        match self {
            Self::Int(index) => index.bulk_insert(unwrap_all(entries)?),
            Self::Float(index) => index.bulk_insert(unwrap_all(entries)?),
            Self::Varchar(index) => index.bulk_insert(unwrap_all(entries)?),
        }
    }

    /// Every entry, ordered by key.
    pub fn entries(&self) -> IndexResult<Vec<(Key, RecordPos)>> {
        fn wrap_all<K: KeyType>(entries: Vec<(K, RecordPos)>) -> Vec<(Key, RecordPos)> {
            entries.into_iter().map(|(k, pos)| (k.into_key(), pos)).collect()
        }
        Ok(dispatch!(self, index => wrap_all(index.entries()?)))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        dispatch!(self, index => index.len())
    }

    /// Returns true if the index holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes the index file to disk.
    pub fn sync(&self) -> IndexResult<()> {
        dispatch!(self, index => index.sync())
    }
}

impl std::fmt::Debug for IndexContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexContainer")
            .field("kind", &self.kind())
            .field("key", &self.key_tag())
            .field("len", &self.len())
            .finish()
    }
}
