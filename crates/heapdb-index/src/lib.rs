//! # heapdb-index
//!
//! Single-column indexes mapping a key to a heap record position.
//!
//! - [`SequentialIndex`]: sorted main run plus an unsorted overflow area,
//!   merged by periodic rebuilds. Mandatory for every primary key.
//! - [`AvlIndex`]: self-balancing binary search tree stored entirely on
//!   disk, with node slots recycled through a free list.
//! - [`IsamIndex`]: static directory over fixed-capacity data pages with
//!   chained overflow pages.
//!
//! All three are generic over a [`KeyType`] (`i32`, `f32`, `String`) and
//! implement the [`Index`] trait. The engine holds them behind the closed
//! [`IndexContainer`] enum so a [`Key`](heapdb_common::Key) can be routed
//! to the right instantiation.
//!
//! Keys are unique within one index: adding a key that is already present
//! returns `false` and leaves the index unchanged.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod avl;
pub mod isam;
pub mod sequential;

mod container;
mod error;
mod key;

pub use avl::AvlIndex;
pub use container::{IndexContainer, IndexOptions};
pub use error::{IndexError, IndexResult};
pub use isam::IsamIndex;
pub use key::KeyType;
pub use sequential::SequentialIndex;

use heapdb_common::{IndexKind, RecordPos, Timed};

/// Operations every index kind supports.
///
/// Results carry the wall time of the operation.
pub trait Index<K: KeyType>: Send {
    /// Which kind of index this is.
    fn kind(&self) -> IndexKind;

    /// Inserts `key → pos`. Returns false, without mutation, if the key exists.
    fn add(&mut self, key: K, pos: RecordPos) -> IndexResult<Timed<bool>>;

    /// Point lookup.
    fn search(&self, key: &K) -> IndexResult<Timed<Option<RecordPos>>>;

    /// Positions of every key in `[begin, end]`, ordered by key.
    fn range_search(&self, begin: &K, end: &K) -> IndexResult<Timed<Vec<RecordPos>>>;

    /// Removes a key, returning the position it mapped to.
    fn remove(&mut self, key: &K) -> IndexResult<Timed<Option<RecordPos>>>;

    /// Inserts a batch, returning per-entry success in input order.
    fn bulk_insert(&mut self, entries: Vec<(K, RecordPos)>) -> IndexResult<Timed<Vec<bool>>>;

    /// Every entry, ordered by key.
    fn entries(&self) -> IndexResult<Vec<(K, RecordPos)>>;

    /// Number of keys.
    fn len(&self) -> usize;

    /// Returns true if the index holds no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes the index file to disk.
    fn sync(&self) -> IndexResult<()>;
}
