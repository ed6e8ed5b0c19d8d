//! On-disk AVL tree index.
//!
//! Every node lives in one file (see `arena`); links are file offsets.
//! Nodes are fetched as short-lived owned copies and written back after
//! modification, so no in-memory handle outlives the operation that read
//! it. Removed nodes go on a free list and their slots are reused by
//! later inserts.
//!
//! Insert and remove are recursive and return the (possibly new) root of
//! the subtree they were called on; every ancestor on the path recomputes
//! its height and rebalances on the way back up.

mod arena;
mod node;

use std::cmp::Ordering;
use std::path::Path;

use heapdb_common::{IndexKind, RecordPos, Timed};
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::key::KeyType;
use crate::Index;

use arena::NodeArena;
use node::Node;

/// Self-balancing binary search tree stored in a single file.
pub struct AvlIndex<K: KeyType> {
    arena: NodeArena<K>,
}

impl<K: KeyType> AvlIndex<K> {
    /// Creates an empty index file, replacing any existing one.
    pub fn create(path: &Path, key_width: usize, sync_writes: bool) -> IndexResult<Self> {
        K::check_width(key_width)?;
        Ok(Self {
            arena: NodeArena::create(path, key_width, sync_writes)?,
        })
    }

    /// Opens an existing index file.
    pub fn open(path: &Path, key_width: usize, sync_writes: bool) -> IndexResult<Self> {
        K::check_width(key_width)?;
        Ok(Self {
            arena: NodeArena::open(path, key_width, sync_writes)?,
        })
    }

    /// Size of the index file in bytes.
    pub fn file_len(&self) -> u64 {
        self.arena.file_len()
    }

    /// Height of the tree; `-1` when empty.
    pub fn height(&self) -> IndexResult<i32> {
        self.arena.height(self.arena.root)
    }

    /// Checks balance, stored heights, key order and the node count.
    pub fn validate(&self) -> IndexResult<()> {
        let mut count = 0u64;
        let mut prev: Option<K> = None;
        self.validate_at(self.arena.root, &mut prev, &mut count)?;
        if count != self.arena.len {
            return Err(IndexError::corrupted(format!(
                "header counts {} nodes, tree has {}",
                self.arena.len, count
            )));
        }
        Ok(())
    }

    fn validate_at(
        &self,
        link: Option<u64>,
        prev: &mut Option<K>,
        count: &mut u64,
    ) -> IndexResult<i32> {
        let Some(at) = link else {
            return Ok(-1);
        };
        let node = self.arena.read(at)?;
        let left = self.validate_at(node.left, prev, count)?;
        if let Some(p) = prev.as_ref() {
            if p.compare(&node.key) != Ordering::Less {
                return Err(IndexError::corrupted(format!(
                    "keys out of order at node {}: {:?} then {:?}",
                    at, p, node.key
                )));
            }
        }
        *prev = Some(node.key.clone());
        *count += 1;
        let right = self.validate_at(node.right, prev, count)?;

        let height = 1 + left.max(right);
        if node.height != height {
            return Err(IndexError::corrupted(format!(
                "node {} stores height {}, actual {}",
                at, node.height, height
            )));
        }
        if (left - right).abs() > 1 {
            return Err(IndexError::corrupted(format!(
                "node {} has balance factor {}",
                at,
                left - right
            )));
        }
        Ok(height)
    }

    fn insert_at(
        &mut self,
        link: Option<u64>,
        key: &K,
        pos: RecordPos,
        inserted: &mut bool,
    ) -> IndexResult<u64> {
        let Some(at) = link else {
            *inserted = true;
            return self.arena.alloc(&Node::leaf(key.clone(), pos));
        };
        let mut node = self.arena.read(at)?;
        match key.compare(&node.key) {
            Ordering::Less => node.left = Some(self.insert_at(node.left, key, pos, inserted)?),
            Ordering::Greater => node.right = Some(self.insert_at(node.right, key, pos, inserted)?),
            Ordering::Equal => return Ok(at),
        }
        if !*inserted {
            return Ok(at);
        }
        self.rebalance(at, node)
    }

    fn remove_at(
        &mut self,
        link: Option<u64>,
        key: &K,
        removed: &mut Option<RecordPos>,
    ) -> IndexResult<Option<u64>> {
        let Some(at) = link else {
            return Ok(None);
        };
        let mut node = self.arena.read(at)?;
        match key.compare(&node.key) {
            Ordering::Less => node.left = self.remove_at(node.left, key, removed)?,
            Ordering::Greater => node.right = self.remove_at(node.right, key, removed)?,
            Ordering::Equal => {
                *removed = Some(node.record_pos);
                match (node.left, node.right) {
                    (None, None) => {
                        self.arena.free(at)?;
                        return Ok(None);
                    }
                    (Some(child), None) | (None, Some(child)) => {
                        self.arena.free(at)?;
                        return Ok(Some(child));
                    }
                    (Some(left), Some(_)) => {
                        // replace with the in-order predecessor, then remove it below
                        let pred = self.max_node(left)?;
                        let mut ignored = None;
                        node.left = self.remove_at(Some(left), &pred.key, &mut ignored)?;
                        node.key = pred.key;
                        node.record_pos = pred.record_pos;
                    }
                }
            }
        }
        if removed.is_none() {
            return Ok(Some(at));
        }
        self.rebalance(at, node).map(Some)
    }

    fn max_node(&self, mut at: u64) -> IndexResult<Node<K>> {
        loop {
            let node = self.arena.read(at)?;
            match node.right {
                Some(right) => at = right,
                None => return Ok(node),
            }
        }
    }

    /// Recomputes the height of `node` (stored at `at`), rotates if it is
    /// out of balance, writes it back and returns the subtree root.
    fn rebalance(&mut self, at: u64, mut node: Node<K>) -> IndexResult<u64> {
        let left_h = self.arena.height(node.left)?;
        let right_h = self.arena.height(node.right)?;
        let balance = left_h - right_h;

        if balance > 1 {
            if let Some(left) = node.left {
                let child = self.arena.read(left)?;
                if self.arena.height(child.left)? < self.arena.height(child.right)? {
                    node.left = Some(self.rotate_left(left)?);
                }
            }
            self.arena.write(at, &node)?;
            return self.rotate_right(at);
        }
        if balance < -1 {
            if let Some(right) = node.right {
                let child = self.arena.read(right)?;
                if self.arena.height(child.right)? < self.arena.height(child.left)? {
                    node.right = Some(self.rotate_right(right)?);
                }
            }
            self.arena.write(at, &node)?;
            return self.rotate_left(at);
        }

        node.height = 1 + left_h.max(right_h);
        self.arena.write(at, &node)?;
        Ok(at)
    }

    fn rotate_right(&mut self, at: u64) -> IndexResult<u64> {
        let mut node = self.arena.read(at)?;
        let Some(pivot_at) = node.left else {
            return Ok(at);
        };
        let mut pivot = self.arena.read(pivot_at)?;

        node.left = pivot.right;
        node.height = 1 + self.arena.height(node.left)?.max(self.arena.height(node.right)?);
        self.arena.write(at, &node)?;

        pivot.right = Some(at);
        pivot.height = 1 + self.arena.height(pivot.left)?.max(node.height);
        self.arena.write(pivot_at, &pivot)?;
        Ok(pivot_at)
    }

    fn rotate_left(&mut self, at: u64) -> IndexResult<u64> {
        let mut node = self.arena.read(at)?;
        let Some(pivot_at) = node.right else {
            return Ok(at);
        };
        let mut pivot = self.arena.read(pivot_at)?;

        node.right = pivot.left;
        node.height = 1 + self.arena.height(node.left)?.max(self.arena.height(node.right)?);
        self.arena.write(at, &node)?;

        pivot.left = Some(at);
        pivot.height = 1 + node.height.max(self.arena.height(pivot.right)?);
        self.arena.write(pivot_at, &pivot)?;
        Ok(pivot_at)
    }

    fn range_at(
        &self,
        link: Option<u64>,
        begin: &K,
        end: &K,
        out: &mut Vec<RecordPos>,
    ) -> IndexResult<()> {
        let Some(at) = link else {
            return Ok(());
        };
        let node = self.arena.read(at)?;
        if node.key.compare(begin) == Ordering::Greater {
            self.range_at(node.left, begin, end, out)?;
        }
        if node.key.compare(begin) != Ordering::Less && node.key.compare(end) != Ordering::Greater {
            out.push(node.record_pos);
        }
        if node.key.compare(end) == Ordering::Less {
            self.range_at(node.right, begin, end, out)?;
        }
        Ok(())
    }

    fn collect_at(&self, link: Option<u64>, out: &mut Vec<(K, RecordPos)>) -> IndexResult<()> {
        let Some(at) = link else {
            return Ok(());
        };
        let node = self.arena.read(at)?;
        self.collect_at(node.left, out)?;
        out.push((node.key, node.record_pos));
        self.collect_at(node.right, out)
    }

    fn insert_one(&mut self, key: &K, pos: RecordPos) -> IndexResult<bool> {
        let mut inserted = false;
        let root = self.insert_at(self.arena.root, key, pos, &mut inserted)?;
        if inserted {
            self.arena.root = Some(root);
        }
        Ok(inserted)
    }
}

impl<K: KeyType> Index<K> for AvlIndex<K> {
    fn kind(&self) -> IndexKind {
        IndexKind::Avl
    }

    fn add(&mut self, key: K, pos: RecordPos) -> IndexResult<Timed<bool>> {
        Timed::try_measure(|| {
            let inserted = self.insert_one(&key, pos)?;
            if inserted {
                self.arena.write_header()?;
            }
            Ok(inserted)
        })
    }

    fn search(&self, key: &K) -> IndexResult<Timed<Option<RecordPos>>> {
        Timed::try_measure(|| {
            let mut link = self.arena.root;
            while let Some(at) = link {
                let node = self.arena.read(at)?;
                link = match key.compare(&node.key) {
                    Ordering::Less => node.left,
                    Ordering::Greater => node.right,
                    Ordering::Equal => return Ok(Some(node.record_pos)),
                };
            }
            Ok(None)
        })
    }

    fn range_search(&self, begin: &K, end: &K) -> IndexResult<Timed<Vec<RecordPos>>> {
        Timed::try_measure(|| {
            let mut out = Vec::new();
            if begin.compare(end) != Ordering::Greater {
                self.range_at(self.arena.root, begin, end, &mut out)?;
            }
            Ok(out)
        })
    }

    fn remove(&mut self, key: &K) -> IndexResult<Timed<Option<RecordPos>>> {
        Timed::try_measure(|| {
            let mut removed = None;
            let root = self.remove_at(self.arena.root, key, &mut removed)?;
            if removed.is_some() {
                self.arena.root = root;
                self.arena.write_header()?;
            }
            Ok(removed)
        })
    }

    fn bulk_insert(&mut self, entries: Vec<(K, RecordPos)>) -> IndexResult<Timed<Vec<bool>>> {
        Timed::try_measure(|| {
            let mut flags = Vec::with_capacity(entries.len());
            for (key, pos) in &entries {
                flags.push(self.insert_one(key, *pos)?);
            }
            self.arena.write_header()?;
            debug!(
                path = %self.arena.path().display(),
                inserted = flags.iter().filter(|f| **f).count(),
                "bulk loaded AVL index"
            );
            Ok(flags)
        })
    }

    fn entries(&self) -> IndexResult<Vec<(K, RecordPos)>> {
        let mut out = Vec::with_capacity(self.arena.len as usize);
        self.collect_at(self.arena.root, &mut out)?;
        Ok(out)
    }

    fn len(&self) -> usize {
        self.arena.len as usize
    }

    fn sync(&self) -> IndexResult<()> {
        self.arena.sync()
    }
}

impl<K: KeyType> std::fmt::Debug for AvlIndex<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvlIndex")
            .field("path", &self.arena.path())
            .field("root", &self.arena.root)
            .field("free_head", &self.arena.free_head)
            .field("len", &self.arena.len)
            .finish()
    }
}
