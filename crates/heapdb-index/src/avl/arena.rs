//! Node arena over a single index file.
//!
//! The file is the arena and node offsets are its indices. Freed slots
//! form a singly-linked list threaded through `next_free` and are reused
//! before the file grows.
//!
//! Header layout (32 bytes):
//! magic u32 | key_width u32 | root i64 | free_head i64 | len u64

use std::marker::PhantomData;
use std::path::Path;

use bytes::{Buf, BufMut};
use heapdb_storage::file::{BlockFile, OpenOptions};

use super::node::{link_from_disk, link_to_disk, Node, NODE_TAIL_SIZE};
use crate::error::{IndexError, IndexResult};
use crate::key::KeyType;

/// Magic number for AVL index files.
const AVL_MAGIC: u32 = 0x4C56_4148; // "HAVL"

/// Size of the file header.
pub(crate) const HEADER_SIZE: u64 = 32;

pub(crate) struct NodeArena<K> {
    file: BlockFile,
    key_width: usize,
    pub root: Option<u64>,
    pub free_head: Option<u64>,
    pub len: u64,
    _key: PhantomData<K>,
}

impl<K: KeyType> NodeArena<K> {
    pub fn create(path: &Path, key_width: usize, sync_writes: bool) -> IndexResult<Self> {
        let mut file = BlockFile::open(
            path,
            OpenOptions::recreate().sync_on_write(sync_writes),
        )?;
        file.set_len(0)?;
        let mut arena = Self {
            file,
            key_width,
            root: None,
            free_head: None,
            len: 0,
            _key: PhantomData,
        };
        arena.write_header()?;
        Ok(arena)
    }

    pub fn open(path: &Path, key_width: usize, sync_writes: bool) -> IndexResult<Self> {
        let file = BlockFile::open(path, OpenOptions::for_read_write().sync_on_write(sync_writes))?;
        if file.len() < HEADER_SIZE {
            return Err(IndexError::corrupted(format!(
                "{}: file shorter than header",
                path.display()
            )));
        }
        let raw = file.read_vec_at(0, HEADER_SIZE as usize)?;
        let mut buf = raw.as_slice();
        let magic = buf.get_u32_le();
        let width = buf.get_u32_le() as usize;
        if magic != AVL_MAGIC || width != key_width {
            return Err(IndexError::corrupted(format!(
                "{}: not an AVL index of {}-byte keys",
                path.display(),
                key_width
            )));
        }
        let arena = Self {
            root: link_from_disk(buf.get_i64_le()),
            free_head: link_from_disk(buf.get_i64_le()),
            len: buf.get_u64_le(),
            file,
            key_width,
            _key: PhantomData,
        };
        if (arena.file.len() - HEADER_SIZE) % arena.node_size() as u64 != 0 {
            return Err(IndexError::corrupted(format!(
                "{}: trailing partial node",
                path.display()
            )));
        }
        Ok(arena)
    }

    pub fn node_size(&self) -> usize {
        self.key_width + NODE_TAIL_SIZE
    }

    pub fn file_len(&self) -> u64 {
        self.file.len()
    }

    pub fn write_header(&mut self) -> IndexResult<()> {
        let mut buf = Vec::with_capacity(HEADER_SIZE as usize);
        buf.put_u32_le(AVL_MAGIC);
        buf.put_u32_le(self.key_width as u32);
        buf.put_i64_le(link_to_disk(self.root));
        buf.put_i64_le(link_to_disk(self.free_head));
        buf.put_u64_le(self.len);
        self.file.write_all_at(&buf, 0)?;
        Ok(())
    }

    pub fn read(&self, at: u64) -> IndexResult<Node<K>> {
        if at < HEADER_SIZE || (at - HEADER_SIZE) % self.node_size() as u64 != 0 {
            return Err(IndexError::corrupted(format!("bad AVL node offset {}", at)));
        }
        let bytes = self.file.read_vec_at(at, self.node_size())?;
        Node::decode(self.key_width, &bytes)
    }

    pub fn write(&mut self, at: u64, node: &Node<K>) -> IndexResult<()> {
        let mut buf = Vec::with_capacity(self.node_size());
        node.encode(self.key_width, &mut buf);
        self.file.write_all_at(&buf, at)?;
        Ok(())
    }

    /// Height of a subtree; `-1` for an empty one.
    pub fn height(&self, link: Option<u64>) -> IndexResult<i32> {
        match link {
            Some(at) => Ok(self.read(at)?.height),
            None => Ok(-1),
        }
    }

    /// Stores a node, reusing the head of the free list if there is one.
    pub fn alloc(&mut self, node: &Node<K>) -> IndexResult<u64> {
        let at = match self.free_head {
            Some(at) => {
                self.free_head = self.read(at)?.next_free;
                at
            }
            None => self.file.len(),
        };
        self.write(at, node)?;
        self.len += 1;
        Ok(at)
    }

    /// Pushes a node slot onto the free list.
    pub fn free(&mut self, at: u64) -> IndexResult<()> {
        let mut node = self.read(at)?;
        node.left = None;
        node.right = None;
        node.next_free = self.free_head;
        self.write(at, &node)?;
        self.free_head = Some(at);
        self.len -= 1;
        Ok(())
    }

    pub fn sync(&self) -> IndexResult<()> {
        self.file.sync()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
