//! AVL node layout.
//!
//! ```text
//! key (key_width) | record_pos i64 | left i64 | right i64 | next_free i64 | height i32
//! ```
//!
//! Child and free-list links are byte offsets into the index file, `-1`
//! when null.

use bytes::{Buf, BufMut};
use heapdb_common::RecordPos;

use crate::error::{IndexError, IndexResult};
use crate::key::KeyType;

/// Bytes after the key.
pub(crate) const NODE_TAIL_SIZE: usize = 8 + 8 + 8 + 8 + 4;

/// An owned copy of one node, fetched on demand from the arena.
#[derive(Debug, Clone)]
pub(crate) struct Node<K> {
    pub key: K,
    pub record_pos: RecordPos,
    pub left: Option<u64>,
    pub right: Option<u64>,
    pub next_free: Option<u64>,
    pub height: i32,
}

impl<K: KeyType> Node<K> {
    pub fn leaf(key: K, record_pos: RecordPos) -> Self {
        Self {
            key,
            record_pos,
            left: None,
            right: None,
            next_free: None,
            height: 0,
        }
    }

    pub fn encode(&self, key_width: usize, buf: &mut Vec<u8>) {
        self.key.encode(key_width, buf);
        buf.put_i64_le(RecordPos::to_disk(Some(self.record_pos)));
        buf.put_i64_le(link_to_disk(self.left));
        buf.put_i64_le(link_to_disk(self.right));
        buf.put_i64_le(link_to_disk(self.next_free));
        buf.put_i32_le(self.height);
    }

    pub fn decode(key_width: usize, bytes: &[u8]) -> IndexResult<Self> {
        let key = K::decode(&bytes[..key_width]);
        let mut buf = &bytes[key_width..];
        let raw_pos = buf.get_i64_le();
        let record_pos = RecordPos::from_disk(raw_pos).ok_or_else(|| {
            IndexError::corrupted(format!("AVL node has record position {}", raw_pos))
        })?;
        Ok(Self {
            key,
            record_pos,
            left: link_from_disk(buf.get_i64_le()),
            right: link_from_disk(buf.get_i64_le()),
            next_free: link_from_disk(buf.get_i64_le()),
            height: buf.get_i32_le(),
        })
    }
}

pub(crate) fn link_to_disk(link: Option<u64>) -> i64 {
    link.map_or(-1, |p| p as i64)
}

pub(crate) fn link_from_disk(raw: i64) -> Option<u64> {
    u64::try_from(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_layout() {
        let mut node = Node::leaf(17i32, RecordPos::new(90));
        node.right = Some(64);
        node.height = 1;

        let mut buf = Vec::new();
        node.encode(4, &mut buf);
        assert_eq!(buf.len(), 4 + NODE_TAIL_SIZE);

        let decoded = Node::<i32>::decode(4, &buf).unwrap();
        assert_eq!(decoded.key, 17);
        assert_eq!(decoded.left, None);
        assert_eq!(decoded.right, Some(64));
        assert_eq!(decoded.height, 1);
    }
}
