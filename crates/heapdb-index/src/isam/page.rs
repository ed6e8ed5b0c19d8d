//! ISAM data page layout.
//!
//! ```text
//! count u32 | next_overflow i64 | capacity × (key (key_width) | pos i64)
//! ```
//!
//! Unused entry slots are zero-filled.

use bytes::{Buf, BufMut};
use heapdb_common::RecordPos;

use crate::error::{IndexError, IndexResult};
use crate::key::KeyType;

/// Bytes before the entries.
const PAGE_HEADER_SIZE: usize = 4 + 8;

/// Size in bytes of a page with the given geometry.
pub(crate) fn page_size(key_width: usize, capacity: usize) -> usize {
    PAGE_HEADER_SIZE + capacity * (key_width + 8)
}

#[derive(Debug, Clone)]
pub(crate) struct Page<K> {
    pub entries: Vec<(K, RecordPos)>,
    pub next: Option<u64>,
}

impl<K: KeyType> Page<K> {
    pub fn new(entries: Vec<(K, RecordPos)>) -> Self {
        Self {
            entries,
            next: None,
        }
    }

    pub fn encode(&self, key_width: usize, capacity: usize, buf: &mut Vec<u8>) {
        let start = buf.len();
        buf.put_u32_le(self.entries.len() as u32);
        buf.put_i64_le(self.next.map_or(-1, |p| p as i64));
        for (key, pos) in &self.entries {
            key.encode(key_width, buf);
            buf.put_i64_le(RecordPos::to_disk(Some(*pos)));
        }
        buf.resize(start + page_size(key_width, capacity), 0);
    }

    pub fn decode(key_width: usize, capacity: usize, bytes: &[u8]) -> IndexResult<Self> {
        let mut buf = bytes;
        let count = buf.get_u32_le() as usize;
        if count > capacity {
            return Err(IndexError::corrupted(format!(
                "ISAM page holds {} entries, capacity is {}",
                count, capacity
            )));
        }
        let next = u64::try_from(buf.get_i64_le()).ok();
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let key = K::decode(&buf[..key_width]);
            buf.advance(key_width);
            let raw = buf.get_i64_le();
            let pos = RecordPos::from_disk(raw).ok_or_else(|| {
                IndexError::corrupted(format!("ISAM entry has record position {}", raw))
            })?;
            entries.push((key, pos));
        }
        Ok(Self { entries, next })
    }
}
