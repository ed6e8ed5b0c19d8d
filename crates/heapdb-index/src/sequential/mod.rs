//! Sequential (sorted file) index.
//!
//! # File Format
//!
//! ```text
//! +-----------+------------------------+---------------------+
//! | header    | main run (sorted)      | overflow (unsorted) |
//! | 40 bytes  | main_count entries     | overflow_count      |
//! +-----------+------------------------+---------------------+
//! ```
//!
//! Each entry is `key (key_width) | pos (i64 LE) | live (u8)`.
//!
//! New keys are appended to the overflow area. Removal clears the live
//! byte in place. Once the overflow area or the number of dead entries
//! reaches the rebuild threshold, the live entries are sorted and the
//! file is rewritten as a single main run. Lookups binary-search the main
//! run and scan the overflow area.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::path::Path;

use bytes::{Buf, BufMut};
use heapdb_common::{IndexKind, RecordPos, Timed};
use heapdb_storage::file::{BlockFile, OpenOptions};
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::key::KeyType;
use crate::Index;

/// Magic number for sequential index files.
const SEQ_MAGIC: u32 = 0x5145_5348; // "HSEQ"

/// Size of the file header.
const HEADER_SIZE: u64 = 40;

#[derive(Debug, Clone, Copy, Default)]
struct SeqHeader {
    main_count: u64,
    overflow_count: u64,
    dead_count: u64,
}

#[derive(Debug, Clone)]
struct Entry<K> {
    key: K,
    pos: RecordPos,
    live: bool,
}

/// Sorted-run index with an overflow area.
pub struct SequentialIndex<K: KeyType> {
    file: BlockFile,
    key_width: usize,
    header: SeqHeader,
    rebuild_threshold: usize,
    _key: PhantomData<K>,
}

impl<K: KeyType> SequentialIndex<K> {
    /// Creates an empty index file, replacing any existing one.
    pub fn create(
        path: &Path,
        key_width: usize,
        rebuild_threshold: usize,
        sync_writes: bool,
    ) -> IndexResult<Self> {
        K::check_width(key_width)?;
        let mut file = BlockFile::open(
            path,
            OpenOptions::recreate().sync_on_write(sync_writes),
        )?;
        file.set_len(0)?;
        let mut index = Self {
            file,
            key_width,
            header: SeqHeader::default(),
            rebuild_threshold: rebuild_threshold.max(1),
            _key: PhantomData,
        };
        index.write_header()?;
        Ok(index)
    }

    /// Opens an existing index file.
    pub fn open(
        path: &Path,
        key_width: usize,
        rebuild_threshold: usize,
        sync_writes: bool,
    ) -> IndexResult<Self> {
        K::check_width(key_width)?;
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
        if magic != SEQ_MAGIC {
            return Err(IndexError::corrupted(format!(
                "{}: invalid magic {:08x}",
                path.display(),
                magic
            )));
        }
        let tag = buf.get_u8();
        buf.advance(3);
        let width = buf.get_u32_le() as usize;
        buf.advance(4);
        if tag != K::TAG.as_u8() || width != key_width {
            return Err(IndexError::corrupted(format!(
                "{}: holds {}-byte '{}' keys, expected {}-byte {} keys",
                path.display(),
                width,
                tag as char,
                key_width,
                K::TAG
            )));
        }
        let header = SeqHeader {
            main_count: buf.get_u64_le(),
            overflow_count: buf.get_u64_le(),
            dead_count: buf.get_u64_le(),
        };

        let index = Self {
            file,
            key_width,
            header,
            rebuild_threshold: rebuild_threshold.max(1),
            _key: PhantomData,
        };
        let expected = index.entry_offset(header.main_count + header.overflow_count);
        if index.file.len() != expected {
            return Err(IndexError::corrupted(format!(
                "{}: {} bytes on disk, header implies {}",
                path.display(),
                index.file.len(),
                expected
            )));
        }
        Ok(index)
    }

    /// Entries in the sorted main run, dead ones included.
    pub fn main_len(&self) -> u64 {
        self.header.main_count
    }

    /// Entries in the overflow area, dead ones included.
    pub fn overflow_len(&self) -> u64 {
        self.header.overflow_count
    }

    fn entry_size(&self) -> usize {
        self.key_width + 8 + 1
    }

    fn entry_offset(&self, idx: u64) -> u64 {
        HEADER_SIZE + idx * self.entry_size() as u64
    }

    fn total_entries(&self) -> u64 {
        self.header.main_count + self.header.overflow_count
    }

    fn write_header(&mut self) -> IndexResult<()> {
        let mut buf = Vec::with_capacity(HEADER_SIZE as usize);
        buf.put_u32_le(SEQ_MAGIC);
        buf.put_u8(K::TAG.as_u8());
        buf.put_bytes(0, 3);
        buf.put_u32_le(self.key_width as u32);
        buf.put_u32_le(0);
        buf.put_u64_le(self.header.main_count);
        buf.put_u64_le(self.header.overflow_count);
        buf.put_u64_le(self.header.dead_count);
        self.file.write_all_at(&buf, 0)?;
        Ok(())
    }

    fn encode_entry(&self, entry: &Entry<K>, buf: &mut Vec<u8>) {
        entry.key.encode(self.key_width, buf);
        buf.put_i64_le(RecordPos::to_disk(Some(entry.pos)));
        buf.put_u8(u8::from(entry.live));
    }

    fn decode_entry(&self, bytes: &[u8]) -> IndexResult<Entry<K>> {
        let key = K::decode(&bytes[..self.key_width]);
        let mut rest = &bytes[self.key_width..];
        let raw_pos = rest.get_i64_le();
        let live = rest.get_u8() != 0;
        let pos = RecordPos::from_disk(raw_pos)
            .ok_or_else(|| IndexError::corrupted(format!("negative record position {}", raw_pos)))?;
        Ok(Entry { key, pos, live })
    }

    fn read_entry(&self, idx: u64) -> IndexResult<Entry<K>> {
        let bytes = self.file.read_vec_at(self.entry_offset(idx), self.entry_size())?;
        self.decode_entry(&bytes)
    }

    fn read_entries(&self, from: u64, to: u64) -> IndexResult<Vec<Entry<K>>> {
        if from >= to {
            return Ok(Vec::new());
        }
        let size = self.entry_size();
        let bytes = self
            .file
            .read_vec_at(self.entry_offset(from), (to - from) as usize * size)?;
        bytes.chunks_exact(size).map(|c| self.decode_entry(c)).collect()
    }

    fn mark_dead(&mut self, idx: u64) -> IndexResult<()> {
        let offset = self.entry_offset(idx) + self.key_width as u64 + 8;
        self.file.write_all_at(&[0], offset)?;
        Ok(())
    }

    /// First main-run index whose key is not less than `key`.
    fn lower_bound(&self, key: &K) -> IndexResult<u64> {
        let (mut lo, mut hi) = (0, self.header.main_count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.read_entry(mid)?.key.compare(key) == Ordering::Less {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    fn find_live(&self, key: &K) -> IndexResult<Option<(u64, RecordPos)>> {
        let idx = self.lower_bound(key)?;
        if idx < self.header.main_count {
            let entry = self.read_entry(idx)?;
            if entry.live && entry.key.compare(key) == Ordering::Equal {
                return Ok(Some((idx, entry.pos)));
            }
        }
        let overflow = self.read_entries(self.header.main_count, self.total_entries())?;
        Ok(overflow
            .into_iter()
            .enumerate()
            .find(|(_, e)| e.live && e.key.compare(key) == Ordering::Equal)
            .map(|(i, e)| (self.header.main_count + i as u64, e.pos)))
    }

    fn live_entries(&self) -> IndexResult<Vec<(K, RecordPos)>> {
        Ok(self
            .read_entries(0, self.total_entries())?
            .into_iter()
            .filter(|e| e.live)
            .map(|e| (e.key, e.pos))
            .collect())
    }

    /// Rewrites the file as one sorted main run.
    fn rebuild(&mut self, mut entries: Vec<(K, RecordPos)>) -> IndexResult<()> {
        entries.sort_by(|a, b| a.0.compare(&b.0));
        let mut buf = Vec::with_capacity(entries.len() * self.entry_size());
        for (key, pos) in entries.iter() {
            let entry = Entry {
                key: key.clone(),
                pos: *pos,
                live: true,
            };
            self.encode_entry(&entry, &mut buf);
        }
        self.header = SeqHeader {
            main_count: entries.len() as u64,
            overflow_count: 0,
            dead_count: 0,
        };
        self.file.write_all_at(&buf, HEADER_SIZE)?;
        self.file.set_len(HEADER_SIZE + buf.len() as u64)?;
        self.write_header()?;
        debug!(
            path = %self.file.path().display(),
            entries = entries.len(),
            "rebuilt sequential index"
        );
        Ok(())
    }

    fn compact(&mut self) -> IndexResult<()> {
        let entries = self.live_entries()?;
        self.rebuild(entries)
    }
}

impl<K: KeyType> Index<K> for SequentialIndex<K> {
    fn kind(&self) -> IndexKind {
        IndexKind::Sequential
    }

    fn add(&mut self, key: K, pos: RecordPos) -> IndexResult<Timed<bool>> {
        Timed::try_measure(|| {
            if self.find_live(&key)?.is_some() {
                return Ok(false);
            }
            let mut buf = Vec::with_capacity(self.entry_size());
            self.encode_entry(&Entry { key, pos, live: true }, &mut buf);
            let offset = self.entry_offset(self.total_entries());
            self.file.write_all_at(&buf, offset)?;
            self.header.overflow_count += 1;
            self.write_header()?;

            if self.header.overflow_count as usize >= self.rebuild_threshold {
                self.compact()?;
            }
            Ok(true)
        })
    }

    fn search(&self, key: &K) -> IndexResult<Timed<Option<RecordPos>>> {
        Timed::try_measure(|| Ok(self.find_live(key)?.map(|(_, pos)| pos)))
    }

    fn range_search(&self, begin: &K, end: &K) -> IndexResult<Timed<Vec<RecordPos>>> {
        Timed::try_measure(|| {
            if begin.compare(end) == Ordering::Greater {
                return Ok(Vec::new());
            }
            let mut hits = Vec::new();
            let mut idx = self.lower_bound(begin)?;
            while idx < self.header.main_count {
                let entry = self.read_entry(idx)?;
                if entry.key.compare(end) == Ordering::Greater {
                    break;
                }
                if entry.live {
                    hits.push((entry.key, entry.pos));
                }
                idx += 1;
            }
            for entry in self.read_entries(self.header.main_count, self.total_entries())? {
                if entry.live
                    && entry.key.compare(begin) != Ordering::Less
                    && entry.key.compare(end) != Ordering::Greater
                {
                    hits.push((entry.key, entry.pos));
                }
            }
            hits.sort_by(|a, b| a.0.compare(&b.0));
            Ok(hits.into_iter().map(|(_, pos)| pos).collect())
        })
    }

    fn remove(&mut self, key: &K) -> IndexResult<Timed<Option<RecordPos>>> {
        Timed::try_measure(|| {
            let Some((idx, pos)) = self.find_live(key)? else {
                return Ok(None);
            };
            self.mark_dead(idx)?;
            self.header.dead_count += 1;
            self.write_header()?;

            if self.header.dead_count as usize >= self.rebuild_threshold {
                self.compact()?;
            }
            Ok(Some(pos))
        })
    }

    fn bulk_insert(&mut self, entries: Vec<(K, RecordPos)>) -> IndexResult<Timed<Vec<bool>>> {
        Timed::try_measure(|| {
            let mut existing = self.live_entries()?;
            existing.sort_by(|a, b| a.0.compare(&b.0));

            let mut flags = vec![false; entries.len()];
            let mut order: Vec<usize> = (0..entries.len()).collect();
            // stable: among equal keys the earliest input wins
            order.sort_by(|a, b| entries[*a].0.compare(&entries[*b].0));

            let mut accepted: Vec<(K, RecordPos)> = Vec::with_capacity(entries.len());
            for idx in order {
                let key = &entries[idx].0;
                let dup_in_batch = accepted
                    .last()
                    .map_or(false, |(k, _)| k.compare(key) == Ordering::Equal);
                let dup_existing = existing
                    .binary_search_by(|(k, _)| k.compare(key))
                    .is_ok();
                if !dup_in_batch && !dup_existing {
                    accepted.push(entries[idx].clone());
                    flags[idx] = true;
                }
            }

            existing.extend(accepted);
            self.rebuild(existing)?;
            Ok(flags)
        })
    }

    fn entries(&self) -> IndexResult<Vec<(K, RecordPos)>> {
        let mut entries = self.live_entries()?;
        entries.sort_by(|a, b| a.0.compare(&b.0));
        Ok(entries)
    }

    fn len(&self) -> usize {
        (self.total_entries() - self.header.dead_count) as usize
    }

    fn sync(&self) -> IndexResult<()> {
        self.file.sync()?;
        Ok(())
    }
}

impl<K: KeyType> std::fmt::Debug for SequentialIndex<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialIndex")
            .field("path", &self.file.path())
            .field("key_width", &self.key_width)
            .field("main_count", &self.header.main_count)
            .field("overflow_count", &self.header.overflow_count)
            .field("dead_count", &self.header.dead_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn pos(n: u64) -> RecordPos {
        RecordPos::new(n * 100)
    }

    fn int_index(dir: &Path, threshold: usize) -> SequentialIndex<i32> {
        SequentialIndex::create(&dir.join("id.idx"), 4, threshold, false).unwrap()
    }

    #[test]
    fn test_add_search_duplicate() {
        let dir = tempdir().unwrap();
        let mut index = int_index(dir.path(), 4);

        assert!(index.add(5, pos(5)).unwrap().value);
        assert!(index.add(3, pos(3)).unwrap().value);
        assert!(!index.add(5, pos(9)).unwrap().value);

        assert_eq!(index.search(&5).unwrap().value, Some(pos(5)));
        assert_eq!(index.search(&4).unwrap().value, None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_rebuild_merges_overflow() {
        let dir = tempdir().unwrap();
        let mut index = int_index(dir.path(), 3);
        for k in [9, 1, 5] {
            index.add(k, pos(k as u64)).unwrap();
        }
        assert_eq!(index.main_len(), 3);
        assert_eq!(index.overflow_len(), 0);

        index.add(4, pos(4)).unwrap();
        assert_eq!(index.overflow_len(), 1);

        let keys: Vec<i32> = index.entries().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![1, 4, 5, 9]);
        assert_eq!(index.search(&4).unwrap().value, Some(pos(4)));
        assert_eq!(index.search(&9).unwrap().value, Some(pos(9)));
    }

    #[test]
    fn test_remove_and_readd() {
        let dir = tempdir().unwrap();
        let mut index = int_index(dir.path(), 64);
        for k in 0..10 {
            index.add(k, pos(k as u64)).unwrap();
        }
        assert_eq!(index.remove(&4).unwrap().value, Some(pos(4)));
        assert_eq!(index.remove(&4).unwrap().value, None);
        assert_eq!(index.search(&4).unwrap().value, None);

        assert!(index.add(4, pos(44)).unwrap().value);
        assert_eq!(index.search(&4).unwrap().value, Some(pos(44)));
        assert_eq!(index.len(), 10);
    }

    #[test]
    fn test_range_search_spans_main_and_overflow() {
        let dir = tempdir().unwrap();
        let mut index = int_index(dir.path(), 64);
        index
            .bulk_insert((0..20).step_by(2).map(|k| (k, pos(k as u64))).collect())
            .unwrap();
        index.add(7, pos(7)).unwrap();
        index.add(3, pos(3)).unwrap();
        index.remove(&6).unwrap();

        let hits = index.range_search(&3, &10).unwrap().value;
        assert_eq!(hits, vec![pos(3), pos(4), pos(7), pos(8), pos(10)]);
        assert!(index.range_search(&10, &3).unwrap().value.is_empty());
    }

    #[test]
    fn test_bulk_insert_flags() {
        let dir = tempdir().unwrap();
        let mut index = int_index(dir.path(), 64);
        index.add(2, pos(2)).unwrap();

        let flags = index
            .bulk_insert(vec![(5, pos(5)), (2, pos(20)), (1, pos(1)), (5, pos(50))])
            .unwrap()
            .value;
        assert_eq!(flags, vec![true, false, true, false]);
        assert_eq!(index.search(&5).unwrap().value, Some(pos(5)));
        assert_eq!(index.overflow_len(), 0);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("score.idx");
        {
            let mut index = SequentialIndex::<f32>::create(&path, 4, 2, true).unwrap();
            for (i, k) in [2.5f32, -1.0, 7.25].into_iter().enumerate() {
                index.add(k, pos(i as u64)).unwrap();
            }
            index.sync().unwrap();
        }
        let index = SequentialIndex::<f32>::open(&path, 4, 2, false).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.search(&-1.0).unwrap().value, Some(pos(1)));

        assert!(SequentialIndex::<i32>::open(&path, 4, 2, false).is_err());
        assert!(SequentialIndex::<String>::open(&path, 4, 2, false).is_err());
    }

    #[test]
    fn test_varchar_keys() {
        let dir = tempdir().unwrap();
        let mut index =
            SequentialIndex::<String>::create(&dir.path().join("name.idx"), 6, 2, false).unwrap();
        for (i, name) in ["mia", "al", "zoe", "bo"].into_iter().enumerate() {
            index.add(name.to_string(), pos(i as u64)).unwrap();
        }
        let hits = index
            .range_search(&"b".to_string(), &"n".to_string())
            .unwrap()
            .value;
        assert_eq!(hits, vec![pos(3), pos(0)]);
    }

    #[test]
    fn test_randomized_against_model() {
        let dir = tempdir().unwrap();
        let mut index = int_index(dir.path(), 8);
        let mut model = BTreeMap::new();
        let mut rng = StdRng::seed_from_u64(7);

        for step in 0..600u64 {
            let key = rng.gen_range(0..200);
            if rng.gen_bool(0.65) {
                let inserted = index.add(key, pos(step)).unwrap().value;
                assert_eq!(inserted, !model.contains_key(&key));
                model.entry(key).or_insert(pos(step));
            } else {
                let removed = index.remove(&key).unwrap().value;
                assert_eq!(removed, model.remove(&key));
            }
        }

        assert_eq!(index.len(), model.len());
        let mut lookups: Vec<i32> = (0..200).collect();
        lookups.shuffle(&mut rng);
        for key in lookups.into_iter().take(50) {
            assert_eq!(index.search(&key).unwrap().value, model.get(&key).copied());
        }
        for _ in 0..30 {
            let a = rng.gen_range(-10..210);
            let b = rng.gen_range(a..220);
            let expected: Vec<RecordPos> = model.range(a..=b).map(|(_, p)| *p).collect();
            assert_eq!(index.range_search(&a, &b).unwrap().value, expected);
        }
    }
}
