//! Static ISAM index.
//!
//! # File Format
//!
//! ```text
//! +-----------+----------------------+-------------------+----------------+
//! | header    | directory            | primary pages     | overflow pages |
//! | 32 bytes  | first key per page   | contiguous        | appended       |
//! +-----------+----------------------+-------------------+----------------+
//! ```
//!
//! The directory is read into memory on open. A build sorts all entries
//! and fills each primary page to `page_capacity × fill_factor`; the
//! directory then stays fixed until the next build. A key belongs to the
//! last primary page whose first key is not greater than it. Inserts go
//! into the first page of that page's chain with room, or a new overflow
//! page appended to the chain. Removal swaps the last entry of the page
//! into the freed slot.

mod page;

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::path::Path;

use bytes::{Buf, BufMut};
use heapdb_common::config::IsamConfig;
use heapdb_common::{IndexKind, RecordPos, Timed};
use heapdb_storage::file::{BlockFile, OpenOptions};
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::key::KeyType;
use crate::Index;

use page::{page_size, Page};

/// Magic number for ISAM index files.
const ISAM_MAGIC: u32 = 0x4D53_4948; // "HISM"

/// Size of the file header.
const HEADER_SIZE: u64 = 32;

/// Two-level static index with overflow chains.
pub struct IsamIndex<K: KeyType> {
    file: BlockFile,
    key_width: usize,
    capacity: usize,
    fill: usize,
    directory: Vec<K>,
    len: u64,
    _key: PhantomData<K>,
}

impl<K: KeyType> IsamIndex<K> {
    /// Creates an empty index file, replacing any existing one.
    pub fn create(
        path: &Path,
        key_width: usize,
        config: &IsamConfig,
        sync_writes: bool,
    ) -> IndexResult<Self> {
        K::check_width(key_width)?;
        let mut file = BlockFile::open(
            path,
            OpenOptions::recreate().sync_on_write(sync_writes),
        )?;
        file.set_len(0)?;
        let capacity = config.page_capacity.max(2);
        let mut index = Self {
            file,
            key_width,
            capacity,
            fill: config.build_fill().min(capacity),
            directory: Vec::new(),
            len: 0,
            _key: PhantomData,
        };
        index.rebuild(Vec::new())?;
        Ok(index)
    }

    /// Opens an existing index file.
    ///
    /// The page capacity comes from the file; the fill factor of future
    /// builds from `config`.
    pub fn open(
        path: &Path,
        key_width: usize,
        config: &IsamConfig,
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
        let width = buf.get_u32_le() as usize;
        let capacity = buf.get_u32_le() as usize;
        let primary_pages = buf.get_u32_le() as usize;
        let len = buf.get_u64_le();
        if magic != ISAM_MAGIC || width != key_width || capacity < 2 {
            return Err(IndexError::corrupted(format!(
                "{}: not an ISAM index of {}-byte keys",
                path.display(),
                key_width
            )));
        }

        let dir_bytes = file.read_vec_at(HEADER_SIZE, primary_pages * key_width)?;
        let directory = dir_bytes.chunks_exact(key_width).map(K::decode).collect();
        let fill = IsamConfig {
            page_capacity: capacity,
            fill_factor: config.fill_factor,
        }
        .build_fill();

        Ok(Self {
            file,
            key_width,
            capacity,
            fill,
            directory,
            len,
            _key: PhantomData,
        })
    }

    /// Number of primary pages.
    pub fn primary_pages(&self) -> usize {
        self.directory.len()
    }

    /// Size of the index file in bytes.
    pub fn file_len(&self) -> u64 {
        self.file.len()
    }

    fn page_size(&self) -> usize {
        page_size(self.key_width, self.capacity)
    }

    fn data_start(&self) -> u64 {
        HEADER_SIZE + (self.directory.len() * self.key_width) as u64
    }

    fn primary_offset(&self, page: usize) -> u64 {
        self.data_start() + (page * self.page_size()) as u64
    }

    fn encode_header(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(ISAM_MAGIC);
        buf.put_u32_le(self.key_width as u32);
        buf.put_u32_le(self.capacity as u32);
        buf.put_u32_le(self.directory.len() as u32);
        buf.put_u64_le(self.len);
        buf.put_u64_le(0);
    }

    fn write_header(&mut self) -> IndexResult<()> {
        let mut buf = Vec::with_capacity(HEADER_SIZE as usize);
        self.encode_header(&mut buf);
        self.file.write_all_at(&buf, 0)?;
        Ok(())
    }

    fn read_page(&self, offset: u64) -> IndexResult<Page<K>> {
        let bytes = self.file.read_vec_at(offset, self.page_size())?;
        Page::decode(self.key_width, self.capacity, &bytes)
    }

    fn write_page(&mut self, offset: u64, page: &Page<K>) -> IndexResult<()> {
        let mut buf = Vec::with_capacity(self.page_size());
        page.encode(self.key_width, self.capacity, &mut buf);
        self.file.write_all_at(&buf, offset)?;
        Ok(())
    }

    /// Primary page responsible for `key`.
    fn locate(&self, key: &K) -> usize {
        self.directory
            .partition_point(|first| first.compare(key) != Ordering::Greater)
            .saturating_sub(1)
    }

    /// Pages of one chain with their offsets, primary page first.
    fn chain(&self, primary: usize) -> IndexResult<Vec<(u64, Page<K>)>> {
        let mut out = Vec::new();
        let mut next = Some(self.primary_offset(primary));
        while let Some(offset) = next {
            if out.len() as u64 > self.file.len() / self.page_size() as u64 {
                return Err(IndexError::corrupted("ISAM overflow chain loops"));
            }
            let page = self.read_page(offset)?;
            next = page.next;
            out.push((offset, page));
        }
        Ok(out)
    }

    fn all_entries(&self) -> IndexResult<Vec<(K, RecordPos)>> {
        let mut out = Vec::with_capacity(self.len as usize);
        for primary in 0..self.directory.len() {
            for (_, page) in self.chain(primary)? {
                out.extend(page.entries);
            }
        }
        out.sort_by(|a, b| a.0.compare(&b.0));
        Ok(out)
    }

    /// Rewrites the file from sorted, unique entries.
    fn rebuild(&mut self, entries: Vec<(K, RecordPos)>) -> IndexResult<()> {
        let pages: Vec<Page<K>> = entries
            .chunks(self.fill)
            .map(|chunk| Page::new(chunk.to_vec()))
            .collect();
        self.directory = pages
            .iter()
            .filter_map(|p| p.entries.first().map(|(k, _)| k.clone()))
            .collect();
        self.len = entries.len() as u64;

        let mut buf =
            Vec::with_capacity(self.data_start() as usize + pages.len() * self.page_size());
        self.encode_header(&mut buf);
        for key in &self.directory {
            key.encode(self.key_width, &mut buf);
        }
        for page in &pages {
            page.encode(self.key_width, self.capacity, &mut buf);
        }
        self.file.write_all_at(&buf, 0)?;
        self.file.set_len(buf.len() as u64)?;

        debug!(
            path = %self.file.path().display(),
            entries = self.len,
            pages = self.directory.len(),
            "built ISAM index"
        );
        Ok(())
    }
}

impl<K: KeyType> Index<K> for IsamIndex<K> {
    fn kind(&self) -> IndexKind {
        IndexKind::Isam
    }

    fn add(&mut self, key: K, pos: RecordPos) -> IndexResult<Timed<bool>> {
        Timed::try_measure(|| {
            if self.directory.is_empty() {
                self.rebuild(vec![(key, pos)])?;
                return Ok(true);
            }
            let mut chain = self.chain(self.locate(&key))?;
            let exists = chain
                .iter()
                .flat_map(|(_, p)| p.entries.iter())
                .any(|(k, _)| k.compare(&key) == Ordering::Equal);
            if exists {
                return Ok(false);
            }

            if let Some((offset, page)) = chain
                .iter_mut()
                .find(|(_, p)| p.entries.len() < self.capacity)
            {
                page.entries.push((key, pos));
                let (offset, page) = (*offset, page.clone());
                self.write_page(offset, &page)?;
            } else {
                let new_offset = self.file.len();
                self.write_page(new_offset, &Page::new(vec![(key, pos)]))?;
                if let Some((last_offset, last)) = chain.last_mut() {
                    last.next = Some(new_offset);
                    let (offset, page) = (*last_offset, last.clone());
                    self.write_page(offset, &page)?;
                }
            }
            self.len += 1;
            self.write_header()?;
            Ok(true)
        })
    }

    fn search(&self, key: &K) -> IndexResult<Timed<Option<RecordPos>>> {
        Timed::try_measure(|| {
            if self.directory.is_empty() {
                return Ok(None);
            }
            for (_, page) in self.chain(self.locate(key))? {
                if let Some((_, pos)) = page
                    .entries
                    .iter()
                    .find(|(k, _)| k.compare(key) == Ordering::Equal)
                {
                    return Ok(Some(*pos));
                }
            }
            Ok(None)
        })
    }

    fn range_search(&self, begin: &K, end: &K) -> IndexResult<Timed<Vec<RecordPos>>> {
        Timed::try_measure(|| {
            if self.directory.is_empty() || begin.compare(end) == Ordering::Greater {
                return Ok(Vec::new());
            }
            let start = self.locate(begin);
            let mut hits = Vec::new();
            for primary in start..self.directory.len() {
                if primary > start && self.directory[primary].compare(end) == Ordering::Greater {
                    break;
                }
                for (_, page) in self.chain(primary)? {
                    hits.extend(page.entries.into_iter().filter(|(k, _)| {
                        k.compare(begin) != Ordering::Less && k.compare(end) != Ordering::Greater
                    }));
                }
            }
            hits.sort_by(|a, b| a.0.compare(&b.0));
            Ok(hits.into_iter().map(|(_, pos)| pos).collect())
        })
    }

    fn remove(&mut self, key: &K) -> IndexResult<Timed<Option<RecordPos>>> {
        Timed::try_measure(|| {
            if self.directory.is_empty() {
                return Ok(None);
            }
            for (offset, mut page) in self.chain(self.locate(key))? {
                let Some(slot) = page
                    .entries
                    .iter()
                    .position(|(k, _)| k.compare(key) == Ordering::Equal)
                else {
                    continue;
                };
                let (_, pos) = page.entries.swap_remove(slot);
                self.write_page(offset, &page)?;
                self.len -= 1;
                self.write_header()?;
                return Ok(Some(pos));
            }
            Ok(None)
        })
    }

    fn bulk_insert(&mut self, entries: Vec<(K, RecordPos)>) -> IndexResult<Timed<Vec<bool>>> {
        Timed::try_measure(|| {
            let existing = self.all_entries()?;

            let mut flags = vec![false; entries.len()];
            let mut order: Vec<usize> = (0..entries.len()).collect();
            order.sort_by(|a, b| entries[*a].0.compare(&entries[*b].0));

            let mut accepted: Vec<(K, RecordPos)> = Vec::with_capacity(entries.len());
            for idx in order {
                let key = &entries[idx].0;
                let dup_in_batch = accepted
                    .last()
                    .map_or(false, |(k, _)| k.compare(key) == Ordering::Equal);
                let dup_existing = existing.binary_search_by(|(k, _)| k.compare(key)).is_ok();
                if !dup_in_batch && !dup_existing {
                    accepted.push(entries[idx].clone());
                    flags[idx] = true;
                }
            }

            let mut merged = existing;
            merged.extend(accepted);
            merged.sort_by(|a, b| a.0.compare(&b.0));
            self.rebuild(merged)?;
            Ok(flags)
        })
    }

    fn entries(&self) -> IndexResult<Vec<(K, RecordPos)>> {
        self.all_entries()
    }

    fn len(&self) -> usize {
        self.len as usize
    }

    fn sync(&self) -> IndexResult<()> {
        self.file.sync()?;
        Ok(())
    }
}

impl<K: KeyType> std::fmt::Debug for IsamIndex<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsamIndex")
            .field("path", &self.file.path())
            .field("capacity", &self.capacity)
            .field("fill", &self.fill)
            .field("primary_pages", &self.directory.len())
            .field("len", &self.len)
            .finish()
    }
}
