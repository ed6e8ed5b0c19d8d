//! Blocking positional file handle.

use std::fs::File as StdFile;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::error::{IoError, IoResult};
use super::options::OpenOptions;

/// A file accessed by byte offset.
///
/// Reads take `&self`; the underlying handle sits behind a mutex because
/// a positional read is a seek followed by a read. Writes take `&mut self`
/// and keep the cached length current.
pub struct BlockFile {
    /// The underlying file.
    file: Mutex<StdFile>,
    /// The file path.
    path: PathBuf,
    /// Cached file length.
    len: u64,
    /// Whether the file was opened with write access.
    writable: bool,
    /// Whether every write is followed by a sync.
    sync_on_write: bool,
}

impl BlockFile {
    /// Opens a file with the specified options.
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> IoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = options
            .to_std_options()
            .open(&path)
            .map_err(|e| IoError::from_io_with_path(e, &path))?;
        let len = file.metadata()?.len();

        Ok(Self {
            file: Mutex::new(file),
            path,
            len,
            writable: options.mode().writable(),
            sync_on_write: options.syncs_writes(),
        })
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file length in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the file is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fills `buf` from `offset`. Fails with `ShortRead` past end-of-file.
    pub fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> IoResult<()> {
        if offset + buf.len() as u64 > self.len {
            return Err(IoError::short_read(offset, buf.len(), self.len));
        }
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    /// Reads `len` bytes at `offset` into a new buffer.
    pub fn read_vec_at(&self, offset: u64, len: usize) -> IoResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact_at(&mut buf, offset)?;
        Ok(buf)
    }

    /// Writes all of `buf` at `offset`, extending the file if needed.
    pub fn write_all_at(&mut self, buf: &[u8], offset: u64) -> IoResult<()> {
        self.check_writable()?;
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(buf)?;
            if self.sync_on_write {
                file.sync_data()?;
            }
        }
        self.len = self.len.max(offset + buf.len() as u64);
        Ok(())
    }

    /// Appends `buf` at end-of-file and returns the offset it was written at.
    pub fn append(&mut self, buf: &[u8]) -> IoResult<u64> {
        let offset = self.len;
        self.write_all_at(buf, offset)?;
        Ok(offset)
    }

    /// Truncates or extends the file.
    pub fn set_len(&mut self, size: u64) -> IoResult<()> {
        self.check_writable()?;
        self.file.lock().set_len(size)?;
        self.len = size;
        Ok(())
    }

    /// Flushes data and metadata to disk.
    pub fn sync(&self) -> IoResult<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }

    fn check_writable(&self) -> IoResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(IoError::ReadOnly {
                path: self.path.clone(),
            })
        }
    }
}

impl std::fmt::Debug for BlockFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockFile")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("writable", &self.writable)
            .field("sync_on_write", &self.sync_on_write)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.bin");

        let file = BlockFile::open(&path, OpenOptions::for_create()).unwrap();
        assert_eq!(file.path(), path);
        assert!(file.is_empty());
    }

    #[test]
    fn test_open_missing() {
        let dir = tempdir().unwrap();
        let err = BlockFile::open(dir.path().join("nope.bin"), OpenOptions::for_read_write())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_new_rejects_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("once.bin");
        BlockFile::open(&path, OpenOptions::for_create_new()).unwrap();
        let err = BlockFile::open(&path, OpenOptions::for_create_new()).unwrap_err();
        assert!(matches!(err, IoError::AlreadyExists { .. }));
    }

    #[test]
    fn test_append_and_read() {
        let dir = tempdir().unwrap();
        let mut file = BlockFile::open(dir.path().join("rw.bin"), OpenOptions::for_create())
            .unwrap();

        assert_eq!(file.append(b"Hello, ").unwrap(), 0);
        assert_eq!(file.append(b"World!").unwrap(), 7);
        assert_eq!(file.len(), 13);

        let buf = file.read_vec_at(7, 6).unwrap();
        assert_eq!(&buf, b"World!");
    }

    #[test]
    fn test_write_at_offset_in_place() {
        let dir = tempdir().unwrap();
        let mut file = BlockFile::open(dir.path().join("off.bin"), OpenOptions::for_create())
            .unwrap();
        file.append(&[0u8; 16]).unwrap();
        file.write_all_at(&[7, 7], 4).unwrap();
        assert_eq!(file.len(), 16);
        assert_eq!(file.read_vec_at(3, 4).unwrap(), vec![0, 7, 7, 0]);
    }

    #[test]
    fn test_read_past_end() {
        let dir = tempdir().unwrap();
        let mut file = BlockFile::open(dir.path().join("eof.bin"), OpenOptions::for_create())
            .unwrap();
        file.append(&[1, 2, 3]).unwrap();
        let err = file.read_vec_at(2, 4).unwrap_err();
        assert!(matches!(err, IoError::ShortRead { available: 1, .. }));
    }

    #[test]
    fn test_set_len_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("len.bin");
        {
            let mut file = BlockFile::open(&path, OpenOptions::for_create().sync_on_write(true))
                .unwrap();
            file.append(&[9u8; 32]).unwrap();
            file.set_len(8).unwrap();
            file.sync().unwrap();
        }
        let file = BlockFile::open(&path, OpenOptions::for_read()).unwrap();
        assert_eq!(file.len(), 8);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ro.bin");
        BlockFile::open(&path, OpenOptions::for_create()).unwrap();
        let mut file = BlockFile::open(&path, OpenOptions::for_read()).unwrap();
        assert!(matches!(
            file.append(b"x"),
            Err(IoError::ReadOnly { .. })
        ));
    }
}
