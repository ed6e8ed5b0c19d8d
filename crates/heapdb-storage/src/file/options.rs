//! How a block file is opened.

use std::fs;

/// What to do with the file at the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open read-only; the file must exist.
    ReadOnly,
    /// Open read/write; the file must exist.
    Existing,
    /// Open read/write, creating the file if missing. Contents are kept.
    OpenOrCreate,
    /// Create a new file; fails if one exists.
    CreateNew,
    /// Create the file or discard the contents of an existing one.
    Recreate,
}

impl OpenMode {
    /// Whether writes are allowed.
    #[must_use]
    pub const fn writable(self) -> bool {
        !matches!(self, OpenMode::ReadOnly)
    }
}

/// Options for opening a [`BlockFile`](super::BlockFile).
///
/// # Example
///
/// ```rust
/// use heapdb_storage::file::{OpenMode, OpenOptions};
///
/// let options = OpenOptions::recreate().sync_on_write(true);
/// assert_eq!(options.mode(), OpenMode::Recreate);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    mode: OpenMode,
    sync_on_write: bool,
}

impl OpenOptions {
    /// Options with the given mode and no per-write sync.
    #[must_use]
    pub const fn new(mode: OpenMode) -> Self {
        Self {
            mode,
            sync_on_write: false,
        }
    }

    /// Read-only on an existing file.
    #[must_use]
    pub const fn for_read() -> Self {
        Self::new(OpenMode::ReadOnly)
    }

    /// Read/write on an existing file.
    #[must_use]
    pub const fn for_read_write() -> Self {
        Self::new(OpenMode::Existing)
    }

    /// Read/write, creating the file if missing.
    #[must_use]
    pub const fn for_create() -> Self {
        Self::new(OpenMode::OpenOrCreate)
    }

    /// Read/write, failing if the file already exists.
    #[must_use]
    pub const fn for_create_new() -> Self {
        Self::new(OpenMode::CreateNew)
    }

    /// Read/write on an empty file, replacing any previous contents.
    #[must_use]
    pub const fn recreate() -> Self {
        Self::new(OpenMode::Recreate)
    }

    /// Sync data after every write.
    #[must_use]
    pub const fn sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }

    /// The open mode.
    pub const fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Whether every write is synced.
    pub const fn syncs_writes(&self) -> bool {
        self.sync_on_write
    }

    pub(crate) fn to_std_options(self) -> fs::OpenOptions {
        let mut opts = fs::OpenOptions::new();
        opts.read(true).write(self.mode.writable());
        match self.mode {
            OpenMode::ReadOnly | OpenMode::Existing => {}
            OpenMode::OpenOrCreate => {
                opts.create(true);
            }
            OpenMode::CreateNew => {
                opts.create_new(true);
            }
            OpenMode::Recreate => {
                opts.create(true).truncate(true);
            }
        }
        opts
    }
}
