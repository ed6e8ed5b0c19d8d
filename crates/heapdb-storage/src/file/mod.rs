//! Positional file I/O.
//!
//! Heap data files and index files are fixed-layout binary files accessed
//! at byte offsets. [`BlockFile`] wraps a blocking `std::fs::File` with:
//!
//! - positional exact reads and writes
//! - append returning the offset written
//! - a cached length, so end-of-file checks never hit the filesystem
//! - optional sync after every write
//!
//! # Example
//!
//! ```rust,no_run
//! use heapdb_storage::file::{BlockFile, OpenOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut file = BlockFile::open("data.bin", OpenOptions::for_create())?;
//! let offset = file.append(b"hello")?;
//!
//! let mut buf = [0u8; 5];
//! file.read_exact_at(&mut buf, offset)?;
//! assert_eq!(&buf, b"hello");
//! # Ok(())
//! # }
//! ```

mod block;
mod error;
mod options;

pub use block::BlockFile;
pub use error::{IoError, IoResult};
pub use options::{OpenMode, OpenOptions};
