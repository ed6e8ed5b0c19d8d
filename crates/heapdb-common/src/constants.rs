//! System-wide constants for HeapDB.
//!
//! On-disk names, sentinels and limits shared by the storage, index and
//! engine crates.

// =============================================================================
// On-disk layout
// =============================================================================

/// Default root directory of a HeapDB instance.
pub const DEFAULT_DATA_DIR: &str = "DB_FILES";

/// Subdirectory of the data directory holding one directory per table.
pub const TABLES_DIR: &str = "Tables";

/// Subdirectory of the data directory holding one directory per index kind.
pub const INDEXES_DIR: &str = "Indexes";

/// Heap data file name inside a table directory.
pub const DATA_FILE: &str = "data.bin";

/// Metadata file name inside a table directory.
pub const METADATA_FILE: &str = "metadata.bin";

/// Extension of index files (`Indexes/<Kind>/<table>/<column>.idx`).
pub const INDEX_FILE_EXTENSION: &str = "idx";

// =============================================================================
// Positions
// =============================================================================

/// On-disk encoding of a null file position (empty list, missing child).
pub const NULL_POS: i64 = -1;

// =============================================================================
// Native widths
// =============================================================================

/// Width of a BOOL column in bytes.
pub const BOOL_WIDTH: usize = 1;

/// Width of an INT column in bytes (`i32`).
pub const INT_WIDTH: usize = 4;

/// Width of a FLOAT column in bytes (`f32`).
pub const FLOAT_WIDTH: usize = 4;

/// Maximum declared width of a VARCHAR column.
pub const MAX_VARCHAR_WIDTH: usize = 4096;

// =============================================================================
// Query constants
// =============================================================================

/// Range bound value meaning "from the column type's minimum".
pub const RANGE_MIN_SENTINEL: &str = "MIN";

/// Range bound value meaning "up to the column type's maximum".
pub const RANGE_MAX_SENTINEL: &str = "MAX";

/// Default tolerance used when comparing FLOAT values for equality.
pub const DEFAULT_FLOAT_EPSILON: f32 = 0.001;

/// Case-insensitive spellings accepted as a true BOOL literal.
///
/// Anything outside this vocabulary parses as false.
pub const TRUE_LITERALS: [&str; 9] = ["yes", "y", "si", "s", "v", "verdadero", "t", "true", "1"];

// =============================================================================
// Index defaults
// =============================================================================

/// Overflow (or tombstone) entries that trigger a Sequential index rebuild.
pub const DEFAULT_SEQUENTIAL_REBUILD_THRESHOLD: usize = 64;

/// Entries per ISAM data page.
pub const DEFAULT_ISAM_PAGE_CAPACITY: usize = 32;

/// Fraction of an ISAM data page filled when the index is built.
pub const DEFAULT_ISAM_FILL_FACTOR: f64 = 0.75;
