//! On-disk directory layout.
//!
//! ```text
//! <data_dir>/
//!   Tables/<table>/{data.bin, metadata.bin}
//!   Indexes/{Sequential,AVL,ISAM}/<table>/<column>.idx
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use heapdb_common::constants::{INDEXES_DIR, INDEX_FILE_EXTENSION, TABLES_DIR};
use heapdb_common::IndexKind;

#[derive(Debug, Clone)]
pub(crate) struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the fixed directories if missing.
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(self.tables_dir())?;
        for kind in IndexKind::ALL {
            fs::create_dir_all(self.kind_dir(kind))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.root.join(TABLES_DIR)
    }

    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.tables_dir().join(table)
    }

    fn kind_dir(&self, kind: IndexKind) -> PathBuf {
        self.root.join(INDEXES_DIR).join(kind.dir_name())
    }

    pub fn index_dir(&self, kind: IndexKind, table: &str) -> PathBuf {
        self.kind_dir(kind).join(table)
    }

    pub fn index_path(&self, kind: IndexKind, table: &str, column: &str) -> PathBuf {
        self.index_dir(kind, table)
            .join(format!("{}.{}", column, INDEX_FILE_EXTENSION))
    }

    /// Names of the table directories present on disk, sorted.
    pub fn table_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.tables_dir())? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Columns with an index file of `kind` for `table`, sorted.
    pub fn indexed_columns(&self, kind: IndexKind, table: &str) -> io::Result<Vec<String>> {
        let dir = self.index_dir(kind, table);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut columns = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(INDEX_FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                columns.push(stem.to_string());
            }
        }
        columns.sort();
        Ok(columns)
    }

    /// Removes the table directory and every index directory of the table.
    pub fn remove_table(&self, table: &str) -> io::Result<()> {
        remove_dir_if_exists(&self.table_dir(table))?;
        for kind in IndexKind::ALL {
            remove_dir_if_exists(&self.index_dir(kind, table))?;
        }
        Ok(())
    }
}

fn remove_dir_if_exists(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Table and column names become path components.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(&['/', '\\', '\0'][..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths() {
        let layout = Layout::new("/db");
        assert_eq!(layout.table_dir("t"), PathBuf::from("/db/Tables/t"));
        assert_eq!(
            layout.index_path(IndexKind::Avl, "t", "v"),
            PathBuf::from("/db/Indexes/AVL/t/v.idx")
        );
    }

    #[test]
    fn test_discovery_and_removal() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.ensure().unwrap();
        fs::create_dir_all(layout.table_dir("b")).unwrap();
        fs::create_dir_all(layout.table_dir("a")).unwrap();
        assert_eq!(layout.table_names().unwrap(), vec!["a", "b"]);

        fs::create_dir_all(layout.index_dir(IndexKind::Isam, "a")).unwrap();
        fs::write(layout.index_path(IndexKind::Isam, "a", "x"), b"").unwrap();
        fs::write(layout.index_dir(IndexKind::Isam, "a").join("notes.txt"), b"").unwrap();
        assert_eq!(layout.indexed_columns(IndexKind::Isam, "a").unwrap(), vec!["x"]);
        assert!(layout.indexed_columns(IndexKind::Avl, "a").unwrap().is_empty());

        layout.remove_table("a").unwrap();
        assert!(!layout.table_dir("a").exists());
        assert!(!layout.index_dir(IndexKind::Isam, "a").exists());
        layout.remove_table("a").unwrap();
    }

    #[test]
    fn test_names() {
        assert!(is_valid_name("users"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name("a/b"));
    }
}
