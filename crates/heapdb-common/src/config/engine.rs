//! Engine configuration structures.
//!
//! These structures define all configurable aspects of a HeapDB instance.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_DATA_DIR, DEFAULT_FLOAT_EPSILON, DEFAULT_ISAM_FILL_FACTOR,
    DEFAULT_ISAM_PAGE_CAPACITY, DEFAULT_SEQUENTIAL_REBUILD_THRESHOLD,
};
use crate::error::{DbError, DbResult};

/// Main engine configuration.
///
/// # Example
///
/// ```rust
/// use heapdb_common::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.sequential.rebuild_threshold, 64);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root of the on-disk layout (`Tables/`, `Indexes/`).
    pub data_dir: PathBuf,

    /// Fsync data and metadata after each mutation.
    /// Default: true
    pub sync_writes: bool,

    /// Tolerance of FLOAT equality in predicates.
    /// Default: 0.001
    pub float_epsilon: f32,

    /// Sequential index configuration.
    pub sequential: SequentialConfig,

    /// ISAM index configuration.
    pub isam: IsamConfig,

    /// Bulk load configuration.
    pub bulk: BulkConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(format!("./{}", DEFAULT_DATA_DIR)),
            sync_writes: true,
            float_epsilon: DEFAULT_FLOAT_EPSILON,
            sequential: SequentialConfig::default(),
            isam: IsamConfig::default(),
            bulk: BulkConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with the specified data directory.
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Creates a configuration for tests rooted at `dir`.
    ///
    /// Syncing is off and index thresholds are small so rebuilds and
    /// overflow pages are exercised by modest workloads.
    #[must_use]
    pub fn for_testing(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: dir.into(),
            sync_writes: false,
            sequential: SequentialConfig {
                rebuild_threshold: 4,
            },
            isam: IsamConfig {
                page_capacity: 4,
                fill_factor: 0.5,
            },
            ..Default::default()
        }
    }

    /// Sets whether writes are synced.
    #[must_use]
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Sets the float equality tolerance.
    #[must_use]
    pub fn with_float_epsilon(mut self, epsilon: f32) -> Self {
        self.float_epsilon = epsilon;
        self
    }

    /// Sets whether bulk loads build indexes on worker threads.
    #[must_use]
    pub fn with_parallel_index_build(mut self, parallel: bool) -> Self {
        self.bulk.parallel_index_build = parallel;
        self
    }

    /// Parses a configuration from TOML. Missing fields take defaults.
    pub fn from_toml_str(input: &str) -> DbResult<Self> {
        let config: Self = toml::from_str(input).map_err(|e| DbError::InvalidConfig {
            message: e.to_string(),
        })?;
        config
            .validate()
            .map_err(|message| DbError::InvalidConfig { message })?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> DbResult<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.sequential.rebuild_threshold == 0 {
            return Err("sequential.rebuild_threshold must be at least 1".to_string());
        }

        if self.isam.page_capacity < 2 {
            return Err("isam.page_capacity must be at least 2".to_string());
        }

        if !(self.isam.fill_factor > 0.0 && self.isam.fill_factor <= 1.0) {
            return Err("isam.fill_factor must be in (0, 1]".to_string());
        }

        if !(self.float_epsilon > 0.0) {
            return Err("float_epsilon must be positive".to_string());
        }

        Ok(())
    }
}

/// Sequential index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequentialConfig {
    /// Overflow (or tombstoned) entries that trigger a rebuild.
    /// Default: 64
    pub rebuild_threshold: usize,
}

impl Default for SequentialConfig {
    fn default() -> Self {
        Self {
            rebuild_threshold: DEFAULT_SEQUENTIAL_REBUILD_THRESHOLD,
        }
    }
}

/// ISAM index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IsamConfig {
    /// Entries per data page.
    /// Default: 32
    pub page_capacity: usize,

    /// Fraction of each data page filled at build time (0.0 - 1.0].
    /// Default: 0.75
    pub fill_factor: f64,
}

impl Default for IsamConfig {
    fn default() -> Self {
        Self {
            page_capacity: DEFAULT_ISAM_PAGE_CAPACITY,
            fill_factor: DEFAULT_ISAM_FILL_FACTOR,
        }
    }
}

impl IsamConfig {
    /// Entries placed in each primary page when the index is built.
    #[must_use]
    pub fn build_fill(&self) -> usize {
        let fill = (self.page_capacity as f64 * self.fill_factor).floor() as usize;
        fill.clamp(1, self.page_capacity)
    }
}

/// Bulk load configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Build each index kind of a column on its own worker thread.
    /// Default: true
    pub parallel_index_build: bool,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            parallel_index_build: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.sync_writes);
        assert_eq!(config.isam.page_capacity, 32);
        assert_eq!(config.isam.build_fill(), 24);
        assert!(config.bulk.parallel_index_build);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testing_config() {
        let config = EngineConfig::for_testing("/tmp/heapdb");
        assert!(!config.sync_writes);
        assert_eq!(config.isam.build_fill(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.sequential.rebuild_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.isam.fill_factor = 1.5;
        assert!(config.validate().is_err());

        let config = EngineConfig::default().with_float_epsilon(0.0);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.isam.page_capacity = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            data_dir = "/var/lib/heapdb"
            sync_writes = false

            [isam]
            page_capacity = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/heapdb"));
        assert!(!config.sync_writes);
        assert_eq!(config.isam.page_capacity, 8);
        assert_eq!(config.isam.fill_factor, DEFAULT_ISAM_FILL_FACTOR);
        assert_eq!(config.sequential.rebuild_threshold, 64);
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        assert!(EngineConfig::from_toml_str("float_epsilon = -1.0").is_err());
        assert!(EngineConfig::from_toml_str("sync_writes = 3").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heapdb.toml");
        std::fs::write(&path, "[sequential]\nrebuild_threshold = 16\n").unwrap();
        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.sequential.rebuild_threshold, 16);
    }
}
