//! File persistence configuration
use std::path::{Path, PathBuf};

/// Configuration for the flat-file stores
pub struct FilePersistenceConfig {
    /// Directory holding every data file
    pub directory: &'static str,
    /// Backfilled funding history (one row per symbol per hour)
    pub history_filename: &'static str,
    /// Snapshot collector output (one row per symbol per poll)
    pub snapshot_filename: &'static str,
    /// Optional SQLite copy of the history table
    pub sqlite_filename: &'static str,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub files: FilePersistenceConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    files: FilePersistenceConfig {
        directory: "data",
        history_filename: "funding_history.csv",
        snapshot_filename: "funding_rates.csv",
        sqlite_filename: "funding_history.sqlite",
    },
};

/// Resolved store locations. Built from `PERSISTENCE` by default, or rooted
/// somewhere else (tests, `--data-dir`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub data_dir: PathBuf,
}

impl StorePaths {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn history_csv(&self) -> PathBuf {
        self.data_dir.join(PERSISTENCE.files.history_filename)
    }

    pub fn snapshot_csv(&self) -> PathBuf {
        self.data_dir.join(PERSISTENCE.files.snapshot_filename)
    }

    pub fn history_sqlite(&self) -> PathBuf {
        self.data_dir.join(PERSISTENCE.files.sqlite_filename)
    }
}

impl Default for StorePaths {
    fn default() -> Self {
        Self::new(PERSISTENCE.files.directory)
    }
}
