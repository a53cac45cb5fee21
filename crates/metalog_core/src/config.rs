//! MetaLog configuration.

use std::path::PathBuf;

/// Configuration for a MetaLog writer or reader.
#[derive(Debug, Clone)]
pub struct MetaLogConfig {
    /// Root of the server's local data directory; the backup mirror lives
    /// under `<data_directory>/run/log_backup/`.
    pub data_directory: PathBuf,

    /// Distinguishes backup locations when multiple log instances of the
    /// same kind run on one machine (e.g. the server's proxy name).
    pub backup_label: String,

    /// Number of log files to retain; older generations are purged.
    pub history_size: usize,

    /// Maximum log file size before the writer rolls to a new generation.
    pub max_file_size: u64,

    /// Whether to request a flush/sync on every primary append.
    pub sync_on_append: bool,

    /// Whether the writer appends the mandatory recover sentinel after
    /// its initial snapshot. Disabled only by tests that simulate a
    /// writer crashing mid-snapshot; production code must leave this on,
    /// because the reader treats a missing sentinel as fatal.
    pub write_recover_entry: bool,
}

impl Default for MetaLogConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from("."),
            backup_label: String::new(),
            history_size: 30,
            max_file_size: 100 * 1024 * 1024, // 100 MiB
            sync_on_append: true,
            write_recover_entry: true,
        }
    }
}

impl MetaLogConfig {
    /// Creates a configuration with default values rooted at the given
    /// data directory.
    #[must_use]
    pub fn new(data_directory: impl Into<PathBuf>) -> Self {
        Self {
            data_directory: data_directory.into(),
            ..Self::default()
        }
    }

    /// Sets the backup label.
    #[must_use]
    pub fn backup_label(mut self, label: impl Into<String>) -> Self {
        self.backup_label = label.into();
        self
    }

    /// Sets the number of log files to retain.
    #[must_use]
    pub const fn history_size(mut self, count: usize) -> Self {
        self.history_size = count;
        self
    }

    /// Sets the rollover threshold.
    #[must_use]
    pub const fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Sets whether every primary append requests a sync.
    #[must_use]
    pub const fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// Sets whether the recover sentinel is written (test-only switch).
    #[must_use]
    pub const fn write_recover_entry(mut self, value: bool) -> Self {
        self.write_recover_entry = value;
        self
    }
}
