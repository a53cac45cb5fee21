//! Log directory layout and scanning.
//!
//! A MetaLog directory contains files named by increasing integers, one
//! per writer generation:
//!
//! ```text
//! <log-root>/<definition-name>/
//! ├─ 0
//! ├─ 1
//! ├─ 2.bad        # found corrupt, renamed aside but still numbered
//! └─ 3            # newest generation
//! ```
//!
//! The local backup mirror lives at
//! `<data-directory>/run/log_backup/<definition-name>/<backup-label>/`.

use crate::error::MetaLogResult;
use metalog_fs::Filesystem;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Suffix marking a log file that was found corrupt. Such files still
/// count for numbering and retention.
const BAD_SUFFIX: &str = ".bad";

/// Strips trailing path separators from `path`.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    let trimmed = s.trim_end_matches(std::path::MAIN_SEPARATOR).trim_end_matches('/');
    if trimmed.is_empty() {
        path.to_path_buf()
    } else {
        PathBuf::from(trimmed)
    }
}

/// Computes the local backup directory for a log kind and backup label.
#[must_use]
pub fn backup_path(data_directory: &Path, name: &str, backup_label: &str) -> PathBuf {
    data_directory
        .join("run")
        .join("log_backup")
        .join(name)
        .join(backup_label)
}

/// Lists the numeric log files in a directory.
///
/// Accepts names that are purely decimal digits, or digits followed by a
/// literal `.bad` suffix; anything else is logged and skipped. Returns
/// the ids in descending order (newest first) along with the next unused
/// file number (`max + 1`, or 0 for an empty directory). A missing
/// directory yields an empty result, not an error.
///
/// # Errors
///
/// Returns an error only if the directory exists but cannot be listed.
pub fn scan_log_directory(fs: &dyn Filesystem, path: &Path) -> MetaLogResult<(Vec<i32>, i32)> {
    let mut ids = Vec::new();

    for name in fs.readdir(path)? {
        let digits = name.strip_suffix(BAD_SUFFIX).unwrap_or(&name);
        match parse_decimal(digits) {
            Some(id) => ids.push(id),
            None => {
                warn!(directory = %path.display(), file = %name,
                      "invalid file in MetaLog directory, skipping");
            }
        }
    }

    ids.sort_unstable_by(|a, b| b.cmp(a));
    ids.dedup();

    let next_id = ids.first().map_or(0, |max| max + 1);
    Ok((ids, next_id))
}

fn parse_decimal(name: &str) -> Option<i32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalog_fs::MemoryFilesystem;

    fn populate(fs: &MemoryFilesystem, dir: &Path, names: &[&str]) {
        for name in names {
            fs.create(&dir.join(name)).unwrap();
        }
    }

    #[test]
    fn scan_mixed_directory() {
        let fs = MemoryFilesystem::new();
        let dir = Path::new("/log/mml");
        populate(&fs, dir, &["3", "10", "7", "abc", "5.bad"]);

        let (ids, next_id) = scan_log_directory(&fs, dir).unwrap();
        assert_eq!(ids, vec![10, 7, 5, 3]);
        assert_eq!(next_id, 11);
    }

    #[test]
    fn scan_missing_directory_is_empty() {
        let fs = MemoryFilesystem::new();
        let (ids, next_id) = scan_log_directory(&fs, Path::new("/absent")).unwrap();
        assert!(ids.is_empty());
        assert_eq!(next_id, 0);
    }

    #[test]
    fn scan_rejects_partial_numbers() {
        let fs = MemoryFilesystem::new();
        let dir = Path::new("/log");
        populate(&fs, dir, &["12x", "x12", "1.bad.bad", "", ".bad", "4"]);

        let (ids, next_id) = scan_log_directory(&fs, dir).unwrap();
        assert_eq!(ids, vec![4]);
        assert_eq!(next_id, 5);
    }

    #[test]
    fn scan_merges_bad_and_good_with_same_id() {
        let fs = MemoryFilesystem::new();
        let dir = Path::new("/log");
        populate(&fs, dir, &["2", "2.bad"]);

        let (ids, next_id) = scan_log_directory(&fs, dir).unwrap();
        assert_eq!(ids, vec![2]);
        assert_eq!(next_id, 3);
    }

    #[test]
    fn normalize_strips_trailing_separators() {
        assert_eq!(normalize_path(Path::new("/a/b/")), PathBuf::from("/a/b"));
        assert_eq!(normalize_path(Path::new("/a/b//")), PathBuf::from("/a/b"));
        assert_eq!(normalize_path(Path::new("/a/b")), PathBuf::from("/a/b"));
    }

    #[test]
    fn backup_path_layout() {
        let path = backup_path(Path::new("/opt/data"), "rsml", "rs1");
        assert_eq!(path, PathBuf::from("/opt/data/run/log_backup/rsml/rs1"));
    }
}
