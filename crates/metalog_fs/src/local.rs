//! Local-disk filesystem implementation.

use crate::error::{FsError, FsResult};
use crate::filesystem::{Filesystem, LogFile};
use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A [`Filesystem`] backed by OS file APIs.
///
/// Used in production for the local backup mirror and for single-node
/// deployments where the primary log also lives on local disk.
///
/// # Durability
///
/// `append` with `sync = true` calls `File::sync_data()` so the appended
/// bytes survive process termination before the call returns.
///
/// # Example
///
/// ```no_run
/// use metalog_fs::{Filesystem, LocalFilesystem};
/// use std::path::Path;
///
/// let fs = LocalFilesystem::new();
/// let mut file = fs.create(Path::new("/tmp/mml/0")).unwrap();
/// file.append(b"durable", true).unwrap();
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Creates a new local filesystem handle.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug)]
struct LocalFile {
    path: PathBuf,
    file: File,
}

impl Filesystem for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn mkdirs(&self, path: &Path) -> FsResult<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn create(&self, path: &Path) -> FsResult<Box<dyn LogFile>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(LocalFile {
            path: path.to_path_buf(),
            file,
        }))
    }

    fn open(&self, path: &Path) -> FsResult<Box<dyn LogFile>> {
        if !path.exists() {
            return Err(FsError::not_found(path));
        }
        let file = File::open(path)?;
        Ok(Box::new(LocalFile {
            path: path.to_path_buf(),
            file,
        }))
    }

    fn length(&self, path: &Path) -> FsResult<u64> {
        if !path.exists() {
            return Err(FsError::not_found(path));
        }
        Ok(fs::metadata(path)?.len())
    }

    fn remove(&self, path: &Path) -> FsResult<()> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn readdir(&self, path: &Path) -> FsResult<Vec<String>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

impl LogFile for LocalFile {
    fn append(&mut self, data: &[u8], sync: bool) -> FsResult<u64> {
        let offset = self.file.metadata()?.len();
        self.file
            .write_all(data)
            .and_then(|()| if sync { self.file.sync_data() } else { Ok(()) })
            .map_err(|source| FsError::AppendFailed {
                path: self.path.clone(),
                len: data.len(),
                source,
            })?;
        Ok(offset)
    }

    fn read(&mut self, len: usize) -> FsResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = self.file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn len(&self) -> FsResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn sync(&mut self) -> FsResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_and_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0");
        let fs = LocalFilesystem::new();

        let mut file = fs.create(&path).unwrap();
        assert_eq!(file.append(b"hello", false).unwrap(), 0);
        assert_eq!(file.append(b" world", true).unwrap(), 5);
        assert_eq!(fs.length(&path).unwrap(), 11);
    }

    #[test]
    fn create_truncates_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0");
        let fs = LocalFilesystem::new();

        fs.create(&path).unwrap().append(b"old contents", false).unwrap();
        let file = fs.create(&path).unwrap();
        assert_eq!(file.len().unwrap(), 0);
    }

    #[test]
    fn read_is_sequential_and_short_at_eof() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0");
        let fs = LocalFilesystem::new();

        fs.create(&path).unwrap().append(b"hello world", false).unwrap();

        let mut file = fs.open(&path).unwrap();
        assert_eq!(file.read(5).unwrap(), b"hello");
        assert_eq!(file.read(6).unwrap(), b" world");
        assert!(file.read(4).unwrap().is_empty());
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempdir().unwrap();
        let fs = LocalFilesystem::new();

        let result = fs.open(&dir.path().join("nope"));
        assert!(matches!(result, Err(FsError::NotFound { .. })));
    }

    #[test]
    fn readdir_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let fs = LocalFilesystem::new();

        let names = fs.readdir(&dir.path().join("absent")).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn readdir_lists_names() {
        let dir = tempdir().unwrap();
        let fs = LocalFilesystem::new();

        fs.create(&dir.path().join("0")).unwrap();
        fs.create(&dir.path().join("1")).unwrap();

        let mut names = fs.readdir(dir.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["0".to_string(), "1".to_string()]);
    }

    #[test]
    fn remove_is_tolerant_of_missing_files() {
        let dir = tempdir().unwrap();
        let fs = LocalFilesystem::new();

        let path = dir.path().join("0");
        fs.create(&path).unwrap();
        fs.remove(&path).unwrap();
        assert!(!fs.exists(&path));
        fs.remove(&path).unwrap();
    }

    #[test]
    fn mkdirs_creates_nested() {
        let dir = tempdir().unwrap();
        let fs = LocalFilesystem::new();

        let nested = dir.path().join("a").join("b").join("c");
        fs.mkdirs(&nested).unwrap();
        assert!(fs.exists(&nested));
    }
}
