//! In-memory filesystem for testing.

use crate::error::{FsError, FsResult};
use crate::filesystem::{Filesystem, LogFile};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An in-memory [`Filesystem`].
///
/// Stores all files in a shared map and is suitable for:
/// - Unit tests
/// - Integration tests that exercise recovery without touching disk
///
/// Cloning produces another handle onto the same tree, so a test can keep
/// one clone while handing another to a writer or reader.
///
/// # Example
///
/// ```rust
/// use metalog_fs::{Filesystem, MemoryFilesystem};
/// use std::path::Path;
///
/// let fs = MemoryFilesystem::new();
/// fs.create(Path::new("/a")).unwrap().append(b"data", false).unwrap();
/// assert_eq!(fs.length(Path::new("/a")).unwrap(), 4);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<Tree>>,
}

#[derive(Debug, Default)]
struct Tree {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
}

impl MemoryFilesystem {
    /// Creates a new empty in-memory filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the contents of the file at `path`.
    ///
    /// Useful for corrupting bytes in recovery tests.
    #[must_use]
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.inner.read().files.get(path).cloned()
    }

    /// Replaces the contents of the file at `path`.
    ///
    /// The file is created if it does not exist.
    pub fn set_contents(&self, path: &Path, data: Vec<u8>) {
        self.inner.write().files.insert(path.to_path_buf(), data);
    }
}

struct MemoryFile {
    tree: Arc<RwLock<Tree>>,
    path: PathBuf,
    cursor: usize,
}

impl Filesystem for MemoryFilesystem {
    fn exists(&self, path: &Path) -> bool {
        let tree = self.inner.read();
        tree.files.contains_key(path) || tree.dirs.contains(path)
    }

    fn mkdirs(&self, path: &Path) -> FsResult<()> {
        let mut tree = self.inner.write();
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            tree.dirs.insert(current.clone());
        }
        Ok(())
    }

    fn create(&self, path: &Path) -> FsResult<Box<dyn LogFile>> {
        self.inner
            .write()
            .files
            .insert(path.to_path_buf(), Vec::new());
        Ok(Box::new(MemoryFile {
            tree: Arc::clone(&self.inner),
            path: path.to_path_buf(),
            cursor: 0,
        }))
    }

    fn open(&self, path: &Path) -> FsResult<Box<dyn LogFile>> {
        if !self.inner.read().files.contains_key(path) {
            return Err(FsError::not_found(path));
        }
        Ok(Box::new(MemoryFile {
            tree: Arc::clone(&self.inner),
            path: path.to_path_buf(),
            cursor: 0,
        }))
    }

    fn length(&self, path: &Path) -> FsResult<u64> {
        self.inner
            .read()
            .files
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| FsError::not_found(path))
    }

    fn remove(&self, path: &Path) -> FsResult<()> {
        self.inner.write().files.remove(path);
        Ok(())
    }

    fn readdir(&self, path: &Path) -> FsResult<Vec<String>> {
        let tree = self.inner.read();
        let mut names = Vec::new();
        for file in tree.files.keys() {
            if file.parent() == Some(path) {
                if let Some(name) = file.file_name() {
                    names.push(name.to_string_lossy().into_owned());
                }
            }
        }
        Ok(names)
    }
}

impl LogFile for MemoryFile {
    fn append(&mut self, data: &[u8], _sync: bool) -> FsResult<u64> {
        let mut tree = self.tree.write();
        let file = tree
            .files
            .get_mut(&self.path)
            .ok_or_else(|| FsError::not_found(&self.path))?;
        let offset = file.len() as u64;
        file.extend_from_slice(data);
        Ok(offset)
    }

    fn read(&mut self, len: usize) -> FsResult<Vec<u8>> {
        let tree = self.tree.read();
        let file = tree
            .files
            .get(&self.path)
            .ok_or_else(|| FsError::not_found(&self.path))?;
        let start = self.cursor.min(file.len());
        let end = start.saturating_add(len).min(file.len());
        self.cursor = end;
        Ok(file[start..end].to_vec())
    }

    fn len(&self) -> FsResult<u64> {
        let tree = self.tree.read();
        tree.files
            .get(&self.path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| FsError::not_found(&self.path))
    }

    fn sync(&mut self) -> FsResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_append_read() {
        let fs = MemoryFilesystem::new();
        let path = Path::new("/log/0");

        let mut file = fs.create(path).unwrap();
        assert_eq!(file.append(b"hello", false).unwrap(), 0);
        assert_eq!(file.append(b" world", false).unwrap(), 5);

        let mut reader = fs.open(path).unwrap();
        assert_eq!(reader.read(5).unwrap(), b"hello");
        assert_eq!(reader.read(100).unwrap(), b" world");
        assert!(reader.read(1).unwrap().is_empty());
    }

    #[test]
    fn clones_share_the_tree() {
        let fs = MemoryFilesystem::new();
        let other = fs.clone();

        fs.create(Path::new("/a")).unwrap().append(b"x", false).unwrap();
        assert_eq!(other.length(Path::new("/a")).unwrap(), 1);
    }

    #[test]
    fn readdir_lists_direct_children_only() {
        let fs = MemoryFilesystem::new();
        fs.create(Path::new("/log/0")).unwrap();
        fs.create(Path::new("/log/1")).unwrap();
        fs.create(Path::new("/log/sub/2")).unwrap();

        let mut names = fs.readdir(Path::new("/log")).unwrap();
        names.sort();
        assert_eq!(names, vec!["0".to_string(), "1".to_string()]);
    }

    #[test]
    fn readdir_missing_directory_is_empty() {
        let fs = MemoryFilesystem::new();
        assert!(fs.readdir(Path::new("/nope")).unwrap().is_empty());
    }

    #[test]
    fn mkdirs_makes_exists_true() {
        let fs = MemoryFilesystem::new();
        let path = Path::new("/a/b/c");
        assert!(!fs.exists(path));
        fs.mkdirs(path).unwrap();
        assert!(fs.exists(path));
        assert!(fs.exists(Path::new("/a/b")));
    }

    #[test]
    fn remove_deletes_file() {
        let fs = MemoryFilesystem::new();
        let path = Path::new("/a");
        fs.create(path).unwrap();
        fs.remove(path).unwrap();
        assert!(!fs.exists(path));
    }

    #[test]
    fn length_of_missing_file_fails() {
        let fs = MemoryFilesystem::new();
        assert!(matches!(
            fs.length(Path::new("/nope")),
            Err(FsError::NotFound { .. })
        ));
    }

    #[test]
    fn set_contents_overwrites() {
        let fs = MemoryFilesystem::new();
        let path = Path::new("/a");
        fs.create(path).unwrap().append(b"before", false).unwrap();
        fs.set_contents(path, b"after!".to_vec());
        assert_eq!(fs.contents(path).unwrap(), b"after!");
    }
}
