//! Filesystem and file handle trait definitions.

use crate::error::FsResult;
use std::path::Path;

/// A filesystem as seen by the MetaLog.
///
/// Implementations are **opaque byte stores**. They provide directory
/// operations plus open/create of [`LogFile`] handles. The MetaLog owns
/// all file format interpretation - filesystems do not understand headers,
/// entries, or entities.
///
/// # Invariants
///
/// - `readdir` on a missing directory returns an empty listing, not an
///   error (a brand-new log directory is legitimate)
/// - `create` truncates any existing file at the path
/// - Implementations must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::MemoryFilesystem`] - For testing
/// - [`super::LocalFilesystem`] - For local disk
pub trait Filesystem: Send + Sync {
    /// Returns `true` if a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Creates a directory and all missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn mkdirs(&self, path: &Path) -> FsResult<()>;

    /// Creates a new file at `path`, truncating any existing file, and
    /// returns a handle opened for appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    fn create(&self, path: &Path) -> FsResult<Box<dyn LogFile>>;

    /// Opens an existing file at `path` for sequential reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be opened.
    fn open(&self, path: &Path) -> FsResult<Box<dyn LogFile>>;

    /// Returns the length of the file at `path` in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist.
    fn length(&self, path: &Path) -> FsResult<u64>;

    /// Removes the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    fn remove(&self, path: &Path) -> FsResult<()>;

    /// Lists the names (final path components) of entries in a directory.
    ///
    /// A missing directory yields an empty listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    fn readdir(&self, path: &Path) -> FsResult<Vec<String>>;
}

/// An open file handle.
///
/// Handles are sequential: `append` always writes at the end, `read`
/// advances an internal cursor. A handle is either a write handle
/// (from [`Filesystem::create`]) or a read handle (from
/// [`Filesystem::open`]); the MetaLog never mixes the two on one handle.
pub trait LogFile: Send {
    /// Appends `data` to the end of the file, returning the offset at
    /// which the data was written.
    ///
    /// When `sync` is `true` the write is flushed to durable storage
    /// before the call returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or flush fails.
    fn append(&mut self, data: &[u8], sync: bool) -> FsResult<u64>;

    /// Reads up to `len` bytes from the current cursor position.
    ///
    /// A short return (fewer than `len` bytes) means end of file was
    /// reached; it is not an error at this layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn read(&mut self, len: usize) -> FsResult<Vec<u8>>;

    /// Returns the current length of the file in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the length cannot be determined.
    fn len(&self) -> FsResult<u64>;

    /// Returns `true` if the file is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the length cannot be determined.
    fn is_empty(&self) -> FsResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Syncs file data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> FsResult<()>;
}
