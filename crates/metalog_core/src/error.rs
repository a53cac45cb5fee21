//! Error types for MetaLog operations.
//!
//! Every variant here is fatal to the reader or writer instance that
//! raised it. MetaLog corruption means the surrounding server's durable
//! state is untrustworthy, so nothing is retried or silently recovered;
//! errors carry enough context (file name, offsets, expected vs. actual
//! values) to diagnose the corruption after the fact.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for MetaLog operations.
pub type MetaLogResult<T> = Result<T, MetaLogError>;

/// Errors that can occur while writing or recovering a MetaLog.
#[derive(Debug, Error)]
pub enum MetaLogError {
    /// Filesystem error.
    #[error("filesystem error: {0}")]
    Fs(#[from] metalog_fs::FsError),

    /// I/O error (local backup file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// File header bytes are malformed, or the header name does not match
    /// the definition.
    #[error("bad MetaLog header: {message}")]
    BadHeader {
        /// Description of the mismatch.
        message: String,
    },

    /// The file's declared format version exceeds what the definition
    /// supports.
    #[error("unsupported {name} version {file_version} (definition version is {supported})")]
    VersionMismatch {
        /// Definition name.
        name: String,
        /// Version declared in the file header.
        file_version: u16,
        /// Highest version the definition supports.
        supported: u16,
    },

    /// The local backup file is shorter than the primary log file.
    /// Appends go to the backup first, so a shorter backup means the
    /// pair is inconsistent and neither copy can be trusted.
    #[error(
        "MetaLog file '{file}' has length {file_length}, backup file '{backup}' length is {backup_length}"
    )]
    BackupFileMismatch {
        /// Primary log file.
        file: PathBuf,
        /// Primary file length.
        file_length: u64,
        /// Backup mirror file.
        backup: PathBuf,
        /// Backup file length.
        backup_length: u64,
    },

    /// End of file was reached in the middle of an entry.
    #[error("MetaLog entry truncated: {context}")]
    EntryTruncated {
        /// What was being decoded when the bytes ran out.
        context: String,
    },

    /// Entry payload bytes do not match the stored checksum.
    #[error("MetaLog entry checksum mismatch: header={expected:#010x}, computed={actual:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the entry header.
        expected: u32,
        /// Checksum computed over the payload.
        actual: u32,
    },

    /// The file lacks the mandatory recover sentinel, meaning the writer
    /// crashed before completing its initial snapshot.
    #[error("MetaLog file '{file}' is missing the recover entity")]
    MissingRecoverEntity {
        /// The incomplete log file.
        file: PathBuf,
    },

    /// An entry's type code is unrecognized by the definition.
    #[error("unrecognized entity type {type_code} in {name} MetaLog")]
    BadEntityType {
        /// The unknown type code.
        type_code: i32,
        /// Definition name.
        name: String,
    },

    /// Operation attempted on a writer after `close()`.
    #[error("MetaLog '{path}' has been closed")]
    Closed {
        /// Path of the closed log.
        path: PathBuf,
    },

    /// A filesystem or decode error annotated with the file it occurred in.
    #[error("error reading MetaLog file '{file}': read {offset}/{length}: {source}")]
    ReadContext {
        /// The log file being replayed.
        file: PathBuf,
        /// Byte offset reached before the failure.
        offset: u64,
        /// Total file length.
        length: u64,
        /// The underlying error.
        source: Box<MetaLogError>,
    },
}

impl MetaLogError {
    /// Creates a bad-header error.
    pub fn bad_header(message: impl Into<String>) -> Self {
        Self::BadHeader {
            message: message.into(),
        }
    }

    /// Creates an entry-truncated error.
    pub fn entry_truncated(context: impl Into<String>) -> Self {
        Self::EntryTruncated {
            context: context.into(),
        }
    }

    /// Creates a closed-log error.
    pub fn closed(path: impl Into<PathBuf>) -> Self {
        Self::Closed { path: path.into() }
    }

    /// Annotates an error with the file and read position it occurred at.
    pub fn with_read_context(self, file: impl Into<PathBuf>, offset: u64, length: u64) -> Self {
        Self::ReadContext {
            file: file.into(),
            offset,
            length,
            source: Box::new(self),
        }
    }

    /// Returns the error with any read-context annotation stripped.
    ///
    /// Lets callers match on the underlying corruption kind without
    /// unwrapping the context layer by hand.
    #[must_use]
    pub fn root_cause(&self) -> &MetaLogError {
        match self {
            Self::ReadContext { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
