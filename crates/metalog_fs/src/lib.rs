//! # MetaLog Filesystem
//!
//! Filesystem abstraction consumed by the MetaLog writer and reader.
//!
//! The MetaLog stores its primary log files on whatever filesystem the
//! surrounding server process is configured with, which may be local disk
//! or a brokered distributed filesystem. This crate defines that seam:
//! a [`Filesystem`] for directory-level operations and a [`LogFile`]
//! handle for append/read access to an individual file.
//!
//! ## Design Principles
//!
//! - Filesystems are opaque byte stores; the MetaLog owns all file format
//!   interpretation
//! - Every implementation must be `Send + Sync` so a single instance can
//!   serve a whole server process
//!
//! ## Available Implementations
//!
//! - [`LocalFilesystem`] - OS file APIs, used in production for the local
//!   backup mirror and for single-node deployments
//! - [`MemoryFilesystem`] - For testing and ephemeral logs
//!
//! ## Example
//!
//! ```rust
//! use metalog_fs::{Filesystem, MemoryFilesystem};
//! use std::path::Path;
//!
//! let fs = MemoryFilesystem::new();
//! fs.mkdirs(Path::new("/log/mml")).unwrap();
//! let mut file = fs.create(Path::new("/log/mml/0")).unwrap();
//! file.append(b"hello", false).unwrap();
//! assert_eq!(fs.length(Path::new("/log/mml/0")).unwrap(), 5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod filesystem;
mod local;
mod memory;

pub use error::{FsError, FsResult};
pub use filesystem::{Filesystem, LogFile};
pub use local::LocalFilesystem;
pub use memory::MemoryFilesystem;
