//! Crash-recoverable metadata log.
//!
//! A MetaLog persists the state of long-lived application entities as an
//! append-only log of versioned, checksummed entries. Each writer
//! generation is a numbered file that begins with a complete snapshot of
//! the live entities, a recover sentinel certifying the snapshot
//! finished, and then incremental updates and removal tombstones.
//! Recovery replays the newest file: the last entry per entity wins, and
//! tombstones drop entities from the recovered state.
//!
//! The building blocks:
//!
//! - [`Entity`] and [`Definition`] - the application-side contract: what
//!   gets persisted and how replayed headers map back to entity objects.
//! - [`Writer`] - appends snapshots, updates, and tombstones, mirrors
//!   every byte to a local backup, purges old generations, and rolls to a
//!   new file when the current one grows too large.
//! - [`Reader`] - scans the log directory and replays the newest
//!   generation at startup.
//!
//! ```no_run
//! use metalog_core::{MetaLogConfig, Reader, Writer};
//! use std::sync::Arc;
//!
//! # fn example(definition: Arc<dyn metalog_core::Definition>) -> metalog_core::MetaLogResult<()> {
//! let fs = Arc::new(metalog_fs::LocalFilesystem::new());
//! let config = MetaLogConfig::new("/opt/data").backup_label("rs1");
//!
//! let reader = Reader::new(fs.clone(), definition.clone(), "/opt/data/log/rsml", &config)?;
//! let entities = reader.get_entities();
//!
//! let writer = Writer::new(fs, definition, "/opt/data/log/rsml", &entities, config)?;
//! # drop(writer);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod checksum;
pub mod codec;
mod config;
mod dir;
mod entity;
mod entry;
mod error;
mod header;
mod reader;
mod writer;

pub use codec::DecodeCursor;
pub use config::MetaLogConfig;
pub use dir::{backup_path, scan_log_directory};
pub use entity::{Definition, Entity, EntityPtr, EntityRecover, EntityState, ENTITY_TYPE_RECOVER};
pub use entry::EntryHeader;
pub use error::{MetaLogError, MetaLogResult};
pub use header::{Header, NAME_LENGTH};
pub use reader::Reader;
pub use writer::Writer;
