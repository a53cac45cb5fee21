//! MetaLog writer.

use crate::checksum::fletcher32;
use crate::config::MetaLogConfig;
use crate::dir::{self, scan_log_directory};
use crate::entity::{Definition, Entity, EntityPtr, EntityRecover, ENTITY_TYPE_RECOVER};
use crate::entry::EntryHeader;
use crate::error::{MetaLogError, MetaLogResult};
use crate::header::Header;
use metalog_fs::{Filesystem, LogFile};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Writes a MetaLog.
///
/// A writer persists application entities to a numbered log file. It is
/// constructed with the set of entities recovered from a prior read of
/// the log (its initial snapshot), stays open for the life of the server
/// process, and records state changes by appending updated entities.
/// Typical use:
///
/// ```ignore
/// let reader = Reader::new(fs.clone(), definition.clone(), &log_dir, &config)?;
/// let entities = reader.get_entities();
/// let writer = Writer::new(fs, definition, &log_dir, &entities, config)?;
/// ```
///
/// Every mutating call appends to a local backup file first and then to
/// the primary log file, so the backup mirror is never behind the
/// primary. All operations serialize on one internal mutex; a writer is
/// safe to share across threads.
pub struct Writer {
    fs: Arc<dyn Filesystem>,
    definition: Arc<dyn Definition>,
    /// Normalized path of the log directory.
    path: PathBuf,
    /// Local backup directory for this log instance.
    backup_path: PathBuf,
    history_size: usize,
    max_file_size: u64,
    sync_on_append: bool,
    write_recover_entry: bool,
    inner: Mutex<Inner>,
}

struct Inner {
    /// Open primary log file, `None` once closed.
    file: Option<Box<dyn LogFile>>,
    /// Open local backup file, `None` once closed.
    backup_file: Option<File>,
    filename: PathBuf,
    backup_filename: PathBuf,
    /// Bytes appended to the current generation so far.
    offset: u64,
    /// Numeric file ids present in the directory, newest first; the
    /// current generation is at the front.
    file_ids: Vec<i32>,
    /// Latest serialized entry per live entity, replayed into the next
    /// generation on rollover.
    snapshot: BTreeMap<EntryHeader, Vec<u8>>,
}

impl Writer {
    /// Opens a new log generation and persists the initial entities.
    ///
    /// Creates the log directory and the backup directory if absent,
    /// purges generations beyond the retention window from both, opens
    /// the next numbered file on both, and writes the file header, one
    /// entry per initial entity, and the recover sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory, create, or append operation
    /// fails.
    pub fn new(
        fs: Arc<dyn Filesystem>,
        definition: Arc<dyn Definition>,
        path: impl Into<PathBuf>,
        initial_entities: &[EntityPtr],
        config: MetaLogConfig,
    ) -> MetaLogResult<Self> {
        let path = dir::normalize_path(&path.into());
        if !fs.exists(&path) {
            fs.mkdirs(&path)?;
        }

        let backup_path = dir::backup_path(
            &config.data_directory,
            definition.name(),
            &config.backup_label,
        );
        if !backup_path.exists() {
            fs::create_dir_all(&backup_path)?;
        }

        let (file_ids, next_id) = scan_log_directory(fs.as_ref(), &path)?;

        let writer = Self {
            fs,
            definition,
            path,
            backup_path,
            history_size: config.history_size,
            max_file_size: config.max_file_size,
            sync_on_append: config.sync_on_append,
            write_recover_entry: config.write_recover_entry,
            inner: Mutex::new(Inner {
                file: None,
                backup_file: None,
                filename: PathBuf::new(),
                backup_filename: PathBuf::new(),
                offset: 0,
                file_ids,
                snapshot: BTreeMap::new(),
            }),
        };

        {
            let mut inner = writer.inner.lock();
            writer.purge_old_log_files(&mut inner)?;
            writer.open_generation(&mut inner, next_id)?;
            writer.write_header(&mut inner)?;

            for entity in initial_entities {
                let (header, bytes) = serialize_entity(entity.as_ref());
                update_snapshot(&mut inner.snapshot, &header, &bytes);
                writer.append(&mut inner, &bytes)?;
            }

            if writer.write_recover_entry {
                let (_, bytes) = serialize_entity(&EntityRecover::new());
                writer.append(&mut inner, &bytes)?;
            }
        }

        info!(path = %writer.path.display(), name = writer.definition.name(),
              "opened MetaLog writer");
        Ok(writer)
    }

    /// Returns the log directory this writer appends under.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Persists an entity to the log.
    ///
    /// If the entity is marked for removal only a tombstone header is
    /// written; otherwise the header and the entity's serialized state
    /// are written.
    ///
    /// # Errors
    ///
    /// Returns [`MetaLogError::Closed`] after `close()`, or an I/O error
    /// if an append fails.
    pub fn record_state(&self, entity: &EntityPtr) -> MetaLogResult<()> {
        let mut inner = self.inner.lock();
        self.check_open(&inner)?;

        let (header, bytes) = serialize_entity(entity.as_ref());
        update_snapshot(&mut inner.snapshot, &header, &bytes);
        self.append(&mut inner, &bytes)?;
        self.maybe_roll(&mut inner)
    }

    /// Persists a batch of entities.
    ///
    /// All entries are concatenated into one buffer and written with a
    /// single underlying append, the closest approximation to atomicity
    /// the filesystem affords.
    ///
    /// # Errors
    ///
    /// Returns [`MetaLogError::Closed`] after `close()`, or an I/O error
    /// if the append fails.
    pub fn record_states(&self, entities: &[EntityPtr]) -> MetaLogResult<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        self.check_open(&inner)?;

        let mut buf = Vec::new();
        for entity in entities {
            let (header, bytes) = serialize_entity(entity.as_ref());
            update_snapshot(&mut inner.snapshot, &header, &bytes);
            buf.extend_from_slice(&bytes);
        }
        self.append(&mut inner, &buf)?;
        self.maybe_roll(&mut inner)
    }

    /// Records the removal of an entity.
    ///
    /// Marks the entity for removal and writes a tombstone header,
    /// regardless of the entity's prior flag state.
    ///
    /// # Errors
    ///
    /// Returns [`MetaLogError::Closed`] after `close()`, or an I/O error
    /// if the append fails.
    pub fn record_removal(&self, entity: &EntityPtr) -> MetaLogResult<()> {
        let mut inner = self.inner.lock();
        self.check_open(&inner)?;

        let (header, bytes) = serialize_tombstone(entity.as_ref());
        inner.snapshot.remove(&header);
        self.append(&mut inner, &bytes)?;
        self.maybe_roll(&mut inner)
    }

    /// Records the removal of a batch of entities with one underlying
    /// append.
    ///
    /// # Errors
    ///
    /// Returns [`MetaLogError::Closed`] after `close()`, or an I/O error
    /// if the append fails.
    pub fn record_removals(&self, entities: &[EntityPtr]) -> MetaLogResult<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        self.check_open(&inner)?;

        let mut buf = Vec::with_capacity(entities.len() * EntryHeader::LENGTH);
        for entity in entities {
            let (header, bytes) = serialize_tombstone(entity.as_ref());
            inner.snapshot.remove(&header);
            buf.extend_from_slice(&bytes);
        }
        self.append(&mut inner, &buf)?;
        self.maybe_roll(&mut inner)
    }

    /// Closes both file handles. Idempotent; any later mutating call
    /// fails with [`MetaLogError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns an error if final syncs fail.
    pub fn close(&self) -> MetaLogResult<()> {
        let mut inner = self.inner.lock();
        if let Some(mut file) = inner.file.take() {
            file.sync()?;
        }
        if let Some(backup) = inner.backup_file.take() {
            backup.sync_all()?;
        }
        Ok(())
    }

    fn check_open(&self, inner: &Inner) -> MetaLogResult<()> {
        if inner.file.is_none() {
            return Err(MetaLogError::closed(&self.path));
        }
        Ok(())
    }

    /// Opens primary and backup files for generation `id`.
    fn open_generation(&self, inner: &mut Inner, id: i32) -> MetaLogResult<()> {
        inner.filename = self.path.join(id.to_string());
        inner.file = Some(self.fs.create(&inner.filename)?);

        inner.backup_filename = self.backup_path.join(id.to_string());
        inner.backup_file = Some(
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&inner.backup_filename)?,
        );

        inner.file_ids.insert(0, id);
        inner.offset = 0;
        debug!(file = %inner.filename.display(), "opened MetaLog generation");
        Ok(())
    }

    fn write_header(&self, inner: &mut Inner) -> MetaLogResult<()> {
        let header = Header::new(self.definition.name(), self.definition.version());
        let mut buf = Vec::with_capacity(Header::LENGTH);
        header.encode(&mut buf);
        self.append(inner, &buf)
    }

    /// Removes the numerically smallest generations until at most
    /// `history_size` remain, from the primary filesystem and the local
    /// backup alike.
    fn purge_old_log_files(&self, inner: &mut Inner) -> MetaLogResult<()> {
        while inner.file_ids.len() > self.history_size {
            let id = match inner.file_ids.pop() {
                Some(id) => id,
                None => break,
            };

            let primary = self.path.join(id.to_string());
            if self.fs.exists(&primary) {
                self.fs.remove(&primary)?;
            }
            let bad = self.path.join(format!("{id}.bad"));
            if self.fs.exists(&bad) {
                self.fs.remove(&bad)?;
            }

            let backup = self.backup_path.join(id.to_string());
            if backup.exists() {
                fs::remove_file(&backup)?;
            }
            debug!(id, "purged old MetaLog file");
        }
        Ok(())
    }

    /// Appends to the local backup file first, then to the primary file
    /// with a flush request, and advances the running offset.
    fn append(&self, inner: &mut Inner, data: &[u8]) -> MetaLogResult<()> {
        let backup = inner
            .backup_file
            .as_mut()
            .ok_or_else(|| MetaLogError::closed(&self.path))?;
        backup.write_all(data).map_err(|source| {
            MetaLogError::Fs(metalog_fs::FsError::AppendFailed {
                path: inner.backup_filename.clone(),
                len: data.len(),
                source,
            })
        })?;

        let file = inner
            .file
            .as_mut()
            .ok_or_else(|| MetaLogError::closed(&self.path))?;
        file.append(data, self.sync_on_append)?;

        inner.offset += data.len() as u64;
        Ok(())
    }

    /// Rolls to a new generation when the current file has outgrown the
    /// configured maximum: the new file receives the header, the current
    /// snapshot, and the recover sentinel.
    fn maybe_roll(&self, inner: &mut Inner) -> MetaLogResult<()> {
        if inner.offset <= self.max_file_size {
            return Ok(());
        }

        if let Some(mut file) = inner.file.take() {
            file.sync()?;
        }
        inner.backup_file = None;

        let next_id = inner.file_ids.first().map_or(0, |front| front + 1);
        self.purge_old_log_files(inner)?;
        self.open_generation(inner, next_id)?;
        self.write_header(inner)?;

        let mut buf = Vec::new();
        for bytes in inner.snapshot.values() {
            buf.extend_from_slice(bytes);
        }
        if self.write_recover_entry {
            let (_, sentinel) = serialize_entity(&EntityRecover::new());
            buf.extend_from_slice(&sentinel);
        }
        self.append(inner, &buf)?;

        info!(file = %inner.filename.display(), "rolled MetaLog to new generation");
        Ok(())
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("path", &self.path)
            .field("history_size", &self.history_size)
            .finish_non_exhaustive()
    }
}

/// Serializes an entity as a log entry: header plus payload, or a bare
/// tombstone header if the entity is marked for removal.
fn serialize_entity(entity: &dyn Entity) -> (EntryHeader, Vec<u8>) {
    // One header snapshot drives both the tombstone decision and the
    // written bytes. Deciding from a separate flag read would let a
    // removal racing in between the two emit a REMOVE-flagged header
    // followed by payload, which the reader cannot replay.
    let mut header = entity.header();

    if header.is_removed() || header.entity_type == ENTITY_TYPE_RECOVER {
        // Tombstones and the sentinel are a bare header; the reader
        // consumes no payload bytes for either.
        let mut bytes = Vec::with_capacity(EntryHeader::LENGTH);
        header.encode(&mut bytes);
        return (header, bytes);
    }

    // One encode call, one acquisition of the entity's lock: a
    // consistent snapshot even while the application keeps mutating.
    let mut payload = Vec::with_capacity(1 + entity.encoded_length());
    payload.push(entity.encoding_version());
    entity.encode(&mut payload);

    header.length = payload.len() as i32;
    header.checksum = fletcher32(&payload);

    let mut bytes = Vec::with_capacity(EntryHeader::LENGTH + payload.len());
    header.encode(&mut bytes);
    bytes.extend_from_slice(&payload);
    (header, bytes)
}

/// Serializes a tombstone for an entity, marking it for removal.
fn serialize_tombstone(entity: &dyn Entity) -> (EntryHeader, Vec<u8>) {
    entity.mark_for_removal();
    let header = entity.header();
    let mut bytes = Vec::with_capacity(EntryHeader::LENGTH);
    header.encode(&mut bytes);
    (header, bytes)
}

/// Tracks the latest serialized entry per live entity. The recover
/// sentinel never enters the snapshot, and tombstoned entities leave it.
fn update_snapshot(
    snapshot: &mut BTreeMap<EntryHeader, Vec<u8>>,
    header: &EntryHeader,
    bytes: &[u8],
) {
    if header.entity_type == ENTITY_TYPE_RECOVER {
        return;
    }
    if header.is_removed() {
        snapshot.remove(header);
    } else {
        snapshot.insert(*header, bytes.to_vec());
    }
}
