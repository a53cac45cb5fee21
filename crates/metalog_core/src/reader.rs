//! MetaLog reader.

use crate::checksum::fletcher32;
use crate::codec::DecodeCursor;
use crate::config::MetaLogConfig;
use crate::dir::{self, scan_log_directory};
use crate::entity::{Definition, EntityPtr, ENTITY_TYPE_RECOVER};
use crate::entry::EntryHeader;
use crate::error::{MetaLogError, MetaLogResult};
use crate::header::Header;
use metalog_fs::{Filesystem, LogFile};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Replays a MetaLog during startup recovery.
///
/// A reader scans the log directory, selects the newest generation,
/// verifies it against the local backup mirror, and replays its entries
/// into entity objects constructed by the definition's factory. It is
/// used single-threaded during recovery; the writer for the next
/// generation is opened only after recovery completes.
///
/// Two views of the replay are exposed: [`Reader::get_entities`], the
/// deduplicated latest state with removals applied, and
/// [`Reader::get_all_entities`], the verbatim decode-order list.
pub struct Reader {
    fs: Arc<dyn Filesystem>,
    definition: Arc<dyn Definition>,
    /// Normalized path of the log directory.
    path: PathBuf,
    /// Local backup directory paired with this log instance.
    backup_path: PathBuf,
    /// Format version declared by the loaded file's header.
    version: u16,
    /// Latest entity per identity, removals applied.
    entity_map: BTreeMap<EntryHeader, EntityPtr>,
    /// Every successfully decoded non-removal entity, in file order.
    entities: Vec<EntityPtr>,
    /// Next unused file number in the directory.
    next_file_id: i32,
}

impl Reader {
    /// Opens a reader over a log directory and replays the newest file.
    ///
    /// An empty or missing directory is legitimate (a brand-new log) and
    /// yields an empty reader.
    ///
    /// # Errors
    ///
    /// Returns any of the corruption errors of
    /// [`MetaLogError`](crate::MetaLogError) if the newest file cannot
    /// be trusted for recovery.
    pub fn new(
        fs: Arc<dyn Filesystem>,
        definition: Arc<dyn Definition>,
        path: impl Into<PathBuf>,
        config: &MetaLogConfig,
    ) -> MetaLogResult<Self> {
        let path = dir::normalize_path(&path.into());
        let backup_path = dir::backup_path(
            &config.data_directory,
            definition.name(),
            &config.backup_label,
        );

        let mut reader = Self {
            fs,
            definition,
            path,
            backup_path,
            version: 0,
            entity_map: BTreeMap::new(),
            entities: Vec::new(),
            next_file_id: 0,
        };
        reader.reload()?;
        Ok(reader)
    }

    /// Re-scans the directory and replays the newest file, discarding any
    /// previously loaded state.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Reader::new`].
    pub fn reload(&mut self) -> MetaLogResult<()> {
        self.entity_map.clear();
        self.entities.clear();

        let (file_ids, next_file_id) = scan_log_directory(self.fs.as_ref(), &self.path)?;
        self.next_file_id = next_file_id;

        if let Some(&newest) = file_ids.first() {
            self.verify_backup(newest)?;
            self.load_file(newest)?;
        }
        Ok(())
    }

    /// Returns the deduplicated latest-state view: one entity per
    /// identity, in creation order, removals applied.
    #[must_use]
    pub fn get_entities(&self) -> Vec<EntityPtr> {
        self.entity_map.values().cloned().collect()
    }

    /// Returns the identity-keyed map behind [`Reader::get_entities`].
    #[must_use]
    pub fn entity_map(&self) -> &BTreeMap<EntryHeader, EntityPtr> {
        &self.entity_map
    }

    /// Returns every non-removal entity decoded from the file, in file
    /// order, duplicates included. This is a verbatim replay list: later
    /// overwrites and removals never prune it.
    #[must_use]
    pub fn get_all_entities(&self) -> Vec<EntityPtr> {
        self.entities.clone()
    }

    /// Returns the next unused numeric file name in the log directory.
    #[must_use]
    pub fn next_file_id(&self) -> i32 {
        self.next_file_id
    }

    /// Returns the format version declared by the loaded file, or 0 if
    /// the directory was empty.
    #[must_use]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Fails with `BackupFileMismatch` if a local backup of the file
    /// exists and is shorter than the primary. Appends reach the backup
    /// before the primary, so a shorter backup cannot occur in normal
    /// operation. A longer backup is the signature of a crash between
    /// the two appends and is tolerated.
    fn verify_backup(&self, file_id: i32) -> MetaLogResult<()> {
        let backup = self.backup_path.join(file_id.to_string());
        if !backup.exists() {
            return Ok(());
        }

        let file = self.path.join(file_id.to_string());
        let file_length = self.fs.length(&file)?;
        let backup_length = std::fs::metadata(&backup)?.len();

        if backup_length < file_length {
            return Err(MetaLogError::BackupFileMismatch {
                file,
                file_length,
                backup,
                backup_length,
            });
        }
        Ok(())
    }

    fn load_file(&mut self, file_id: i32) -> MetaLogResult<()> {
        let filename = self.path.join(file_id.to_string());
        let file_length = self.fs.length(&filename)?;
        let mut file = self.fs.open(&filename)?;

        let mut offset = 0u64;
        self.read_header(&filename, file.as_mut(), &mut offset)?;

        let mut found_recover_entry = false;
        while offset < file_length {
            match self.read_entry(file.as_mut(), &mut offset, &mut found_recover_entry) {
                Ok(()) => {}
                Err(err) => {
                    return Err(err.with_read_context(&filename, offset, file_length));
                }
            }
        }

        if !found_recover_entry {
            return Err(MetaLogError::MissingRecoverEntity { file: filename });
        }

        debug!(file = %self.path.join(file_id.to_string()).display(),
               entities = self.entity_map.len(),
               "replayed MetaLog file");
        Ok(())
    }

    fn read_header(
        &mut self,
        filename: &Path,
        file: &mut dyn LogFile,
        offset: &mut u64,
    ) -> MetaLogResult<()> {
        let bytes = file.read(Header::LENGTH)?;
        if bytes.len() != Header::LENGTH {
            return Err(MetaLogError::bad_header(format!(
                "short read of {} header in '{}' (expected {}, got {})",
                self.definition.name(),
                filename.display(),
                Header::LENGTH,
                bytes.len()
            )));
        }
        *offset += bytes.len() as u64;

        let header = Header::decode(&bytes)?;
        if header.name_str() != self.definition.name() {
            return Err(MetaLogError::bad_header(format!(
                "wrong name in '{}' header ('{}' != '{}')",
                filename.display(),
                header.name_str(),
                self.definition.name()
            )));
        }

        if header.version > self.definition.version() {
            return Err(MetaLogError::VersionMismatch {
                name: self.definition.name().to_string(),
                file_version: header.version,
                supported: self.definition.version(),
            });
        }

        self.version = header.version;
        Ok(())
    }

    fn read_entry(
        &mut self,
        file: &mut dyn LogFile,
        offset: &mut u64,
        found_recover_entry: &mut bool,
    ) -> MetaLogResult<()> {
        let bytes = file.read(EntryHeader::LENGTH)?;
        if bytes.len() != EntryHeader::LENGTH {
            return Err(MetaLogError::entry_truncated("reading entity header"));
        }
        let mut cursor = DecodeCursor::new(&bytes);
        let header = EntryHeader::decode(&mut cursor)?;
        *offset += bytes.len() as u64;

        if header.entity_type == ENTITY_TYPE_RECOVER {
            *found_recover_entry = true;
            return Ok(());
        }

        if header.is_removed() {
            self.entity_map.remove(&header);
            return Ok(());
        }

        let length = usize::try_from(header.length)
            .map_err(|_| MetaLogError::entry_truncated("negative entry length"))?;
        let payload = file.read(length)?;
        if payload.len() != length {
            return Err(MetaLogError::entry_truncated("reading entity payload"));
        }
        *offset += payload.len() as u64;

        // Factory may deliberately drop obsoleted types; their payloads
        // are skipped without decoding.
        let entity = match self.definition.create(&header)? {
            Some(entity) => entity,
            None => return Ok(()),
        };

        let computed = fletcher32(&payload);
        if computed != header.checksum {
            return Err(MetaLogError::ChecksumMismatch {
                expected: header.checksum,
                actual: computed,
            });
        }

        let mut cursor = DecodeCursor::new(&payload);
        let encoding_version = cursor.get_u8()?;
        entity.decode(encoding_version, &mut cursor)?;

        self.entity_map.insert(header, Arc::clone(&entity));
        self.entities.push(entity);
        Ok(())
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("entities", &self.entity_map.len())
            .finish_non_exhaustive()
    }
}
