//! The entity contract and definition collaborator.
//!
//! An entity is a long-lived application state object (an operation, a
//! range, server bookkeeping) whose mutable state the MetaLog persists
//! across restarts. Entities are shared between the application and the
//! log through [`EntityPtr`] handles; each concrete entity guards its
//! mutable fields with its own lock so the writer can snapshot a
//! consistent serialization while other threads keep mutating.

use crate::codec::DecodeCursor;
use crate::entry::{self, EntryHeader};
use crate::error::MetaLogResult;
use parking_lot::Mutex;
use std::sync::Arc;

/// Entity type code of the recover sentinel.
///
/// Concrete definitions must allocate their own type codes above this
/// value.
pub const ENTITY_TYPE_RECOVER: i32 = 1;

/// Shared handle to an entity.
pub type EntityPtr = Arc<dyn Entity>;

/// A persistable application state object.
///
/// # Serialization
///
/// The on-disk payload of an entity is one `encoding_version` byte
/// followed by the bytes written by [`Entity::encode`]. `decode` receives
/// the version byte that prefixed the payload and must accept every
/// version up to the current one, applying upgrade logic for older
/// encodings.
///
/// # Concurrency
///
/// `encode` must serialize a consistent snapshot under a **single**
/// acquisition of the entity's internal lock, and must not perform I/O
/// while holding it; the writer appends the buffered bytes afterwards so
/// application threads are blocked only for the snapshot window.
/// [`Entity::encoded_length`] is a capacity hint and may be slightly
/// stale by the time `encode` runs.
pub trait Entity: Send + Sync {
    /// Returns the entity's identity/removal cell.
    fn state(&self) -> &EntityState;

    /// Version number of the entity's current encoding.
    fn encoding_version(&self) -> u8;

    /// Length of the entity's internal encoding, excluding the version
    /// byte. A capacity hint, not a contract.
    fn encoded_length(&self) -> usize;

    /// Appends the entity's internal encoding to `buf`.
    fn encode(&self, buf: &mut Vec<u8>);

    /// Reconstructs entity state from bytes written under
    /// `encoding_version`.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the payload is malformed.
    fn decode(&self, encoding_version: u8, cursor: &mut DecodeCursor<'_>) -> MetaLogResult<()>;

    /// Returns a copy of the entity's current header.
    fn header(&self) -> EntryHeader {
        self.state().header()
    }

    /// Returns the entity's unique id.
    fn id(&self) -> i64 {
        self.state().header().id
    }

    /// Marks the entity for removal; the next time it is persisted only a
    /// tombstone header is written.
    fn mark_for_removal(&self) {
        self.state().mark_for_removal();
    }

    /// Returns `true` if the entity has been marked for removal.
    fn marked_for_removal(&self) -> bool {
        self.state().marked_for_removal()
    }
}

/// The identity and removal-flag cell embedded in every entity.
///
/// Concrete entities hold one of these (usually constructed alongside
/// their own state lock) and return it from [`Entity::state`].
#[derive(Debug)]
pub struct EntityState {
    header: Mutex<EntryHeader>,
}

impl EntityState {
    /// Creates state for a brand-new entity of the given type, allocating
    /// a fresh id.
    #[must_use]
    pub fn new(entity_type: i32) -> Self {
        Self {
            header: Mutex::new(EntryHeader::new(entity_type)),
        }
    }

    /// Creates state for an entity reconstructed from a replayed header.
    ///
    /// Advances the process-wide id counter past the replayed id.
    #[must_use]
    pub fn from_header(header: EntryHeader) -> Self {
        entry::observe_id(header.id);
        Self {
            header: Mutex::new(header),
        }
    }

    /// Returns a copy of the current header.
    #[must_use]
    pub fn header(&self) -> EntryHeader {
        *self.header.lock()
    }

    /// Sets the removal flag and zeroes the length and checksum fields.
    pub fn mark_for_removal(&self) {
        let mut header = self.header.lock();
        header.flags |= EntryHeader::FLAG_REMOVE;
        header.length = 0;
        header.checksum = 0;
    }

    /// Returns `true` if the removal flag is set.
    #[must_use]
    pub fn marked_for_removal(&self) -> bool {
        self.header.lock().is_removed()
    }
}

/// The sentinel entity terminating the snapshot block of a log file.
///
/// Carries no payload; its presence in a file certifies that the writer
/// finished persisting its initial entities. The reader treats its
/// absence as fatal.
#[derive(Debug)]
pub struct EntityRecover {
    state: EntityState,
}

impl EntityRecover {
    /// Creates a recover sentinel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: EntityState::new(ENTITY_TYPE_RECOVER),
        }
    }
}

impl Default for EntityRecover {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity for EntityRecover {
    fn state(&self) -> &EntityState {
        &self.state
    }

    fn encoding_version(&self) -> u8 {
        0
    }

    fn encoded_length(&self) -> usize {
        0
    }

    fn encode(&self, _buf: &mut Vec<u8>) {}

    fn decode(&self, _encoding_version: u8, _cursor: &mut DecodeCursor<'_>) -> MetaLogResult<()> {
        Ok(())
    }
}

/// Defines the set of valid entities for one kind of MetaLog.
///
/// A definition supplies the log-kind name written into file headers
/// (e.g. `"mml"`, `"rsml"`), the highest format version it can read, and
/// the factory the reader uses to construct empty entities from replayed
/// headers.
pub trait Definition: Send + Sync {
    /// The log-kind name, at most [`crate::NAME_LENGTH`] bytes.
    fn name(&self) -> &str;

    /// Highest format version this definition supports.
    fn version(&self) -> u16;

    /// Constructs an empty entity for a replayed header.
    ///
    /// Returns `Ok(None)` for type codes that are recognized but
    /// deliberately obsoleted; the reader then skips the entry's payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MetaLogError::BadEntityType`] for type codes the
    /// definition has never known.
    fn create(&self, header: &EntryHeader) -> MetaLogResult<Option<EntityPtr>>;
}
