//! Per-entry header codec.

use crate::codec::DecodeCursor;
use crate::error::{MetaLogError, MetaLogResult};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Counter for allocating unique entity ids within a process.
static NEXT_ID: AtomicI64 = AtomicI64::new(1);

fn allocate_id() -> i64 {
    NEXT_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Advances the id counter past an id observed during replay, so entities
/// created after recovery never collide with recovered ones.
pub(crate) fn observe_id(id: i64) {
    NEXT_ID.fetch_max(id + 1, AtomicOrdering::Relaxed);
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// The header preceding every entry in a MetaLog file.
///
/// An entity's identity is its `(timestamp, id)` pair: the id is unique
/// within a process lifetime and the creation timestamp disambiguates ids
/// across restarts. Each time an entity changes state its new serialization
/// is appended under the same identity; on replay the last entry for an
/// identity wins.
///
/// Equality and ordering consider **only** the identity fields, so headers
/// can key the reader's deduplication map and map iteration yields
/// entities in creation order.
#[derive(Debug, Clone, Copy)]
pub struct EntryHeader {
    /// Entity type code, defined within the context of a definition.
    pub entity_type: i32,
    /// Fletcher32 checksum of the entry payload (0 for tombstones).
    pub checksum: u32,
    /// Payload length in bytes (0 for tombstones).
    pub length: i32,
    /// Flags bitmask; see [`EntryHeader::FLAG_REMOVE`].
    pub flags: i16,
    /// Unique entity id.
    pub id: i64,
    /// Entity creation timestamp (nanoseconds since the epoch).
    pub timestamp: i64,
}

impl EntryHeader {
    /// Flag marking an entry as a tombstone; no payload follows it.
    pub const FLAG_REMOVE: i16 = 0x0001;

    /// Encoded length of an entry header:
    /// type (4) + checksum (4) + length (4) + flags (2) + id (8) +
    /// timestamp (8).
    pub const LENGTH: usize = 30;

    /// Creates a header for a new entity of the given type.
    ///
    /// Allocates a fresh id and stamps the creation time; checksum,
    /// length, and flags start at zero.
    #[must_use]
    pub fn new(entity_type: i32) -> Self {
        Self {
            entity_type,
            checksum: 0,
            length: 0,
            flags: 0,
            id: allocate_id(),
            timestamp: current_timestamp(),
        }
    }

    /// Returns `true` if this entry is a tombstone.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.flags & Self::FLAG_REMOVE != 0
    }

    /// Appends the encoded header to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.entity_type.to_le_bytes());
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf.extend_from_slice(&self.length.to_le_bytes());
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
    }

    /// Decodes a header from the cursor.
    ///
    /// # Errors
    ///
    /// Returns `EntryTruncated` if fewer than [`Self::LENGTH`] bytes
    /// remain.
    pub fn decode(cursor: &mut DecodeCursor<'_>) -> MetaLogResult<Self> {
        if cursor.remaining() < Self::LENGTH {
            return Err(MetaLogError::entry_truncated(format!(
                "entry header: expected {} bytes, got {}",
                Self::LENGTH,
                cursor.remaining()
            )));
        }
        Ok(Self {
            entity_type: cursor.get_i32()?,
            checksum: cursor.get_u32()?,
            length: cursor.get_i32()?,
            flags: cursor.get_i16()?,
            id: cursor.get_i64()?,
            timestamp: cursor.get_i64()?,
        })
    }
}

impl PartialEq for EntryHeader {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.id == other.id
    }
}

impl Eq for EntryHeader {}

impl PartialOrd for EntryHeader {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntryHeader {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.timestamp, self.id).cmp(&(other.timestamp, other.id))
    }
}
