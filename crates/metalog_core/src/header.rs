//! MetaLog file header codec.

use crate::codec::DecodeCursor;
use crate::error::{MetaLogError, MetaLogResult};

/// Number of bytes reserved for the log-kind name in a file header.
pub const NAME_LENGTH: usize = 14;

/// The fixed-length header at the start of every MetaLog file.
///
/// The `name` field carries the log-kind tag of the definition that wrote
/// the file (e.g. `"mml"` for the master log, `"rsml"` for a range-server
/// log), zero-padded to [`NAME_LENGTH`] bytes. Whether the name and
/// version are acceptable is decided by the reader against its
/// definition, not by this codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Format version of the definition that wrote the file.
    pub version: u16,
    /// Log-kind name, zero-padded.
    pub name: [u8; NAME_LENGTH],
}

impl Header {
    /// Encoded length of a header: version (2) + name (14).
    pub const LENGTH: usize = 2 + NAME_LENGTH;

    /// Creates a header for the given name and version.
    ///
    /// The name is truncated or zero-padded to [`NAME_LENGTH`] bytes.
    #[must_use]
    pub fn new(name: &str, version: u16) -> Self {
        let mut padded = [0u8; NAME_LENGTH];
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_LENGTH);
        padded[..len].copy_from_slice(&bytes[..len]);
        Self {
            version,
            name: padded,
        }
    }

    /// Returns the name with trailing zero padding stripped.
    #[must_use]
    pub fn name_str(&self) -> &str {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_LENGTH);
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    /// Appends the encoded header to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.name);
    }

    /// Decodes a header from the front of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns `BadHeader` if fewer than [`Self::LENGTH`] bytes are
    /// available.
    pub fn decode(bytes: &[u8]) -> MetaLogResult<Self> {
        if bytes.len() < Self::LENGTH {
            return Err(MetaLogError::bad_header(format!(
                "short header: expected {} bytes, got {}",
                Self::LENGTH,
                bytes.len()
            )));
        }
        let mut cursor = DecodeCursor::new(bytes);
        let version = cursor.get_u16()?;
        let mut name = [0u8; NAME_LENGTH];
        name.copy_from_slice(cursor.take(NAME_LENGTH)?);
        Ok(Self { version, name })
    }
}
