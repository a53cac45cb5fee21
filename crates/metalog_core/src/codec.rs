//! Bounds-checked encode/decode primitives.
//!
//! All MetaLog on-disk integers are little-endian. Decoding goes through
//! [`DecodeCursor`], which tracks its position and turns any overrun into
//! an [`MetaLogError::EntryTruncated`] instead of panicking or reading
//! stale bytes.

use crate::error::{MetaLogError, MetaLogResult};

/// A read cursor over a byte slice.
#[derive(Debug)]
pub struct DecodeCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DecodeCursor<'a> {
    /// Creates a cursor at the start of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the number of bytes left to decode.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Takes the next `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `EntryTruncated` if fewer than `len` bytes remain.
    pub fn take(&mut self, len: usize) -> MetaLogResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(MetaLogError::entry_truncated(format!(
                "need {len} bytes, {} remaining",
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Decodes a `u8`.
    ///
    /// # Errors
    ///
    /// Returns `EntryTruncated` on overrun.
    pub fn get_u8(&mut self) -> MetaLogResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Decodes a little-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns `EntryTruncated` on overrun.
    pub fn get_u16(&mut self) -> MetaLogResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Decodes a little-endian `i16`.
    ///
    /// # Errors
    ///
    /// Returns `EntryTruncated` on overrun.
    pub fn get_i16(&mut self) -> MetaLogResult<i16> {
        let bytes = self.take(2)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Decodes a little-endian `i32`.
    ///
    /// # Errors
    ///
    /// Returns `EntryTruncated` on overrun.
    pub fn get_i32(&mut self) -> MetaLogResult<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Decodes a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns `EntryTruncated` on overrun.
    pub fn get_u32(&mut self) -> MetaLogResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Decodes a little-endian `i64`.
    ///
    /// # Errors
    ///
    /// Returns `EntryTruncated` on overrun.
    pub fn get_i64(&mut self) -> MetaLogResult<i64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(raw))
    }

    /// Decodes a length-prefixed byte string (u32 length + bytes).
    ///
    /// # Errors
    ///
    /// Returns `EntryTruncated` on overrun.
    pub fn get_bytes(&mut self) -> MetaLogResult<Vec<u8>> {
        let len = self.get_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Decodes a length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns `EntryTruncated` on overrun or invalid UTF-8.
    pub fn get_str(&mut self) -> MetaLogResult<String> {
        let bytes = self.get_bytes()?;
        String::from_utf8(bytes)
            .map_err(|_| MetaLogError::entry_truncated("invalid UTF-8 in string field"))
    }
}

/// Appends a length-prefixed byte string (u32 length + bytes) to `buf`.
pub fn put_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buf.extend_from_slice(data);
}

/// Appends a length-prefixed UTF-8 string to `buf`.
pub fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}
