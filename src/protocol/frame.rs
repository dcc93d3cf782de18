//! Frame codec
//!
//! Length-prefixed primitives shared by every operation. All integers are
//! big-endian.
//!
//! ## Field Widths
//! ```text
//! u8   op code, booleans
//! u16  error codes, string lengths, version lengths
//! i32  key / value / blob lengths, counts, partition ids
//! ```
//!
//! A key length of `-1` means "absent". It is only accepted where the caller
//! asks for a nullable field (the end-of-stream marker).

use std::io::{self, Read, Write};

use crate::config::DEFAULT_MAX_FRAME_SIZE;
use crate::error::{EmberError, Result};

/// Length sentinel for an absent key
pub const ABSENT_KEY: i32 = -1;

// =============================================================================
// Reader
// =============================================================================

/// Reads protocol primitives from a byte stream
pub struct FrameReader<R> {
    inner: R,

    /// Largest length any field may declare
    max_len: usize,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_len(inner, DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_len(inner: R, max_len: usize) -> Self {
        Self { inner, max_len }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read the first byte of a request.
    ///
    /// Returns `None` if the peer closed the stream cleanly before sending
    /// anything; that is the only place a clean EOF is not an error.
    pub fn read_request_start(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// `read_exact` that reports a short read as a framing error
    fn fill(&mut self, buf: &mut [u8], field: &str) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                EmberError::Framing(format!(
                    "stream ended while reading {} ({} bytes expected)",
                    field,
                    buf.len()
                ))
            } else {
                EmberError::Io(e)
            }
        })
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf, "u8")?;
        Ok(buf[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.fill(&mut buf, "u16")?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf, "i32")?;
        Ok(i32::from_be_bytes(buf))
    }

    /// Validate a declared length against the sign and the sane bound
    fn checked_len(&self, len: i64, field: &str) -> Result<usize> {
        if len < 0 {
            return Err(EmberError::Framing(format!(
                "negative length {} for {}",
                len, field
            )));
        }
        let len = len as usize;
        if len > self.max_len {
            return Err(EmberError::Framing(format!(
                "length {} for {} exceeds limit of {} bytes",
                len, field, self.max_len
            )));
        }
        Ok(len)
    }

    /// Read exactly `len` bytes
    pub fn read_bytes(&mut self, len: usize, field: &str) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        if len > 0 {
            self.fill(&mut bytes, field)?;
        }
        Ok(bytes)
    }

    /// `len:i32, bytes` where the field must be present
    pub fn read_int_prefixed(&mut self, field: &str) -> Result<Vec<u8>> {
        let len = self.read_i32()?;
        let len = self.checked_len(len as i64, field)?;
        self.read_bytes(len, field)
    }

    /// `len:i32, bytes` where `-1` means absent
    pub fn read_nullable(&mut self, field: &str) -> Result<Option<Vec<u8>>> {
        let len = self.read_i32()?;
        if len == ABSENT_KEY {
            return Ok(None);
        }
        let len = self.checked_len(len as i64, field)?;
        self.read_bytes(len, field).map(Some)
    }

    /// `len:u16, bytes`
    pub fn read_short_prefixed(&mut self, field: &str) -> Result<Vec<u8>> {
        let len = self.read_u16()?;
        let len = self.checked_len(len as i64, field)?;
        self.read_bytes(len, field)
    }

    /// `len:u16, utf8`
    pub fn read_utf(&mut self, field: &str) -> Result<String> {
        let bytes = self.read_short_prefixed(field)?;
        String::from_utf8(bytes)
            .map_err(|e| EmberError::Framing(format!("{} is not valid UTF-8: {}", field, e)))
    }

    /// `count:i32, count × i32`
    pub fn read_int_list(&mut self, field: &str) -> Result<Vec<i32>> {
        let count = self.read_i32()?;
        let count = self.checked_len(count as i64 * 4, field)? / 4;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_i32()?);
        }
        Ok(values)
    }

    /// One `(keyLen, key, valueLen, value)` stream entry, or `None` at the
    /// `keyLen == -1` terminator
    pub fn read_stream_entry(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let Some(key) = self.read_nullable("stream key")? else {
            return Ok(None);
        };
        let value = self.read_int_prefixed("stream value")?;
        Ok(Some((key, value)))
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Writes protocol primitives to a byte stream
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.inner.write_all(&[value])?;
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(value as u8)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.inner.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Bytes with no length prefix
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// `len:i32, bytes`
    pub fn write_int_prefixed(&mut self, bytes: &[u8]) -> Result<()> {
        let len = i32::try_from(bytes.len()).map_err(|_| {
            EmberError::Framing(format!("{} bytes do not fit an i32 length", bytes.len()))
        })?;
        self.write_i32(len)?;
        self.write_raw(bytes)
    }

    /// `len:u16, bytes`
    pub fn write_short_prefixed(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u16::try_from(bytes.len()).map_err(|_| {
            EmberError::Framing(format!("{} bytes do not fit a u16 length", bytes.len()))
        })?;
        self.write_u16(len)?;
        self.write_raw(bytes)
    }

    /// `len:u16, utf8`
    pub fn write_utf(&mut self, value: &str) -> Result<()> {
        self.write_short_prefixed(value.as_bytes())
    }

    /// `len:u16, utf8`, cutting the text at a char boundary if it is too long.
    ///
    /// Used for error messages, which must always be writable.
    pub fn write_utf_truncated(&mut self, value: &str) -> Result<()> {
        let mut end = value.len().min(u16::MAX as usize);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        self.write_utf(&value[..end])
    }

    /// `count:i32, count × i32`
    pub fn write_int_list(&mut self, values: &[i32]) -> Result<()> {
        let count = i32::try_from(values.len())
            .map_err(|_| EmberError::Framing(format!("{} values in one list", values.len())))?;
        self.write_i32(count)?;
        for value in values {
            self.write_i32(*value)?;
        }
        Ok(())
    }

    /// One `(keyLen, key, valueLen, value)` stream entry
    pub fn write_stream_entry(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_int_prefixed(key)?;
        self.write_int_prefixed(value)
    }

    /// The `keyLen == -1` stream terminator
    pub fn write_stream_end(&mut self) -> Result<()> {
        self.write_i32(ABSENT_KEY)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}
