//! Buffer utilities for reading and writing MySQL protocol data.

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use bytes::{BufMut, Bytes, BytesMut};

/// A buffer for reading MySQL protocol data.
pub struct ReadBuffer {
    data: Bytes,
    pos: usize,
}

impl ReadBuffer {
    /// Create a new read buffer from bytes.
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Get the current position in the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get the remaining bytes in the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if the buffer has at least `n` bytes remaining.
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    /// Get a slice of the remaining data.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    #[track_caller]
    fn ensure(&self, n: usize) -> Result<()> {
        if !self.has_remaining(n) {
            return Err(Error::BufferTooSmall {
                needed: n,
                available: self.remaining(),
                location: std::panic::Location::caller(),
            });
        }
        Ok(())
    }

    /// Skip `n` bytes.
    #[track_caller]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Look at the next byte without consuming it.
    #[track_caller]
    pub fn peek_u8(&self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.data[self.pos])
    }

    /// Read a single byte.
    #[track_caller]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let val = self.data[self.pos];
        self.pos += 1;
        Ok(val)
    }

    /// Read a little-endian u16.
    #[track_caller]
    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let val = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(val)
    }

    /// Read a little-endian 3-byte integer.
    #[track_caller]
    pub fn read_u24_le(&mut self) -> Result<u32> {
        self.ensure(3)?;
        let val = u32::from_le_bytes([
            self.data[self.pos],
            self.data[self.pos + 1],
            self.data[self.pos + 2],
            0,
        ]);
        self.pos += 3;
        Ok(val)
    }

    /// Read a little-endian u32.
    #[track_caller]
    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a little-endian u64.
    #[track_caller]
    pub fn read_u64_le(&mut self) -> Result<u64> {
        self.ensure(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Read raw bytes.
    #[track_caller]
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        self.ensure(n)?;
        let bytes = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(bytes)
    }

    /// Read everything left in the buffer.
    pub fn read_rest(&mut self) -> Bytes {
        let bytes = self.data.slice(self.pos..);
        self.pos = self.data.len();
        bytes
    }

    /// Read a length-encoded integer.
    ///
    /// Returns `None` for the NULL marker (0xFB), which only appears in row data.
    pub fn read_lenenc_int(&mut self) -> Result<Option<u64>> {
        let first = self.read_u8()?;
        match first {
            0..=0xFA => Ok(Some(first as u64)),
            LENENC_NULL => Ok(None),
            LENENC_U16 => Ok(Some(self.read_u16_le()? as u64)),
            LENENC_U24 => Ok(Some(self.read_u24_le()? as u64)),
            LENENC_U64 => Ok(Some(self.read_u64_le()?)),
            _ => Err(Error::protocol(format!(
                "Invalid length-encoded integer prefix: {:#04x}",
                first
            ))),
        }
    }

    /// Read a length-encoded integer that must not be NULL.
    pub fn read_lenenc_u64(&mut self) -> Result<u64> {
        self.read_lenenc_int()?
            .ok_or_else(|| Error::protocol("Unexpected NULL length-encoded integer"))
    }

    /// Read a length-encoded byte string. `None` is the NULL marker.
    pub fn read_lenenc_bytes(&mut self) -> Result<Option<Bytes>> {
        match self.read_lenenc_int()? {
            Some(len) => Ok(Some(self.read_bytes(len as usize)?)),
            None => Ok(None),
        }
    }

    /// Read a length-encoded string.
    /// Uses lossy UTF-8 conversion, metadata is never binary.
    pub fn read_lenenc_str(&mut self) -> Result<String> {
        let bytes = self
            .read_lenenc_bytes()?
            .ok_or_else(|| Error::protocol("Unexpected NULL length-encoded string"))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a NUL-terminated byte string, consuming the terminator.
    pub fn read_null_terminated(&mut self) -> Result<Bytes> {
        let rest = self.as_slice();
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::protocol("Missing NUL terminator"))?;
        let bytes = self.read_bytes(len)?;
        self.pos += 1;
        Ok(bytes)
    }

    /// Read a NUL-terminated string.
    pub fn read_null_terminated_str(&mut self) -> Result<String> {
        let bytes = self.read_null_terminated()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a string running to the end of the buffer, dropping a trailing NUL if present.
    pub fn read_eof_str(&mut self) -> String {
        let rest = self.read_rest();
        let trimmed = rest.strip_suffix(&[0u8]).unwrap_or(&rest[..]);
        String::from_utf8_lossy(trimmed).into_owned()
    }
}

/// A buffer for writing MySQL protocol data.
pub struct WriteBuffer {
    data: BytesMut,
}

impl WriteBuffer {
    /// Create a new write buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new write buffer with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
        }
    }

    /// Get the current length of the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the buffer contents as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Freeze the buffer into immutable bytes.
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, val: u8) {
        self.data.put_u8(val);
    }

    /// Write a little-endian u16.
    pub fn write_u16_le(&mut self, val: u16) {
        self.data.put_u16_le(val);
    }

    /// Write a little-endian 3-byte integer.
    pub fn write_u24_le(&mut self, val: u32) {
        self.data.extend_from_slice(&val.to_le_bytes()[..3]);
    }

    /// Write a little-endian u32.
    pub fn write_u32_le(&mut self, val: u32) {
        self.data.put_u32_le(val);
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write a length-encoded integer.
    pub fn write_lenenc_int(&mut self, val: u64) {
        match val {
            0..=0xFA => self.write_u8(val as u8),
            0xFB..=0xFFFF => {
                self.write_u8(LENENC_U16);
                self.write_u16_le(val as u16);
            }
            0x1_0000..=0xFF_FFFF => {
                self.write_u8(LENENC_U24);
                self.write_u24_le(val as u32);
            }
            _ => {
                self.write_u8(LENENC_U64);
                self.data.put_u64_le(val);
            }
        }
    }

    /// Write a length-encoded byte string.
    pub fn write_lenenc_bytes(&mut self, bytes: &[u8]) {
        self.write_lenenc_int(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    /// Write a NUL-terminated string.
    pub fn write_null_terminated(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
        self.write_u8(0);
    }

    /// Write padding zeros.
    pub fn write_zeros(&mut self, count: usize) {
        self.data.put_bytes(0, count);
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}
