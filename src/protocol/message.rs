//! Message traits and builders for single-allocation MySQL packet serialization.
//!
//! Messages implement the `Message` trait which allows calculating the payload size
//! before allocation. The packet stream then frames the payload (3-byte length plus
//! sequence id) in one buffer.

use crate::error::Result;
use crate::protocol::constants::*;

// ============================================================================
// Core Traits
// ============================================================================

/// A client message that can calculate its payload size and serialize to bytes.
///
/// 1. Call `wire_size()` to determine buffer capacity needed
/// 2. Allocate buffer with exact capacity
/// 3. Call `write_to()` to serialize directly into buffer
pub trait Message {
    /// Calculate the serialized payload size in bytes (excluding packet header).
    fn wire_size(&self) -> usize;

    /// Write message payload to buffer.
    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()>;
}

/// A message that starts a new command phase.
///
/// Sending one resets the packet sequence id to zero.
pub trait CommandMessage: Message {
    /// Command byte (COM_QUERY, COM_PING, ...).
    fn command(&self) -> u8;
}

// ============================================================================
// Size Calculation Helpers
// ============================================================================

/// Calculate wire size for a length-encoded integer.
#[inline]
pub const fn lenenc_int_wire_size(val: u64) -> usize {
    match val {
        0..=0xFA => 1,
        0xFB..=0xFFFF => 3,
        0x1_0000..=0xFF_FFFF => 4,
        _ => 9,
    }
}

/// Calculate wire size for a length-encoded byte string.
#[inline]
pub const fn lenenc_bytes_wire_size(len: usize) -> usize {
    lenenc_int_wire_size(len as u64) + len
}

/// Calculate wire size for a NUL-terminated string.
#[inline]
pub const fn null_terminated_wire_size(s: &str) -> usize {
    s.len() + 1
}

// ============================================================================
// Write Helpers
// ============================================================================

/// Extension trait for writing MySQL protocol data to Vec<u8>.
pub trait WriteExt {
    /// Write a single byte.
    fn write_u8(&mut self, val: u8);

    /// Write a little-endian u16.
    fn write_u16_le(&mut self, val: u16);

    /// Write a little-endian 3-byte integer.
    fn write_u24_le(&mut self, val: u32);

    /// Write a little-endian u32.
    fn write_u32_le(&mut self, val: u32);

    /// Write raw bytes.
    fn write_bytes(&mut self, bytes: &[u8]);

    /// Write zeros.
    fn write_zeros(&mut self, count: usize);

    /// Write a length-encoded integer.
    fn write_lenenc_int(&mut self, val: u64);

    /// Write a length-encoded byte string.
    fn write_lenenc_bytes(&mut self, bytes: &[u8]);

    /// Write a NUL-terminated string.
    fn write_null_terminated(&mut self, s: &str);
}

impl WriteExt for Vec<u8> {
    #[inline]
    fn write_u8(&mut self, val: u8) {
        self.push(val);
    }

    #[inline]
    fn write_u16_le(&mut self, val: u16) {
        self.extend_from_slice(&val.to_le_bytes());
    }

    #[inline]
    fn write_u24_le(&mut self, val: u32) {
        self.extend_from_slice(&val.to_le_bytes()[..3]);
    }

    #[inline]
    fn write_u32_le(&mut self, val: u32) {
        self.extend_from_slice(&val.to_le_bytes());
    }

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    #[inline]
    fn write_zeros(&mut self, count: usize) {
        self.resize(self.len() + count, 0);
    }

    fn write_lenenc_int(&mut self, val: u64) {
        match val {
            0..=0xFA => self.push(val as u8),
            0xFB..=0xFFFF => {
                self.push(LENENC_U16);
                self.write_u16_le(val as u16);
            }
            0x1_0000..=0xFF_FFFF => {
                self.push(LENENC_U24);
                self.write_u24_le(val as u32);
            }
            _ => {
                self.push(LENENC_U64);
                self.extend_from_slice(&val.to_le_bytes());
            }
        }
    }

    fn write_lenenc_bytes(&mut self, bytes: &[u8]) {
        self.write_lenenc_int(bytes.len() as u64);
        self.extend_from_slice(bytes);
    }

    #[inline]
    fn write_null_terminated(&mut self, s: &str) {
        self.extend_from_slice(s.as_bytes());
        self.push(0);
    }
}

// ============================================================================
// Packet Header Writing
// ============================================================================

/// Write a MySQL packet header: 3-byte little-endian payload length and sequence id.
pub fn write_packet_header(buf: &mut Vec<u8>, payload_len: usize, sequence_id: u8) {
    buf.write_u24_le(payload_len as u32);
    buf.write_u8(sequence_id);
}

// ============================================================================
// Tests
// ============================================================================
