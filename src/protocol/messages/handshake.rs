//! Connection-phase messages sent by the client.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{
    lenenc_bytes_wire_size, null_terminated_wire_size, Message, WriteExt,
};

// ============================================================================
// HandshakeResponseMessage - Protocol::HandshakeResponse41
// ============================================================================

/// Reply to the server's initial handshake.
///
/// Carries the negotiated capability flags, the user name, the first
/// authentication response and optionally the default schema and
/// connection attributes.
pub struct HandshakeResponseMessage<'a> {
    /// Negotiated capability flags.
    pub capabilities: u32,
    /// Largest packet the client will accept.
    pub max_packet_size: u32,
    /// Connection collation id.
    pub charset: u8,
    /// User name.
    pub username: &'a str,
    /// Scrambled password produced by the auth plugin.
    pub auth_response: &'a [u8],
    /// Default schema (sent when CLIENT_CONNECT_WITH_DB is negotiated).
    pub database: Option<&'a str>,
    /// Name of the plugin that produced `auth_response`.
    pub auth_plugin: &'a str,
    /// Connection attributes (sent when CLIENT_CONNECT_ATTRS is negotiated).
    pub attributes: &'a [(String, String)],
}

impl HandshakeResponseMessage<'_> {
    fn has(&self, flag: u32) -> bool {
        self.capabilities & flag != 0
    }

    fn attributes_len(&self) -> usize {
        self.attributes
            .iter()
            .map(|(k, v)| lenenc_bytes_wire_size(k.len()) + lenenc_bytes_wire_size(v.len()))
            .sum()
    }
}

impl Message for HandshakeResponseMessage<'_> {
    fn wire_size(&self) -> usize {
        let mut size = 0;

        size += 4; // capability flags
        size += 4; // max packet size
        size += 1; // charset
        size += 23; // reserved
        size += null_terminated_wire_size(self.username);

        if self.has(CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA) {
            size += lenenc_bytes_wire_size(self.auth_response.len());
        } else {
            size += 1 + self.auth_response.len();
        }

        if let Some(db) = self.database.filter(|_| self.has(CLIENT_CONNECT_WITH_DB)) {
            size += null_terminated_wire_size(db);
        }

        if self.has(CLIENT_PLUGIN_AUTH) {
            size += null_terminated_wire_size(self.auth_plugin);
        }

        if self.has(CLIENT_CONNECT_ATTRS) {
            size += lenenc_bytes_wire_size(self.attributes_len());
        }

        size
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_u32_le(self.capabilities);
        buf.write_u32_le(self.max_packet_size);
        buf.write_u8(self.charset);
        buf.write_zeros(23);
        buf.write_null_terminated(self.username);

        if self.has(CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA) {
            buf.write_lenenc_bytes(self.auth_response);
        } else {
            // CLIENT_SECURE_CONNECTION: one length byte
            buf.write_u8(self.auth_response.len() as u8);
            buf.write_bytes(self.auth_response);
        }

        if let Some(db) = self.database.filter(|_| self.has(CLIENT_CONNECT_WITH_DB)) {
            buf.write_null_terminated(db);
        }

        if self.has(CLIENT_PLUGIN_AUTH) {
            buf.write_null_terminated(self.auth_plugin);
        }

        if self.has(CLIENT_CONNECT_ATTRS) {
            buf.write_lenenc_int(self.attributes_len() as u64);
            for (key, value) in self.attributes {
                buf.write_lenenc_bytes(key.as_bytes());
                buf.write_lenenc_bytes(value.as_bytes());
            }
        }

        Ok(())
    }
}

// ============================================================================
// AuthDataMessage - raw auth plugin data
// ============================================================================

/// Raw authentication data: AuthSwitchRequest answers and caching_sha2
/// full-auth packets.
pub struct AuthDataMessage<'a> {
    pub data: &'a [u8],
}

impl Message for AuthDataMessage<'_> {
    fn wire_size(&self) -> usize {
        self.data.len()
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_bytes(self.data);
        Ok(())
    }
}
