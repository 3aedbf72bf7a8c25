//! MySQL packet framing and I/O.

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::message::{write_packet_header, CommandMessage, Message};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

/// A logical MySQL packet (continuation frames already joined).
#[derive(Debug, Clone)]
pub struct Packet {
    /// Sequence id of the first frame.
    pub sequence_id: u8,
    /// Packet payload (excluding header).
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(sequence_id: u8, payload: Bytes) -> Self {
        Self {
            sequence_id,
            payload,
        }
    }

    /// First payload byte, used to tell OK/ERR/EOF and data packets apart.
    pub fn header(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Check if this is an ERR packet.
    pub fn is_err(&self) -> bool {
        self.header() == Some(ERR_HEADER)
    }

    /// Check if this is an OK packet (0x00 header).
    pub fn is_ok(&self) -> bool {
        self.header() == Some(OK_HEADER)
    }

    /// Check if this is an EOF packet (0xFE header, short payload).
    pub fn is_eof(&self) -> bool {
        self.header() == Some(EOF_HEADER) && self.payload.len() < EOF_MAX_LENGTH
    }

    /// Check if this terminates a result set: an EOF packet, or an OK packet
    /// with 0xFE header when CLIENT_DEPRECATE_EOF is negotiated.
    pub fn is_result_set_end(&self, deprecate_eof: bool) -> bool {
        if deprecate_eof {
            self.header() == Some(EOF_HEADER) && self.payload.len() < MAX_PACKET_PAYLOAD
        } else {
            self.is_eof()
        }
    }
}

/// MySQL packet reader/writer.
///
/// Tracks the sequence id shared by both directions within one command.
pub struct PacketStream<S = TcpStream> {
    stream: S,
    /// Next expected/sent sequence id.
    sequence_id: u8,
    /// Partial buffer for incomplete frames.
    partial_buf: BytesMut,
}

impl<S> PacketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new packet stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            sequence_id: 0,
            partial_buf: BytesMut::with_capacity(4096),
        }
    }

    /// Get the underlying stream.
    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Current sequence id.
    pub fn sequence_id(&self) -> u8 {
        self.sequence_id
    }

    /// Reset the sequence id, done at the start of every command.
    pub fn reset_sequence(&mut self) {
        self.sequence_id = 0;
    }

    async fn fill(&mut self, needed: usize) -> Result<()> {
        while self.partial_buf.len() < needed {
            let n = self.stream.read_buf(&mut self.partial_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
        Ok(())
    }

    /// Read one frame: (sequence id, payload).
    async fn read_frame(&mut self) -> Result<(u8, BytesMut)> {
        self.fill(PACKET_HEADER_SIZE).await?;
        let payload_len = u32::from_le_bytes([
            self.partial_buf[0],
            self.partial_buf[1],
            self.partial_buf[2],
            0,
        ]) as usize;
        let sequence_id = self.partial_buf[3];

        self.fill(PACKET_HEADER_SIZE + payload_len).await?;
        let mut frame = self.partial_buf.split_to(PACKET_HEADER_SIZE + payload_len);
        let payload = frame.split_off(PACKET_HEADER_SIZE);

        if sequence_id != self.sequence_id {
            return Err(Error::PacketOutOfOrder {
                expected: self.sequence_id,
                actual: sequence_id,
            });
        }
        self.sequence_id = sequence_id.wrapping_add(1);

        Ok((sequence_id, payload))
    }

    /// Read a packet from the stream, joining continuation frames.
    pub async fn read_packet(&mut self) -> Result<Packet> {
        let (sequence_id, mut payload) = self.read_frame().await?;
        let mut last_len = payload.len();

        while last_len == MAX_PACKET_PAYLOAD {
            let (_, more) = self.read_frame().await?;
            last_len = more.len();
            payload.extend_from_slice(&more);
        }

        trace!(sequence_id, len = payload.len(), "read packet");
        Ok(Packet {
            sequence_id,
            payload: payload.freeze(),
        })
    }

    /// Write a raw payload, splitting it into frames as needed.
    pub async fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        let frames = payload.len() / MAX_PACKET_PAYLOAD + 1;
        let mut buf = Vec::with_capacity(payload.len() + frames * PACKET_HEADER_SIZE);

        let mut chunks = payload.chunks(MAX_PACKET_PAYLOAD);
        loop {
            let chunk = chunks.next().unwrap_or(&[]);
            write_packet_header(&mut buf, chunk.len(), self.sequence_id);
            buf.extend_from_slice(chunk);
            self.sequence_id = self.sequence_id.wrapping_add(1);
            // A full frame must be followed by another, possibly empty, frame.
            if chunk.len() < MAX_PACKET_PAYLOAD {
                break;
            }
        }

        trace!(len = payload.len(), "write packet");
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Send a message as the next packet in the current sequence.
    pub async fn send_message<M: Message>(&mut self, msg: &M) -> Result<()> {
        let mut payload = Vec::with_capacity(msg.wire_size());
        msg.write_to(&mut payload)?;
        self.write_payload(&payload).await
    }

    /// Send a command, starting a new sequence.
    pub async fn send_command<M: CommandMessage>(&mut self, msg: &M) -> Result<()> {
        trace!(command = msg.command(), "send command");
        self.reset_sequence();
        self.send_message(msg).await
    }

    /// Shut down the write side of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Capability flags negotiated for a connection.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Flags the client asks for.
    pub client_flags: u32,
    /// Flags advertised by the server.
    pub server_flags: u32,
    /// Flags in effect (intersection).
    pub flags: u32,
    /// Largest packet the client accepts.
    pub max_packet_size: u32,
    /// Connection collation id.
    pub charset: u8,
}

impl Capabilities {
    /// Create the client's default capabilities.
    pub fn new(connect_with_db: bool) -> Self {
        let mut client_flags = CLIENT_LONG_PASSWORD
            | CLIENT_LONG_FLAG
            | CLIENT_PROTOCOL_41
            | CLIENT_TRANSACTIONS
            | CLIENT_SECURE_CONNECTION
            | CLIENT_MULTI_RESULTS
            | CLIENT_PLUGIN_AUTH
            | CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA
            | CLIENT_CONNECT_ATTRS
            | CLIENT_DEPRECATE_EOF;
        if connect_with_db {
            client_flags |= CLIENT_CONNECT_WITH_DB;
        }

        Self {
            client_flags,
            server_flags: 0,
            flags: client_flags,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            charset: CHARSET_UTF8MB4_GENERAL_CI,
        }
    }

    /// Intersect with the server's flags.
    pub fn negotiate(&mut self, server_flags: u32) -> Result<()> {
        if server_flags & CLIENT_PROTOCOL_41 == 0 {
            return Err(Error::MissingCapability {
                name: "CLIENT_PROTOCOL_41",
            });
        }
        if server_flags & CLIENT_SECURE_CONNECTION == 0 {
            return Err(Error::MissingCapability {
                name: "CLIENT_SECURE_CONNECTION",
            });
        }
        self.server_flags = server_flags;
        self.flags = self.client_flags & server_flags;
        Ok(())
    }

    /// Check whether a flag is in effect.
    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Whether result sets end with an OK packet instead of EOF.
    pub fn deprecate_eof(&self) -> bool {
        self.has(CLIENT_DEPRECATE_EOF)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new(true)
    }
}
