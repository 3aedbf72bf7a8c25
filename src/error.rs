//! Error types for the MySQL thin client.

use std::io;
use std::panic::Location;
use thiserror::Error;

/// Result type alias for MySQL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for MySQL thin client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during network communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Connection closed by the peer.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Connection timed out during TCP connect.
    #[error("Connection to {host}:{port} timed out after {timeout:?}")]
    ConnectionTimeout {
        host: String,
        port: u16,
        timeout: std::time::Duration,
    },

    /// DNS resolution failed.
    #[error("Failed to resolve hostname '{hostname}': {message}")]
    DnsResolutionFailed { hostname: String, message: String },

    /// Connection parameters cannot be used to build a client.
    #[error("Invalid connection parameters: {message}")]
    InvalidConnectParams { message: String },

    /// Invalid connection URL.
    #[error("Invalid connection URL: {message}")]
    InvalidConnectUrl { message: String },

    /// Protocol error.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Unexpected packet header received.
    #[error("Unexpected packet: expected {expected}, got header {actual:#04x}")]
    UnexpectedPacket { expected: &'static str, actual: u8 },

    /// Packet sequence id did not match.
    #[error("Packet out of order: expected sequence {expected}, got {actual}")]
    PacketOutOfOrder { expected: u8, actual: u8 },

    /// Server speaks an unsupported handshake protocol.
    #[error("Unsupported handshake protocol version {version} (expected 10)")]
    UnsupportedServerVersion { version: u8 },

    /// Server lacks a capability the client requires.
    #[error("Server does not support required capability {name}")]
    MissingCapability { name: &'static str },

    /// Authentication plugin requested by the server is not implemented.
    #[error("Unsupported authentication plugin: {plugin}")]
    UnsupportedAuthPlugin { plugin: String },

    /// Authentication failed on the client side.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Error packet sent by the server.
    #[error("ERROR {code} ({sql_state}): {message}")]
    Server {
        code: u16,
        sql_state: String,
        message: String,
    },

    /// Buffer too small.
    #[error("Buffer too small: need {needed} bytes, have {available} at {location}")]
    BufferTooSmall {
        needed: usize,
        available: usize,
        location: &'static Location<'static>,
    },

    /// Type conversion error.
    #[error("Type conversion error: {message}")]
    TypeConversion { message: String },

    /// Column not found.
    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },

    /// Feature the client does not implement.
    #[error("Unsupported: {message}")]
    Unsupported { message: String },
}

impl Error {
    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a server error.
    pub fn server(code: u16, sql_state: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            sql_state: sql_state.into(),
            message: message.into(),
        }
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Server error code, if this error came from an ERR packet.
    pub fn server_code(&self) -> Option<u16> {
        match self {
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}
