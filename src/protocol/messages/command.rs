//! Command-phase messages.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{CommandMessage, Message, WriteExt};

/// COM_QUERY: run a text-protocol statement.
pub struct QueryMessage<'a> {
    /// SQL text, sent verbatim.
    pub sql: &'a str,
}

impl<'a> QueryMessage<'a> {
    /// Create a new query message.
    pub fn new(sql: &'a str) -> Self {
        Self { sql }
    }
}

impl Message for QueryMessage<'_> {
    fn wire_size(&self) -> usize {
        1 + self.sql.len()
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_u8(COM_QUERY);
        buf.write_bytes(self.sql.as_bytes());
        Ok(())
    }
}

impl CommandMessage for QueryMessage<'_> {
    fn command(&self) -> u8 {
        COM_QUERY
    }
}

/// COM_PING: check that the server is alive.
pub struct PingMessage;

impl Message for PingMessage {
    fn wire_size(&self) -> usize {
        1
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_u8(COM_PING);
        Ok(())
    }
}

impl CommandMessage for PingMessage {
    fn command(&self) -> u8 {
        COM_PING
    }
}

/// COM_QUIT: ask the server to close the session. No response follows.
pub struct QuitMessage;

impl Message for QuitMessage {
    fn wire_size(&self) -> usize {
        1
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_u8(COM_QUIT);
        Ok(())
    }
}

impl CommandMessage for QuitMessage {
    fn command(&self) -> u8 {
        COM_QUIT
    }
}
