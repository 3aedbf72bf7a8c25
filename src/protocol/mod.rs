//! MySQL client/server protocol implementation.

pub mod auth;
pub mod buffer;
pub mod connect;
pub mod constants;
pub mod crypto;
pub mod message;
pub mod messages;
pub mod packet;
pub mod response;
pub mod transport;
pub mod types;

pub use buffer::{ReadBuffer, WriteBuffer};
pub use message::{CommandMessage, Message, WriteExt};
pub use messages::{
    AuthDataMessage, HandshakeResponseMessage, PingMessage, QueryMessage, QuitMessage,
};
pub use packet::{Capabilities, Packet, PacketStream};
pub use response::{OkPacket, QueryResponse};
pub use transport::Transport;
pub use types::{Column, ColumnInfo, ColumnMetadata, MysqlType, MysqlValue, Row};
