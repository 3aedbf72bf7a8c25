//! Client message definitions.
//!
//! Each message implements the `Message` trait for single-allocation serialization.

pub mod command;
pub mod handshake;

pub use command::{PingMessage, QueryMessage, QuitMessage};
pub use handshake::{AuthDataMessage, HandshakeResponseMessage};
