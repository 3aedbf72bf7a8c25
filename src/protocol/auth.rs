//! Pluggable authentication: mysql_native_password and caching_sha2_password.

use crate::error::{Error, Result};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::constants::*;
use crate::protocol::crypto::{encrypt_password_rsa, scramble_caching_sha2, scramble_native_password};
use crate::protocol::messages::AuthDataMessage;
use crate::protocol::packet::{Capabilities, PacketStream};
use crate::protocol::response::{parse_err, parse_ok, OkPacket};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Authentication credentials.
#[derive(Debug, Clone)]
pub struct AuthCredentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl AuthCredentials {
    /// Create new credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Supported authentication plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPlugin {
    /// SHA1 challenge-response.
    NativePassword,
    /// SHA256 challenge-response with server-side cache.
    CachingSha2Password,
}

impl AuthPlugin {
    /// Look up a plugin by the name the server uses.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            AUTH_NATIVE_PASSWORD => Ok(Self::NativePassword),
            AUTH_CACHING_SHA2_PASSWORD => Ok(Self::CachingSha2Password),
            other => Err(Error::UnsupportedAuthPlugin {
                plugin: other.to_string(),
            }),
        }
    }

    /// Plugin name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NativePassword => AUTH_NATIVE_PASSWORD,
            Self::CachingSha2Password => AUTH_CACHING_SHA2_PASSWORD,
        }
    }

    /// Compute the auth response for a password and server nonce.
    pub fn scramble(&self, password: &[u8], nonce: &[u8]) -> Vec<u8> {
        match self {
            Self::NativePassword => scramble_native_password(password, nonce),
            Self::CachingSha2Password => scramble_caching_sha2(password, nonce),
        }
    }
}

/// Parsed AuthSwitchRequest.
#[derive(Debug, PartialEq)]
pub struct AuthSwitchRequest {
    /// Plugin the server wants.
    pub plugin: String,
    /// Fresh nonce for that plugin.
    pub data: Vec<u8>,
}

/// Parse an AuthSwitchRequest (header 0xFE).
pub fn parse_auth_switch(payload: Bytes) -> Result<AuthSwitchRequest> {
    let mut buf = ReadBuffer::new(payload);
    let header = buf.read_u8()?;
    if header != EOF_HEADER {
        return Err(Error::UnexpectedPacket {
            expected: "AuthSwitchRequest",
            actual: header,
        });
    }
    let plugin = buf.read_null_terminated_str()?;
    let rest = buf.read_rest();
    let data = rest.strip_suffix(&[0u8]).unwrap_or(&rest[..]).to_vec();
    Ok(AuthSwitchRequest { plugin, data })
}

/// Drive the authentication exchange after the handshake response was sent.
///
/// Returns the final OK packet. The server may switch plugins any number of
/// times. `nonce` is the greeting scramble; a switch request replaces it.
pub async fn authenticate<S>(
    stream: &mut PacketStream<S>,
    creds: &AuthCredentials,
    caps: &Capabilities,
    initial: AuthPlugin,
    nonce: &[u8],
    secure_transport: bool,
) -> Result<OkPacket>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut plugin = initial;
    let mut nonce = nonce.to_vec();

    loop {
        let packet = stream.read_packet().await?;
        match packet.header() {
            Some(OK_HEADER) => {
                debug!(plugin = plugin.name(), "authenticated");
                return parse_ok(packet.payload, caps);
            }
            Some(ERR_HEADER) => return Err(parse_err(packet.payload)),
            Some(EOF_HEADER) => {
                let switch = parse_auth_switch(packet.payload)?;
                debug!(from = plugin.name(), to = %switch.plugin, "auth switch requested");
                plugin = AuthPlugin::from_name(&switch.plugin)?;
                nonce = switch.data;
                let response = plugin.scramble(creds.password.as_bytes(), &nonce);
                stream
                    .send_message(&AuthDataMessage { data: &response })
                    .await?;
            }
            Some(AUTH_MORE_DATA_HEADER) if plugin == AuthPlugin::CachingSha2Password => {
                match packet.payload.get(1).copied() {
                    Some(CACHING_SHA2_FAST_AUTH_SUCCESS) => {
                        debug!("caching_sha2_password fast auth succeeded");
                    }
                    Some(CACHING_SHA2_PERFORM_FULL_AUTH) => {
                        caching_sha2_full_auth(stream, creds, &nonce, secure_transport).await?;
                    }
                    other => {
                        return Err(Error::protocol(format!(
                            "Unexpected caching_sha2_password status {:?}",
                            other
                        )));
                    }
                }
            }
            Some(other) => {
                return Err(Error::UnexpectedPacket {
                    expected: "authentication result",
                    actual: other,
                });
            }
            None => return Err(Error::protocol("Empty authentication packet")),
        }
    }
}

/// Send the password for a caching_sha2_password full authentication.
///
/// A secure transport gets the NUL-terminated password as is. Otherwise the
/// server's RSA public key is requested and the password goes encrypted.
async fn caching_sha2_full_auth<S>(
    stream: &mut PacketStream<S>,
    creds: &AuthCredentials,
    nonce: &[u8],
    secure_transport: bool,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if secure_transport {
        debug!("caching_sha2_password full auth with cleartext password");
        let mut cleartext = creds.password.as_bytes().to_vec();
        cleartext.push(0);
        return stream
            .send_message(&AuthDataMessage { data: &cleartext })
            .await;
    }

    debug!("caching_sha2_password full auth, requesting server public key");
    stream
        .send_message(&AuthDataMessage {
            data: &[CACHING_SHA2_REQUEST_PUBLIC_KEY],
        })
        .await?;

    let packet = stream.read_packet().await?;
    match packet.header() {
        Some(AUTH_MORE_DATA_HEADER) => {}
        Some(ERR_HEADER) => return Err(parse_err(packet.payload)),
        other => {
            return Err(Error::UnexpectedPacket {
                expected: "server public key",
                actual: other.unwrap_or(0),
            });
        }
    }

    let encrypted = encrypt_password_rsa(creds.password.as_bytes(), nonce, &packet.payload[1..])?;
    stream
        .send_message(&AuthDataMessage { data: &encrypted })
        .await
}
