//! In-process mock MySQL server for integration tests.
//!
//! Speaks just enough of the protocol for the product listing: handshake,
//! native/caching_sha2 authentication (with optional auth switch), COM_PING,
//! COM_QUIT and `SELECT * FROM product`. Listens on TCP or a Unix socket.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use bytes::Bytes;
use mysql_thin_rs::protocol::buffer::{ReadBuffer, WriteBuffer};
use mysql_thin_rs::protocol::constants::*;
use mysql_thin_rs::protocol::crypto::{scramble_caching_sha2, scramble_native_password};
use mysql_thin_rs::protocol::message::write_packet_header;
use mysql_thin_rs::{ConnectParams, DriverConfig};
use rand::Rng;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How the mock authenticates clients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockAuth {
    /// Greets with mysql_native_password.
    Native,
    /// Greets with caching_sha2_password and answers with the fast path.
    CachingSha2Fast,
    /// Greets with caching_sha2_password and demands full authentication:
    /// cleartext over a Unix socket, RSA-encrypted over TCP.
    CachingSha2Full,
    /// Greets with caching_sha2_password, then switches to native.
    SwitchToNative,
}

/// Mock server behaviour.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub username: String,
    pub password: String,
    pub database: String,
    pub auth: MockAuth,
    pub deprecate_eof: bool,
    /// Rows of the product table; `None` means the table does not exist.
    pub products: Option<Vec<(String, Option<String>)>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            username: "root".to_string(),
            password: "password".to_string(),
            database: "ecommerce".to_string(),
            auth: MockAuth::Native,
            deprecate_eof: true,
            products: Some(Vec::new()),
        }
    }
}

impl MockConfig {
    pub fn with_products(mut self, rows: &[(i64, Option<&str>)]) -> Self {
        self.products = Some(
            rows.iter()
                .map(|(id, name)| (id.to_string(), name.map(str::to_string)))
                .collect(),
        );
        self
    }

    pub fn without_product_table(mut self) -> Self {
        self.products = None;
        self
    }

    pub fn with_auth(mut self, auth: MockAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_eof_packets(mut self) -> Self {
        self.deprecate_eof = false;
        self
    }
}

/// What the mock observed.
#[derive(Debug, Default)]
pub struct MockState {
    pub connections: AtomicUsize,
    pub authenticated: AtomicUsize,
    pub quits: AtomicUsize,
    /// caching_sha2 public key requests answered.
    pub key_requests: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
    pub attributes: Mutex<Vec<(String, String)>>,
}

impl MockState {
    /// Wait until `n` sessions sent COM_QUIT, or a second passes.
    pub async fn wait_for_quits(&self, n: usize) -> usize {
        for _ in 0..100 {
            if self.quits.load(Ordering::SeqCst) >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.quits.load(Ordering::SeqCst)
    }
}

pub struct MockServer {
    /// TCP address, unless listening on a Unix socket.
    pub addr: Option<SocketAddr>,
    /// Unix socket path, unless listening on TCP.
    pub socket: Option<PathBuf>,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub async fn start(config: MockConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(MockState::default());

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let config = config.clone();
                let state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    let _ = serve(socket, &config, &state, false).await;
                });
            }
        });

        Self {
            addr: Some(addr),
            socket: None,
            state,
        }
    }

    /// Listen on a fresh Unix socket, which counts as a secure transport.
    #[cfg(unix)]
    pub async fn start_unix(config: MockConfig) -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "mysql-thin-rs-{}-{}.sock",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();
        let state = Arc::new(MockState::default());

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let config = config.clone();
                let state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    let _ = serve(socket, &config, &state, true).await;
                });
            }
        });

        Self {
            addr: None,
            socket: Some(path),
            state,
        }
    }

    /// Parameters pointing at this server with the default credentials.
    pub fn params(&self) -> ConnectParams {
        let params = match (&self.socket, self.addr) {
            (Some(path), _) => ConnectParams::new("localhost", DEFAULT_PORT).with_socket(path),
            (None, Some(addr)) => ConnectParams::new("127.0.0.1", addr.port()),
            (None, None) => unreachable!("mock server without listener"),
        };
        params
            .with_credentials("root", "password")
            .with_database("ecommerce")
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            params: self.params(),
            ..DriverConfig::default()
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(path) = &self.socket {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// RSA key pair the mock hands out for caching_sha2 full authentication.
fn server_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::from_pkcs8_pem(include_str!("../data/server_key.pem")).unwrap())
}

/// A port on localhost with nothing listening.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn random_scramble() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..SCRAMBLE_LENGTH).map(|_| rng.gen_range(b'!'..=b'~')).collect()
}

async fn read_packet<S>(socket: &mut S) -> Result<Option<(u8, Bytes)>, BoxError>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match socket.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    let mut payload = vec![0u8; len];
    socket.read_exact(&mut payload).await?;
    Ok(Some((header[3], Bytes::from(payload))))
}

async fn write_packet<S>(socket: &mut S, seq: u8, payload: &[u8]) -> Result<(), BoxError>
where
    S: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(payload.len() + 4);
    write_packet_header(&mut buf, payload.len(), seq);
    buf.extend_from_slice(payload);
    socket.write_all(&buf).await?;
    Ok(())
}

fn ok_packet(header: u8, status: u16) -> Vec<u8> {
    let mut buf = WriteBuffer::new();
    buf.write_u8(header);
    buf.write_lenenc_int(0);
    buf.write_lenenc_int(0);
    buf.write_u16_le(status);
    buf.write_u16_le(0);
    buf.as_bytes().to_vec()
}

fn err_packet(code: u16, sql_state: &str, message: &str) -> Vec<u8> {
    let mut buf = WriteBuffer::new();
    buf.write_u8(ERR_HEADER);
    buf.write_u16_le(code);
    buf.write_u8(b'#');
    buf.write_bytes(sql_state.as_bytes());
    buf.write_bytes(message.as_bytes());
    buf.as_bytes().to_vec()
}

fn eof_packet(status: u16) -> Vec<u8> {
    let mut buf = WriteBuffer::new();
    buf.write_u8(EOF_HEADER);
    buf.write_u16_le(0);
    buf.write_u16_le(status);
    buf.as_bytes().to_vec()
}

fn column_definition(name: &str, column_type: u8, charset: u16, flags: u16) -> Vec<u8> {
    let mut buf = WriteBuffer::new();
    buf.write_lenenc_bytes(b"def");
    buf.write_lenenc_bytes(b"ecommerce");
    buf.write_lenenc_bytes(b"product");
    buf.write_lenenc_bytes(b"product");
    buf.write_lenenc_bytes(name.as_bytes());
    buf.write_lenenc_bytes(name.as_bytes());
    buf.write_lenenc_int(0x0C);
    buf.write_u16_le(charset);
    buf.write_u32_le(if column_type == MYSQL_TYPE_LONG { 11 } else { 1020 });
    buf.write_u8(column_type);
    buf.write_u16_le(flags);
    buf.write_u8(0);
    buf.write_zeros(2);
    buf.as_bytes().to_vec()
}

fn greeting(connection_id: u32, scramble: &[u8], caps: u32, plugin: &str) -> Vec<u8> {
    let mut buf = WriteBuffer::new();
    buf.write_u8(HANDSHAKE_PROTOCOL_VERSION);
    buf.write_null_terminated("8.0.36-mock");
    buf.write_u32_le(connection_id);
    buf.write_bytes(&scramble[..8]);
    buf.write_u8(0);
    buf.write_u16_le(caps as u16);
    buf.write_u8(CHARSET_UTF8MB4_GENERAL_CI);
    buf.write_u16_le(SERVER_STATUS_AUTOCOMMIT);
    buf.write_u16_le((caps >> 16) as u16);
    buf.write_u8(SCRAMBLE_LENGTH as u8 + 1);
    buf.write_zeros(10);
    buf.write_bytes(&scramble[8..]);
    buf.write_u8(0);
    buf.write_null_terminated(plugin);
    buf.as_bytes().to_vec()
}

struct HandshakeResponse {
    capabilities: u32,
    username: String,
    auth_response: Bytes,
    database: Option<String>,
    attributes: Vec<(String, String)>,
}

fn parse_handshake_response(payload: Bytes) -> Result<HandshakeResponse, BoxError> {
    let mut buf = ReadBuffer::new(payload);
    let capabilities = buf.read_u32_le()?;
    let _max_packet = buf.read_u32_le()?;
    let _charset = buf.read_u8()?;
    buf.skip(23)?;
    let username = buf.read_null_terminated_str()?;
    let auth_response = if capabilities & CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
        buf.read_lenenc_bytes()?.unwrap_or_default()
    } else {
        let len = buf.read_u8()? as usize;
        buf.read_bytes(len)?
    };
    let database = if capabilities & CLIENT_CONNECT_WITH_DB != 0 {
        Some(buf.read_null_terminated_str()?)
    } else {
        None
    };
    if capabilities & CLIENT_PLUGIN_AUTH != 0 {
        let _plugin = buf.read_null_terminated_str()?;
    }
    let mut attributes = Vec::new();
    if capabilities & CLIENT_CONNECT_ATTRS != 0 {
        let _total = buf.read_lenenc_u64()?;
        while buf.has_remaining(1) {
            let key = buf.read_lenenc_str()?;
            let value = buf.read_lenenc_str()?;
            attributes.push((key, value));
        }
    }
    Ok(HandshakeResponse {
        capabilities,
        username,
        auth_response,
        database,
        attributes,
    })
}

async fn serve<S>(mut socket: S, config: &MockConfig, state: &MockState, secure: bool) -> Result<(), BoxError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let connection_id = state.connections.fetch_add(1, Ordering::SeqCst) as u32 + 1;

    let mut server_caps = CLIENT_LONG_PASSWORD
        | CLIENT_LONG_FLAG
        | CLIENT_CONNECT_WITH_DB
        | CLIENT_PROTOCOL_41
        | CLIENT_TRANSACTIONS
        | CLIENT_SECURE_CONNECTION
        | CLIENT_MULTI_RESULTS
        | CLIENT_PLUGIN_AUTH
        | CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA
        | CLIENT_CONNECT_ATTRS;
    if config.deprecate_eof {
        server_caps |= CLIENT_DEPRECATE_EOF;
    }

    let scramble = random_scramble();
    let plugin = match config.auth {
        MockAuth::Native => AUTH_NATIVE_PASSWORD,
        _ => AUTH_CACHING_SHA2_PASSWORD,
    };
    write_packet(&mut socket, 0, &greeting(connection_id, &scramble, server_caps, plugin)).await?;

    let Some((_, payload)) = read_packet(&mut socket).await? else {
        return Ok(());
    };
    let response = parse_handshake_response(payload)?;
    *state.attributes.lock().unwrap() = response.attributes.clone();
    let deprecate_eof = response.capabilities & server_caps & CLIENT_DEPRECATE_EOF != 0;

    let password = config.password.as_bytes();
    let denied = err_packet(
        1045,
        "28000",
        &format!(
            "Access denied for user '{}'@'localhost' (using password: YES)",
            response.username
        ),
    );

    let mut seq = 2u8;
    let accepted = response.username == config.username
        && match config.auth {
            MockAuth::Native => response.auth_response[..] == scramble_native_password(password, &scramble)[..],
            MockAuth::CachingSha2Fast => {
                let ok = response.auth_response[..] == scramble_caching_sha2(password, &scramble)[..];
                if ok {
                    write_packet(&mut socket, seq, &[AUTH_MORE_DATA_HEADER, CACHING_SHA2_FAST_AUTH_SUCCESS]).await?;
                    seq += 1;
                }
                ok
            }
            MockAuth::CachingSha2Full => {
                // Cold cache: the scramble is not checked, the password is
                write_packet(&mut socket, seq, &[AUTH_MORE_DATA_HEADER, CACHING_SHA2_PERFORM_FULL_AUTH]).await?;
                let Some((_, data)) = read_packet(&mut socket).await? else {
                    return Ok(());
                };
                seq += 2;

                let cleartext = if secure {
                    data.to_vec()
                } else if data[..] == [CACHING_SHA2_REQUEST_PUBLIC_KEY] {
                    state.key_requests.fetch_add(1, Ordering::SeqCst);
                    let pem = server_key()
                        .to_public_key()
                        .to_public_key_pem(LineEnding::LF)
                        .map_err(|e| e.to_string())?;
                    let mut key_packet = vec![AUTH_MORE_DATA_HEADER];
                    key_packet.extend_from_slice(pem.as_bytes());
                    write_packet(&mut socket, seq, &key_packet).await?;

                    let Some((_, encrypted)) = read_packet(&mut socket).await? else {
                        return Ok(());
                    };
                    seq += 2;
                    let mut plain = server_key()
                        .decrypt(Oaep::new::<sha1::Sha1>(), &encrypted)
                        .unwrap_or_default();
                    for (i, byte) in plain.iter_mut().enumerate() {
                        *byte ^= scramble[i % scramble.len()];
                    }
                    plain
                } else {
                    // Plain password over TCP is refused
                    Vec::new()
                };

                let mut expected = password.to_vec();
                expected.push(0);
                cleartext == expected
            }
            MockAuth::SwitchToNative => {
                let switch_scramble = random_scramble();
                let mut switch = WriteBuffer::new();
                switch.write_u8(EOF_HEADER);
                switch.write_null_terminated(AUTH_NATIVE_PASSWORD);
                switch.write_bytes(&switch_scramble);
                switch.write_u8(0);
                write_packet(&mut socket, seq, switch.as_bytes()).await?;

                let Some((_, data)) = read_packet(&mut socket).await? else {
                    return Ok(());
                };
                seq += 2;
                data[..] == scramble_native_password(password, &switch_scramble)[..]
            }
        };

    if !accepted {
        write_packet(&mut socket, seq, &denied).await?;
        return Ok(());
    }
    if let Some(db) = &response.database {
        if *db != config.database {
            let unknown = err_packet(1049, "42000", &format!("Unknown database '{}'", db));
            write_packet(&mut socket, seq, &unknown).await?;
            return Ok(());
        }
    }
    write_packet(&mut socket, seq, &ok_packet(OK_HEADER, SERVER_STATUS_AUTOCOMMIT)).await?;
    state.authenticated.fetch_add(1, Ordering::SeqCst);

    // Command phase
    while let Some((_, payload)) = read_packet(&mut socket).await? {
        match payload.first().copied() {
            Some(COM_QUIT) => {
                state.quits.fetch_add(1, Ordering::SeqCst);
                return Ok(());
            }
            Some(COM_PING) => {
                write_packet(&mut socket, 1, &ok_packet(OK_HEADER, SERVER_STATUS_AUTOCOMMIT)).await?;
            }
            Some(COM_QUERY) => {
                let sql = String::from_utf8_lossy(&payload[1..]).into_owned();
                state.queries.lock().unwrap().push(sql.clone());
                answer_query(&mut socket, config, &sql, deprecate_eof).await?;
            }
            _ => {
                write_packet(&mut socket, 1, &err_packet(1047, "08S01", "Unknown command")).await?;
            }
        }
    }
    Ok(())
}

async fn answer_query<S>(
    socket: &mut S,
    config: &MockConfig,
    sql: &str,
    deprecate_eof: bool,
) -> Result<(), BoxError>
where
    S: AsyncWrite + Unpin,
{
    if !sql.trim().eq_ignore_ascii_case("SELECT * FROM product") {
        let msg = format!("You have an error in your SQL syntax near '{}'", sql);
        return write_packet(socket, 1, &err_packet(1064, "42000", &msg)).await;
    }
    let Some(products) = &config.products else {
        let msg = format!("Table '{}.product' doesn't exist", config.database);
        return write_packet(socket, 1, &err_packet(1146, "42S02", &msg)).await;
    };

    let mut out = Vec::new();
    let mut seq = 1u8;
    let mut push = |out: &mut Vec<u8>, payload: &[u8]| {
        write_packet_header(out, payload.len(), seq);
        out.extend_from_slice(payload);
        seq = seq.wrapping_add(1);
    };

    push(&mut out, &[0x02]);
    push(
        &mut out,
        &column_definition("id", MYSQL_TYPE_LONG, CHARSET_BINARY, NOT_NULL_FLAG | PRI_KEY_FLAG),
    );
    push(
        &mut out,
        &column_definition("name", MYSQL_TYPE_VAR_STRING, CHARSET_UTF8MB4_GENERAL_CI as u16, 0),
    );
    if !deprecate_eof {
        push(&mut out, &eof_packet(SERVER_STATUS_AUTOCOMMIT));
    }

    for (id, name) in products {
        let mut row = WriteBuffer::new();
        row.write_lenenc_bytes(id.as_bytes());
        match name {
            Some(name) => row.write_lenenc_bytes(name.as_bytes()),
            None => row.write_u8(LENENC_NULL),
        }
        push(&mut out, row.as_bytes());
    }

    if deprecate_eof {
        push(&mut out, &ok_packet(EOF_HEADER, SERVER_STATUS_AUTOCOMMIT));
    } else {
        push(&mut out, &eof_packet(SERVER_STATUS_AUTOCOMMIT));
    }

    socket.write_all(&out).await?;
    Ok(())
}
