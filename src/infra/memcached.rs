//! Memcached client speaking the ASCII protocol over one TCP connection.
//!
//! Only the three commands the cache-aside layer needs are implemented:
//! `get`, `set` and `flush_all`. The connection is opened lazily and shared
//! behind an async mutex. Any transport or framing failure drops it so the
//! next call reconnects; the failing call still returns its error.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheClient, CacheConfig, CacheError};

const MAX_KEY_LEN: usize = 250;

/// Memcached-backed [`CacheClient`].
pub struct MemcachedClient {
    addr: String,
    connect_timeout: Duration,
    conn: Mutex<Option<Connection<TcpStream>>>,
}

impl MemcachedClient {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            conn: Mutex::new(None),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.address(), config.connect_timeout)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> Result<Connection<TcpStream>, CacheError> {
        let attempt = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr));
        let stream = match attempt.await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(CacheError::Connect {
                    addr: self.addr.clone(),
                    source,
                });
            }
            Err(_) => {
                return Err(CacheError::Connect {
                    addr: self.addr.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "connect timed out",
                    ),
                });
            }
        };
        stream.set_nodelay(true)?;
        debug!(target = "cache_aside_demo::memcached", addr = %self.addr, "connected");
        Ok(Connection::new(stream))
    }
}

/// Run `$call` on the shared connection, opening it first if needed.
///
/// The connection is taken out of the slot for the duration of the exchange
/// and only put back once a reply has been fully read. A call that is
/// cancelled mid-exchange, or that leaves the stream in an unknown state,
/// leaves the slot empty so the next call reconnects.
macro_rules! with_connection {
    ($client:expr, |$conn:ident| $call:expr) => {{
        let mut guard = $client.conn.lock().await;
        let mut $conn = match guard.take() {
            Some(conn) => conn,
            None => $client.connect().await?,
        };
        let result = $call.await;
        match &result {
            Err(err) if breaks_connection(err) => {
                warn!(
                    target = "cache_aside_demo::memcached",
                    addr = %$client.addr,
                    error = %err,
                    "dropping memcached connection"
                );
            }
            _ => *guard = Some($conn),
        }
        result
    }};
}

#[async_trait]
impl CacheClient for MemcachedClient {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        validate_key(key)?;
        with_connection!(self, |conn| conn.get(key))
    }

    async fn set(&self, key: &str, value: Bytes, ttl_seconds: u32) -> Result<(), CacheError> {
        validate_key(key)?;
        with_connection!(self, |conn| conn.set(key, &value, ttl_seconds))
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        with_connection!(self, |conn| conn.flush_all())
    }
}

fn breaks_connection(err: &CacheError) -> bool {
    matches!(err, CacheError::Io(_) | CacheError::Protocol(_))
}

/// Reject keys memcached would refuse or misparse.
pub fn validate_key(key: &str) -> Result<(), CacheError> {
    let reason = if key.is_empty() {
        Some("key is empty")
    } else if key.len() > MAX_KEY_LEN {
        Some("key exceeds 250 bytes")
    } else if key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        Some("key contains whitespace or control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CacheError::InvalidKey {
            key: key.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// One parsed reply header line.
#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Value { key: String, len: usize },
    End,
    Stored,
    NotStored,
    Ok,
    Error(String),
}

fn parse_reply(line: &[u8]) -> Result<Reply, CacheError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| CacheError::protocol("reply line is not valid UTF-8"))?;

    let mut parts = text.split(' ');
    match parts.next().unwrap_or_default() {
        "VALUE" => {
            let key = parts
                .next()
                .ok_or_else(|| CacheError::protocol(format!("missing key in `{text}`")))?;
            let _flags = parts
                .next()
                .ok_or_else(|| CacheError::protocol(format!("missing flags in `{text}`")))?;
            let len = parts
                .next()
                .and_then(|value| value.parse::<usize>().ok())
                .ok_or_else(|| CacheError::protocol(format!("bad length in `{text}`")))?;
            Ok(Reply::Value {
                key: key.to_string(),
                len,
            })
        }
        "END" => Ok(Reply::End),
        "STORED" => Ok(Reply::Stored),
        "NOT_STORED" => Ok(Reply::NotStored),
        "OK" => Ok(Reply::Ok),
        "ERROR" => Ok(Reply::Error("unknown command".to_string())),
        "CLIENT_ERROR" | "SERVER_ERROR" => Ok(Reply::Error(text.to_string())),
        _ => Err(CacheError::protocol(format!("unrecognised reply `{text}`"))),
    }
}

/// A framed memcached stream.
struct Connection<S> {
    stream: BufStream<S>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
        }
    }

    async fn get(&mut self, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.send(format!("get {key}\r\n").as_bytes(), None).await?;

        let mut found = None;
        loop {
            match parse_reply(&self.read_line().await?)? {
                Reply::End => return Ok(found),
                Reply::Value { key: got, len } => {
                    let data = self.read_data(len).await?;
                    if got != key {
                        return Err(CacheError::protocol(format!(
                            "asked for `{key}`, server returned `{got}`"
                        )));
                    }
                    found = Some(data);
                }
                Reply::Error(message) => return Err(CacheError::Server(message)),
                other => {
                    return Err(CacheError::protocol(format!(
                        "unexpected reply to get: {other:?}"
                    )));
                }
            }
        }
    }

    async fn set(&mut self, key: &str, value: &[u8], ttl_seconds: u32) -> Result<(), CacheError> {
        let header = format!("set {key} 0 {ttl_seconds} {}\r\n", value.len());
        self.send(header.as_bytes(), Some(value)).await?;

        match parse_reply(&self.read_line().await?)? {
            Reply::Stored => Ok(()),
            Reply::NotStored => Err(CacheError::Server("NOT_STORED".to_string())),
            Reply::Error(message) => Err(CacheError::Server(message)),
            other => Err(CacheError::protocol(format!(
                "unexpected reply to set: {other:?}"
            ))),
        }
    }

    async fn flush_all(&mut self) -> Result<(), CacheError> {
        self.send(b"flush_all\r\n", None).await?;

        match parse_reply(&self.read_line().await?)? {
            Reply::Ok => Ok(()),
            Reply::Error(message) => Err(CacheError::Server(message)),
            other => Err(CacheError::protocol(format!(
                "unexpected reply to flush_all: {other:?}"
            ))),
        }
    }

    async fn send(&mut self, header: &[u8], body: Option<&[u8]>) -> Result<(), CacheError> {
        self.stream.write_all(header).await?;
        if let Some(body) = body {
            self.stream.write_all(body).await?;
            self.stream.write_all(b"\r\n").await?;
        }
        self.stream.flush().await?;
        Ok(())
    }

    /// Read one `\r\n`-terminated line, without the terminator.
    async fn read_line(&mut self) -> Result<Vec<u8>, CacheError> {
        let mut line = Vec::new();
        let read = self.stream.read_until(b'\n', &mut line).await?;
        if read == 0 {
            return Err(CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "memcached closed the connection",
            )));
        }
        if !line.ends_with(b"\r\n") {
            return Err(CacheError::protocol("reply line not terminated by CRLF"));
        }
        line.truncate(line.len() - 2);
        Ok(line)
    }

    async fn read_data(&mut self, len: usize) -> Result<Bytes, CacheError> {
        let mut data = vec![0u8; len + 2];
        self.stream.read_exact(&mut data).await?;
        if !data.ends_with(b"\r\n") {
            return Err(CacheError::protocol("data block not terminated by CRLF"));
        }
        data.truncate(len);
        Ok(Bytes::from(data))
    }
}
