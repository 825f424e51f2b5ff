//! Key-value store abstraction used by the cache-aside wrapper.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Failures reported by a cache backend or while decoding a cached blob.
///
/// None of these are retried; they propagate to the caller as-is.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to connect to cache store at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cache store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache store rejected the request: {0}")]
    Server(String),
    #[error("unexpected reply from cache store: {0}")]
    Protocol(String),
    #[error("invalid cache key `{key}`: {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("cached value could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("workload failed: {0}")]
    Workload(String),
}

impl CacheError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn workload(message: impl Into<String>) -> Self {
        Self::Workload(message.into())
    }

    /// True when the store itself could not be reached or talked to.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Io(_))
    }
}

/// Minimal capability set of a remote key-value store.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Fetch the blob stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Store `value` under `key` for `ttl_seconds`, replacing any existing
    /// entry. A TTL of zero never expires.
    async fn set(&self, key: &str, value: Bytes, ttl_seconds: u32) -> Result<(), CacheError>;

    /// Remove every entry regardless of key prefix.
    async fn flush_all(&self) -> Result<(), CacheError>;
}
