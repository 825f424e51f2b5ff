//! Cache backend configuration.

use std::time::Duration;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 11211;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

/// Which store backs the cache-aside wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// External memcached server.
    Memcached,
    /// Process-local map, lost on restart.
    Memory,
}

impl CacheBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheBackend::Memcached => "memcached",
            CacheBackend::Memory => "memory",
        }
    }
}

impl std::str::FromStr for CacheBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memcached" => Ok(CacheBackend::Memcached),
            "memory" => Ok(CacheBackend::Memory),
            other => Err(format!(
                "unknown cache backend `{other}` (expected memcached|memory)"
            )),
        }
    }
}

/// Resolved cache store settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memcached,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            host: settings.host.clone(),
            port: settings.port,
            connect_timeout: settings.connect_timeout,
        }
    }
}

impl CacheConfig {
    /// `host:port` as handed to the socket layer.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
