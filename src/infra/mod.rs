//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod error;
pub mod http;
pub mod memcached;
pub mod telemetry;

use std::sync::Arc;

use tracing::info;

use crate::cache::{CacheBackend, CacheClient, CacheConfig, InMemoryCache};

use memcached::MemcachedClient;

/// Build the process-wide cache client selected by `config`.
pub fn connect_cache(config: &CacheConfig) -> Arc<dyn CacheClient> {
    match config.backend {
        CacheBackend::Memcached => {
            info!(
                target = "cache_aside_demo::cache",
                backend = config.backend.as_str(),
                addr = %config.address(),
                "Using memcached cache store"
            );
            Arc::new(MemcachedClient::from_config(config))
        }
        CacheBackend::Memory => {
            info!(
                target = "cache_aside_demo::cache",
                backend = config.backend.as_str(),
                "Using in-process cache store"
            );
            Arc::new(InMemoryCache::new())
        }
    }
}
