//! Cache-aside building blocks.
//!
//! - [`build_key`] / [`KeyArgs`]: deterministic keys from a name and arguments
//! - [`CacheClient`]: get / set-with-expiry / flush-all over a key-value store
//! - [`CacheAside`]: look up, or compute and store, reporting hit or miss
//!
//! The memcached backend lives in `infra::memcached`; [`InMemoryCache`] is a
//! process-local backend with the same contract.
//!
//! ```toml
//! [cache]
//! backend = "memcached"
//! host = "localhost"
//! port = 11211
//! ```

mod aside;
mod client;
mod codec;
mod config;
mod keys;
mod lock;
mod memory;

pub use aside::{CacheAside, function_name};
pub use client::{CacheClient, CacheError};
pub use codec::{BlobCodec, JsonCodec};
pub use config::{CacheBackend, CacheConfig};
pub use keys::{KeyArgs, build_key};
pub use memory::InMemoryCache;
