//! Cache-aside wrapper.
//!
//! `CacheAside` looks a call up in the store, and on a miss runs the
//! computation, stores its encoded result and returns it. The caller learns
//! whether the value came from the store.
//!
//! A stored blob that is present and non-empty is a hit. The check is on the
//! blob, not on the decoded value, so results such as `""` or `0` are served
//! from the store like any other value. Concurrent misses for the same key
//! are not coalesced: each runs the computation and each writes, and the last
//! write wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use super::client::{CacheClient, CacheError};
use super::codec::{BlobCodec, JsonCodec};
use super::keys::KeyArgs;

/// Wraps computations with get / compute / set against a shared store.
pub struct CacheAside<C = JsonCodec> {
    client: Arc<dyn CacheClient>,
    prefix: String,
    ttl_seconds: u32,
    codec: C,
}

impl CacheAside<JsonCodec> {
    /// Wrapper storing JSON blobs under keys starting with `prefix`.
    pub fn new(client: Arc<dyn CacheClient>, prefix: impl Into<String>, ttl_seconds: u32) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            ttl_seconds,
            codec: JsonCodec,
        }
    }
}

impl<C: BlobCodec> CacheAside<C> {
    /// Replace the serializer pair.
    pub fn with_codec<D: BlobCodec>(self, codec: D) -> CacheAside<D> {
        CacheAside {
            client: self.client,
            prefix: self.prefix,
            ttl_seconds: self.ttl_seconds,
            codec,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ttl_seconds(&self) -> u32 {
        self.ttl_seconds
    }

    /// Key under which a call with `args` is stored.
    pub fn key_for(&self, args: &KeyArgs) -> String {
        args.key(&self.prefix)
    }

    /// Serve `args` from the store, or run `compute` and store its result.
    ///
    /// Returns the value and `true` when it came from the store.
    #[instrument(skip_all, fields(prefix = %self.prefix))]
    pub async fn call<R, F, Fut>(&self, args: &KeyArgs, compute: F) -> Result<(R, bool), CacheError>
    where
        R: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, CacheError>>,
    {
        let key = self.key_for(args);

        let cached = self.client.get(&key).await?;
        if let Some(blob) = cached.filter(|blob| !blob.is_empty()) {
            let value = self.codec.decode(&blob)?;
            counter!("cache_aside_hit_total", "prefix" => self.prefix.clone()).increment(1);
            debug!(cache = "aside", outcome = "hit", key = %key, "serving cached value");
            return Ok((value, true));
        }

        counter!("cache_aside_miss_total", "prefix" => self.prefix.clone()).increment(1);
        debug!(cache = "aside", outcome = "miss", key = %key, "computing value");

        let started = Instant::now();
        let value = compute().await?;
        histogram!("workload_ms", "prefix" => self.prefix.clone())
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let blob = self.codec.encode(&value)?;
        self.client.set(&key, blob, self.ttl_seconds).await?;
        debug!(
            cache = "aside",
            key = %key,
            ttl_seconds = self.ttl_seconds,
            "stored computed value"
        );

        Ok((value, false))
    }
}

/// Last path segment of a function item's type name, e.g. `get_user_data`.
///
/// Used as the default key prefix when a wrapper has no explicit name.
pub fn function_name<F>(_: &F) -> &'static str {
    let full = std::any::type_name::<F>();
    full.rsplit("::").next().unwrap_or(full)
}
