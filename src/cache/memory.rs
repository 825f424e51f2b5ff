//! Process-local cache backend.
//!
//! Mirrors the memcached contract (whole-second TTLs, zero meaning no
//! expiry, `flush_all` clearing everything) so the service and its tests can
//! run without an external store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;

use super::client::{CacheClient, CacheError};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::memory";

struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// In-memory store with lazy expiry.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "len")
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        {
            let entries = rw_read(&self.entries, SOURCE, "get");
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = rw_write(&self.entries, SOURCE, "get.evict_expired");
        // Another writer may have replaced the entry between the two locks.
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl CacheClient for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(self.lookup(key))
    }

    async fn set(&self, key: &str, value: Bytes, ttl_seconds: u32) -> Result<(), CacheError> {
        let expires_at =
            (ttl_seconds > 0).then(|| Instant::now() + Duration::from_secs(ttl_seconds.into()));
        rw_write(&self.entries, SOURCE, "set")
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "flush_all").clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrip() {
        let cache = InMemoryCache::new();
        assert!(cache.get("k").await.unwrap().is_none());

        cache.set("k", Bytes::from("v"), 60).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(Bytes::from("v")));
    }

    #[tokio::test]
    async fn set_overwrites_existing_entry() {
        let cache = InMemoryCache::new();
        cache.set("k", Bytes::from("first"), 60).await.unwrap();
        cache.set("k", Bytes::from("second"), 60).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(Bytes::from("second")));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_absent() {
        let cache = InMemoryCache::new();
        cache.set("k", Bytes::from("v"), 1).await.unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn zero_ttl_never_expires() {
        let cache = InMemoryCache::new();
        cache.set("k", Bytes::from("v"), 0).await.unwrap();
        let entries = rw_read(&cache.entries, SOURCE, "test");
        assert!(entries.get("k").expect("entry").expires_at.is_none());
    }

    #[tokio::test]
    async fn flush_all_removes_every_prefix() {
        let cache = InMemoryCache::new();
        cache.set("a_1", Bytes::from("1"), 60).await.unwrap();
        cache.set("b_2", Bytes::from("2"), 60).await.unwrap();

        cache.flush_all().await.unwrap();

        assert!(cache.get("a_1").await.unwrap().is_none());
        assert!(cache.get("b_2").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn recovers_from_poisoned_lock() {
        let cache = InMemoryCache::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        cache.set("k", Bytes::from("v"), 60).await.unwrap();
        assert!(cache.get("k").await.unwrap().is_some());
    }
}
