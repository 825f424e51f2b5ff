//! Live tests against a running memcached.
//!
//! - Marked `#[ignore]`; run with `cargo test -- --ignored` once memcached is up.
//! - Address comes from `MEMCACHED_HOST` / `MEMCACHED_PORT` (defaults `localhost:11211`).
//! - Flushes the whole store.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cache_aside_demo::{
    application::operations::{DataSource, OperationService, WorkloadConfig},
    cache::CacheClient,
    infra::memcached::MemcachedClient,
};

fn live_client() -> Arc<MemcachedClient> {
    let host = std::env::var("MEMCACHED_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("MEMCACHED_PORT").unwrap_or_else(|_| "11211".to_string());
    Arc::new(MemcachedClient::new(
        format!("{host}:{port}"),
        Duration::from_secs(2),
    ))
}

#[tokio::test]
#[ignore]
async fn live_set_get_and_expiry() {
    let client = live_client();
    client.flush_all().await.expect("flush");

    client
        .set("live_check", Bytes::from_static(b"\"ok\""), 1)
        .await
        .expect("set");
    assert_eq!(
        client.get("live_check").await.expect("get").as_deref(),
        Some(&b"\"ok\""[..])
    );

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(client.get("live_check").await.expect("get"), None);
}

#[tokio::test]
#[ignore]
async fn live_operation_round_trip() {
    let client = live_client();
    client.flush_all().await.expect("flush");

    let service = OperationService::new(
        client,
        WorkloadConfig {
            operation_delay: Duration::from_millis(50),
            user_delay: Duration::from_millis(50),
            ..Default::default()
        },
    );

    let (_, source) = service.user_data(42).await.expect("miss");
    assert_eq!(source, DataSource::Computed);
    let (user, source) = service.user_data(42).await.expect("hit");
    assert_eq!(source, DataSource::Cache);
    assert_eq!(user.email, "user42@example.com");

    service.clear_cache().await.expect("clear");
    let (_, source) = service.user_data(42).await.expect("after clear");
    assert_eq!(source, DataSource::Computed);
}
