//! Slow operations and their cached entry points.
//!
//! The workloads block their thread for a fixed delay, standing in for a
//! database or remote API call. They run on tokio's blocking pool and are
//! never turned into async sleeps.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::info;

use crate::{
    application::error::AppError,
    cache::{CacheAside, CacheClient, CacheError, KeyArgs, function_name},
    domain::entities::UserRecord,
};

const HEAVY_OPERATION_PREFIX: &str = "heavy_operation";

/// Where a returned value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Cache,
    Computed,
}

impl DataSource {
    pub fn from_hit(hit: bool) -> Self {
        if hit { Self::Cache } else { Self::Computed }
    }

    /// Label shown to clients in the `source` field.
    pub fn label(self) -> &'static str {
        match self {
            DataSource::Cache => "Caché (pymemcache)",
            DataSource::Computed => "Base de datos",
        }
    }
}

/// TTLs and simulated latencies of the cached operations.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    pub operation_ttl_seconds: u32,
    pub operation_delay: Duration,
    pub user_ttl_seconds: u32,
    pub user_delay: Duration,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            operation_ttl_seconds: 60,
            operation_delay: Duration::from_secs(3),
            user_ttl_seconds: 45,
            user_delay: Duration::from_secs(2),
        }
    }
}

impl From<&crate::config::WorkloadSettings> for WorkloadConfig {
    fn from(settings: &crate::config::WorkloadSettings) -> Self {
        Self {
            operation_ttl_seconds: settings.operation_ttl_seconds,
            operation_delay: settings.operation_delay,
            user_ttl_seconds: settings.user_ttl_seconds,
            user_delay: settings.user_delay,
        }
    }
}

/// Expensive string computation.
pub fn heavy_operation(param: &str, delay: Duration) -> String {
    std::thread::sleep(delay);
    format!("Resultado de operación con parámetro: {param} (caracteres especiales: áéíóúñ)")
}

/// Slow user lookup.
pub fn get_user_data(user_id: u64, delay: Duration) -> UserRecord {
    std::thread::sleep(delay);
    UserRecord::synthetic(user_id)
}

async fn run_blocking<T, F>(work: F) -> Result<T, CacheError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| CacheError::workload(err.to_string()))
}

/// Cached front for the slow operations, shared by all request handlers.
pub struct OperationService {
    client: Arc<dyn CacheClient>,
    heavy: CacheAside,
    user: CacheAside,
    config: WorkloadConfig,
}

impl OperationService {
    pub fn new(client: Arc<dyn CacheClient>, config: WorkloadConfig) -> Self {
        let heavy = CacheAside::new(
            client.clone(),
            HEAVY_OPERATION_PREFIX,
            config.operation_ttl_seconds,
        );
        let user = CacheAside::new(
            client.clone(),
            function_name(&get_user_data),
            config.user_ttl_seconds,
        );
        Self {
            client,
            heavy,
            user,
            config,
        }
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    pub async fn heavy_operation(&self, param: &str) -> Result<(String, DataSource), AppError> {
        let args = KeyArgs::new().arg(param);
        let delay = self.config.operation_delay;
        let owned = param.to_string();

        let (result, hit) = self
            .heavy
            .call(&args, || run_blocking(move || heavy_operation(&owned, delay)))
            .await?;
        Ok((result, DataSource::from_hit(hit)))
    }

    pub async fn user_data(&self, user_id: u64) -> Result<(UserRecord, DataSource), AppError> {
        let args = KeyArgs::new().arg(user_id);
        let delay = self.config.user_delay;

        let (user, hit) = self
            .user
            .call(&args, || run_blocking(move || get_user_data(user_id, delay)))
            .await?;
        Ok((user, DataSource::from_hit(hit)))
    }

    /// Drop every entry in the store, not only the ones written here.
    pub async fn clear_cache(&self) -> Result<(), AppError> {
        self.client.flush_all().await?;
        counter!("cache_store_flush_total").increment(1);
        info!(target = "cache_aside_demo::cache", "Cache store flushed");
        Ok(())
    }
}
