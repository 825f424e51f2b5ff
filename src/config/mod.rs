//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::CacheBackend;

mod cli;

pub use cli::{CacheOverrides, CliArgs, Command, FlushArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "cache-demo";
const ENV_PREFIX: &str = "CACHE_DEMO";
const MEMCACHED_HOST_ENV: &str = "MEMCACHED_HOST";
const MEMCACHED_PORT_ENV: &str = "MEMCACHED_PORT";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CACHE_HOST: &str = "localhost";
const DEFAULT_CACHE_PORT: u16 = 11211;
const DEFAULT_CACHE_CONNECT_TIMEOUT_MS: u64 = 2000;
const DEFAULT_OPERATION_TTL_SECS: u32 = 60;
const DEFAULT_OPERATION_DELAY_MS: u64 = 3000;
const DEFAULT_USER_TTL_SECS: u32 = 45;
const DEFAULT_USER_DELAY_MS: u64 = 2000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub workloads: WorkloadSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkloadSettings {
    pub operation_ttl_seconds: u32,
    pub operation_delay: Duration,
    pub user_ttl_seconds: u32,
    pub user_delay: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_memcached_env(|name| std::env::var(name).ok())?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Flush(args)) => raw.apply_cache_overrides(&args.cache),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
///
/// A `.env` file in the working directory, when present, is loaded into the
/// process environment first.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    workloads: RawWorkloadSettings,
}

impl RawSettings {
    /// Honour the plain `MEMCACHED_HOST` / `MEMCACHED_PORT` variables.
    fn apply_memcached_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), LoadError> {
        if let Some(host) = lookup(MEMCACHED_HOST_ENV).filter(|value| !value.trim().is_empty()) {
            self.cache.host = Some(host.trim().to_string());
        }
        if let Some(port) = lookup(MEMCACHED_PORT_ENV).filter(|value| !value.trim().is_empty()) {
            let port = port.trim().parse::<u16>().map_err(|err| {
                LoadError::invalid("MEMCACHED_PORT", format!("failed to parse: {err}"))
            })?;
            self.cache.port = Some(port);
        }
        Ok(())
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(ttl) = overrides.operation_ttl_seconds {
            self.workloads.operation_ttl_seconds = Some(ttl);
        }
        if let Some(delay) = overrides.operation_delay_ms {
            self.workloads.operation_delay_ms = Some(delay);
        }
        if let Some(ttl) = overrides.user_ttl_seconds {
            self.workloads.user_ttl_seconds = Some(ttl);
        }
        if let Some(delay) = overrides.user_delay_ms {
            self.workloads.user_delay_ms = Some(delay);
        }

        self.apply_cache_overrides(&overrides.cache);
    }

    fn apply_cache_overrides(&mut self, overrides: &CacheOverrides) {
        if let Some(backend) = overrides.backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(host) = overrides.memcached_host.as_ref() {
            self.cache.host = Some(host.clone());
        }
        if let Some(port) = overrides.memcached_port {
            self.cache.port = Some(port);
        }
        if let Some(timeout) = overrides.connect_timeout_ms {
            self.cache.connect_timeout_ms = Some(timeout);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cache,
            workloads,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache)?;
        let workloads = build_workload_settings(workloads);

        Ok(Self {
            server,
            logging,
            cache,
            workloads,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match cache.backend {
        Some(value) => CacheBackend::from_str(&value)
            .map_err(|reason| LoadError::invalid("cache.backend", reason))?,
        None => CacheBackend::Memcached,
    };

    let host = cache.host.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });
    let host = host.unwrap_or_else(|| DEFAULT_CACHE_HOST.to_string());

    let port = cache.port.unwrap_or(DEFAULT_CACHE_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "cache.port",
            "port must be greater than zero",
        ));
    }

    let timeout_ms = cache
        .connect_timeout_ms
        .unwrap_or(DEFAULT_CACHE_CONNECT_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.connect_timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        backend,
        host,
        port,
        connect_timeout: Duration::from_millis(timeout_ms),
    })
}

/// TTLs of zero never expire and delays of zero skip the simulated latency;
/// both are accepted as given.
fn build_workload_settings(workloads: RawWorkloadSettings) -> WorkloadSettings {
    WorkloadSettings {
        operation_ttl_seconds: workloads
            .operation_ttl_seconds
            .unwrap_or(DEFAULT_OPERATION_TTL_SECS),
        operation_delay: Duration::from_millis(
            workloads
                .operation_delay_ms
                .unwrap_or(DEFAULT_OPERATION_DELAY_MS),
        ),
        user_ttl_seconds: workloads.user_ttl_seconds.unwrap_or(DEFAULT_USER_TTL_SECS),
        user_delay: Duration::from_millis(workloads.user_delay_ms.unwrap_or(DEFAULT_USER_DELAY_MS)),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWorkloadSettings {
    operation_ttl_seconds: Option<u32>,
    operation_delay_ms: Option<u64>,
    user_ttl_seconds: Option<u32>,
    user_delay_ms: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

#[cfg(test)]
mod tests;
