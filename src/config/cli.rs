use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the demo binary.
#[derive(Debug, Parser)]
#[command(
    name = "cache-aside-demo",
    version,
    about = "Cache-aside demo server backed by memcached"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CACHE_DEMO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Flush every entry from the configured cache store and exit.
    Flush(FlushArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct CacheOverrides {
    /// Cache store backend (memcached|memory).
    #[arg(long = "cache-backend", value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Override the memcached host.
    #[arg(long = "memcached-host", value_name = "HOST")]
    pub memcached_host: Option<String>,

    /// Override the memcached port.
    #[arg(long = "memcached-port", value_name = "PORT")]
    pub memcached_port: Option<u16>,

    /// Override the memcached connect timeout in milliseconds.
    #[arg(long = "memcached-connect-timeout-ms", value_name = "MS")]
    pub connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub cache: CacheOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override how long `/operation` results stay cached.
    #[arg(long = "operation-ttl-seconds", value_name = "SECONDS")]
    pub operation_ttl_seconds: Option<u32>,

    /// Override the simulated latency of `/operation`.
    #[arg(long = "operation-delay-ms", value_name = "MS")]
    pub operation_delay_ms: Option<u64>,

    /// Override how long `/user/{id}` results stay cached.
    #[arg(long = "user-ttl-seconds", value_name = "SECONDS")]
    pub user_ttl_seconds: Option<u32>,

    /// Override the simulated latency of `/user/{id}`.
    #[arg(long = "user-delay-ms", value_name = "MS")]
    pub user_delay_ms: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct FlushArgs {
    #[command(flatten)]
    pub cache: CacheOverrides,
}
