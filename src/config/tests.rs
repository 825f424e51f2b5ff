use std::collections::HashMap;

use super::*;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn defaults_match_the_demo() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.cache.backend, CacheBackend::Memcached);
    assert_eq!(settings.cache.host, "localhost");
    assert_eq!(settings.cache.port, 11211);
    assert_eq!(settings.workloads.operation_ttl_seconds, 60);
    assert_eq!(settings.workloads.user_ttl_seconds, 45);
    assert_eq!(settings.workloads.operation_delay, Duration::from_secs(3));
    assert_eq!(settings.workloads.user_delay, Duration::from_secs(2));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.apply_memcached_env(env(&[("MEMCACHED_HOST", "cache.internal")]))
        .expect("env applies");

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        cache: CacheOverrides {
            memcached_host: Some("cli-host".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.host, "cli-host");
}

#[test]
fn memcached_env_variables_are_honoured() {
    let mut raw = RawSettings::default();
    raw.apply_memcached_env(env(&[
        ("MEMCACHED_HOST", "memcached"),
        ("MEMCACHED_PORT", "11311"),
    ]))
    .expect("env applies");

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.host, "memcached");
    assert_eq!(settings.cache.port, 11311);
}

#[test]
fn blank_memcached_env_keeps_defaults() {
    let mut raw = RawSettings::default();
    raw.apply_memcached_env(env(&[("MEMCACHED_HOST", "  "), ("MEMCACHED_PORT", "")]))
        .expect("env applies");

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.host, "localhost");
    assert_eq!(settings.cache.port, 11211);
}

#[test]
fn malformed_memcached_port_is_rejected() {
    let mut raw = RawSettings::default();
    let err = raw
        .apply_memcached_env(env(&[("MEMCACHED_PORT", "eleven")]))
        .expect_err("invalid port");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "MEMCACHED_PORT",
            ..
        }
    ));
}

#[test]
fn unknown_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("redis".to_string());
    let err = Settings::from_raw(raw).expect_err("invalid backend");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.backend",
            ..
        }
    ));
}

#[test]
fn zero_ports_are_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.port = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.server.port = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn zero_ttl_and_delay_are_accepted() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        operation_ttl_seconds: Some(0),
        operation_delay_ms: Some(0),
        ..Default::default()
    };
    raw.apply_serve_overrides(&overrides);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.workloads.operation_ttl_seconds, 0);
    assert_eq!(settings.workloads.operation_delay, Duration::ZERO);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["cache-aside-demo"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "cache-aside-demo",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--cache-backend",
        "memory",
        "--user-ttl-seconds",
        "5",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.cache.backend.as_deref(), Some("memory"));
            assert_eq!(serve.overrides.user_ttl_seconds, Some(5));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_flush_arguments() {
    let args = CliArgs::parse_from([
        "cache-aside-demo",
        "flush",
        "--memcached-host",
        "10.0.0.5",
        "--memcached-port",
        "11212",
    ]);

    match args.command.expect("flush command") {
        Command::Flush(flush) => {
            assert_eq!(flush.cache.memcached_host.as_deref(), Some("10.0.0.5"));
            assert_eq!(flush.cache.memcached_port, Some(11212));
        }
        _ => panic!("wrong command parsed"),
    }
}
