use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use cache_aside_demo::{
    application::{
        error::AppError,
        operations::{OperationService, WorkloadConfig},
    },
    cache::{CacheClient, CacheConfig},
    config,
    infra::{
        connect_cache,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Flush(_) => run_flush(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let client = connect_cache(&CacheConfig::from(&settings.cache));
    let operations = Arc::new(OperationService::new(
        client,
        WorkloadConfig::from(&settings.workloads),
    ));

    serve_http(&settings, HttpState::new(operations)).await
}

async fn run_flush(settings: config::Settings) -> Result<(), AppError> {
    let client = connect_cache(&CacheConfig::from(&settings.cache));
    client.flush_all().await?;
    info!(
        target = "cache_aside_demo::cache",
        backend = settings.cache.backend.as_str(),
        "Cache store flushed"
    );
    Ok(())
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "cache_aside_demo::http",
        addr = %settings.server.addr,
        "Listening"
    );

    let stopping = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown({
        let stopping = stopping.clone();
        async move {
            shutdown_signal().await;
            stopping.notify_one();
        }
    });

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server.into_future() => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline(&stopping, grace) => {
            warn!(
                target = "cache_aside_demo::http",
                grace_seconds = grace.as_secs(),
                "In-flight requests did not finish before the shutdown deadline"
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!(target = "cache_aside_demo::http", "Shutdown signal received");
}

async fn drain_deadline(stopping: &Notify, grace: Duration) {
    stopping.notified().await;
    tokio::time::sleep(grace).await;
}
