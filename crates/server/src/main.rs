use anyhow::Result;
use axum::{http::StatusCode, serve};
use server::router::{create_router, AppState};
use std::{sync::Arc, time::Duration};
use swrpc_core::{config::AppConfig, metrics::install_prometheus_recorder, runtime::SwrRuntime};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Upper bound on a single HTTP request, inline refresh included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Initializes the logging system based on the configuration.
fn init_logging(config: &AppConfig) {
    let filter = if let Ok(env_filter) = std::env::var("RUST_LOG") {
        if env_filter == "debug" {
            EnvFilter::new("warn,swrpc_core=debug,server=debug")
        } else if env_filter == "trace" {
            EnvFilter::new("warn,swrpc_core=trace,server=trace")
        } else {
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("warn,swrpc_core=debug,server=debug"))
        }
    } else {
        EnvFilter::new(format!(
            "warn,swrpc_core={level},server={level}",
            level = config.logging.level
        ))
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;

    init_logging(&config);
    info!(environment = %config.environment, "starting swrpc server");
    debug!(
        sources = config.sources.providers.len(),
        fresh_ttl_secs = config.cache.fresh_ttl_seconds,
        stale_ttl_secs = config.cache.stale_ttl_seconds,
        "configuration loaded"
    );

    let addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    let metrics = config.metrics.enabled.then(install_prometheus_recorder);

    let runtime = Arc::new(
        SwrRuntime::builder()
            .with_config(config)
            .build()
            .await
            .map_err(|e| anyhow::anyhow!("Runtime initialization failed: {e}"))?,
    );

    let app = create_router(AppState { runtime: runtime.clone(), metrics }).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT)),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "swrpc server listening");

    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "server error occurred");
    }

    runtime.shutdown().await;
    info!("server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, starting graceful shutdown");
}
