use anyhow::Context;
use playbook::{
    api::{build_router, handlers, AppState},
    config::Config,
    search::{create_engine, ProjectionService},
    state::create_store,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("playbook={},tower_http=info", config.observability.log_level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        service = %config.observability.service_name,
        "Starting playbook v{}",
        env!("CARGO_PKG_VERSION")
    );
    handlers::mark_started();

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = playbook::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Relational store
    tracing::info!("Storage backend: {:?}", config.state.backend);
    let repository = create_store(&config.state).context("Failed to open relational store")?;

    // Search projection; the server must not start without its indices
    tracing::info!("Search backend: {:?}", config.search.backend);
    let engine = create_engine(&config.search).context("Failed to create search engine")?;
    let projection = Arc::new(ProjectionService::new(
        engine,
        config.search.clone(),
        repository.clone(),
    ));
    projection
        .ensure_indices()
        .await
        .context("Failed to initialize search indices")?;
    tracing::info!("Search indices ready");

    let app_state = AppState::new(repository, projection);
    let app = build_router(
        app_state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", http_addr))?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Pickup lines: http://{}/api/pickup-lines", http_addr);

    axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
