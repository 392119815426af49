use search_ab_gateway::{
    api::{build_router, AppState},
    config::{Config, ObservabilityConfig},
    corpus,
    engine::create_engine,
    search::{default_catalog, install, ConfigurationRegistry, SearchError},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    init_tracing(&config.observability);

    tracing::info!("Starting search A/B gateway v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = search_ab_gateway::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Engine and configurations
    let engine = create_engine(&config.engine)?;
    let registry = Arc::new(ConfigurationRegistry::new(engine.clone()));
    let catalog = default_catalog(&config.indexes.prefix, &config.indexes.primary_key)?;
    let rewriter = Arc::new(install(catalog, &registry));

    tracing::info!(configurations = ?registry.names(), "Applying index configurations");
    match registry.apply_all().await {
        Ok(()) => tracing::info!("All index configurations applied"),
        Err(e @ SearchError::EngineUnavailable(_)) if !config.engine.fail_fast => {
            tracing::warn!(error = %e, "Engine unavailable, serving without applied indexes");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to apply index configurations");
            return Err(e.into());
        }
    }

    // Seed the corpus into every configured index
    if let Some(path) = &config.corpus.path {
        let documents = corpus::load_documents(path).await?;
        if !documents.is_empty() {
            let seeded =
                corpus::seed(engine.as_ref(), &registry, &documents, config.corpus.batch_size)
                    .await?;
            tracing::info!(indexes = ?seeded, "Corpus seeded");
        }
    }

    let app_state = AppState::new(engine, registry.clone(), rewriter)
        .with_metrics(config.observability.prometheus_enabled);
    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    for name in registry.names() {
        tracing::info!("   Search: http://{}/search_{}", http_addr, name);
    }

    axum::serve(http_listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "search_ab_gateway={},tower_http=info",
            observability.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
